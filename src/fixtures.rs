//! In-memory datasets shared by the unit tests: three square counties
//! laid out left to right, the first two in Alabama and the third in
//! Georgia.
//!
//! ```text
//!  (0,10)   (10,10)   (20,10)   (30,10)
//!    +---------+---------+---------+
//!    |  1001   |  1003   |  13001  |
//!    +---------+---------+---------+
//!  (0,0)    (10,0)    (20,0)    (30,0)
//! ```

use crate::data::Datasets;
use crate::types::EducationRecord;

pub const TOPOLOGY: &str = r#"{
  "type": "Topology",
  "objects": {
    "counties": {
      "type": "GeometryCollection",
      "geometries": [
        { "type": "Polygon", "id": 1001, "arcs": [[0, 1]] },
        { "type": "Polygon", "id": 1003, "arcs": [[4, 2, 3, -1]] },
        { "type": "Polygon", "id": "13001", "arcs": [[5, 2]] },
        { "type": "LineString", "arcs": [4] }
      ]
    },
    "states": {
      "type": "GeometryCollection",
      "geometries": [
        { "type": "Polygon", "id": "01", "arcs": [[1, 4, 2, 3]] },
        { "type": "Polygon", "id": "13", "arcs": [[5, 2]] }
      ]
    }
  },
  "arcs": [
    [[10, 0], [10, 10]],
    [[10, 10], [0, 10], [0, 0], [10, 0]],
    [[20, 0], [20, 10]],
    [[20, 10], [10, 10]],
    [[10, 0], [20, 0]],
    [[20, 10], [30, 10], [30, 0], [20, 0]]
  ]
}"#;

pub const EDUCATION: &str = r#"[
  { "fips": 1001, "state": "AL", "area_name": "Autauga County", "bachelorsOrHigher": 21.6 },
  { "fips": 1003, "state": "AL", "area_name": "Baldwin County", "bachelorsOrHigher": 28.6 },
  { "fips": 13001, "state": "GA", "area_name": "Appling County", "bachelorsOrHigher": 12.3 }
]"#;

pub fn datasets() -> Datasets {
    Datasets::parse(TOPOLOGY.as_bytes(), EDUCATION.as_bytes()).expect("fixture datasets parse")
}

pub fn records() -> Vec<EducationRecord> {
    serde_json::from_str(EDUCATION).expect("fixture records parse")
}
