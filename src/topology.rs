//! TopoJSON decoding.
//!
//! A topology stores every boundary segment once, as an "arc", and
//! geometries reference arcs by index. Decoding turns those references
//! back into `geo` polygons, and mesh extraction walks the arcs directly
//! so that borders shared by two regions are drawn a single time.

use crate::error::TopologyError;
use crate::types::{CountyGeometry, Fips};
use geo::{Coord, LineString, MultiLineString, MultiPolygon, Polygon};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Transform {
    pub scale: [f64; 2],
    pub translate: [f64; 2],
}

#[derive(Debug, Deserialize)]
struct RawTopology {
    #[serde(default)]
    transform: Option<Transform>,
    objects: HashMap<String, TopoGeometry>,
    arcs: Vec<Vec<Vec<f64>>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum TopoGeometry {
    GeometryCollection {
        geometries: Vec<TopoGeometry>,
    },
    Polygon {
        arcs: Vec<Vec<i64>>,
        #[serde(default)]
        id: Option<Value>,
    },
    MultiPolygon {
        arcs: Vec<Vec<Vec<i64>>>,
        #[serde(default)]
        id: Option<Value>,
    },
    LineString {
        arcs: Vec<i64>,
    },
    MultiLineString {
        arcs: Vec<Vec<i64>>,
    },
    // Points carry coordinates rather than arcs and never contribute to a mesh.
    #[serde(other)]
    Other,
}

impl TopoGeometry {
    fn leaves<'a>(&'a self, out: &mut Vec<&'a TopoGeometry>) {
        match self {
            TopoGeometry::GeometryCollection { geometries } => {
                for geometry in geometries {
                    geometry.leaves(out);
                }
            }
            other => out.push(other),
        }
    }

    fn arc_refs(&self) -> Vec<i64> {
        match self {
            TopoGeometry::Polygon { arcs, .. } | TopoGeometry::MultiLineString { arcs } => {
                arcs.iter().flatten().copied().collect()
            }
            TopoGeometry::MultiPolygon { arcs, .. } => arcs.iter().flatten().flatten().copied().collect(),
            TopoGeometry::LineString { arcs } => arcs.clone(),
            TopoGeometry::GeometryCollection { .. } | TopoGeometry::Other => Vec::new(),
        }
    }
}

/// Which shared arcs a mesh keeps, judged by the first and last geometry
/// that reference each arc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeshFilter {
    /// Every arc referenced by the object.
    All,
    /// Arcs between two different geometries.
    #[default]
    Interior,
    /// Arcs owned by a single geometry (coastlines and outer borders).
    Exterior,
}

impl MeshFilter {
    fn accepts(self, first: usize, last: usize) -> bool {
        match self {
            MeshFilter::All => true,
            MeshFilter::Interior => first != last,
            MeshFilter::Exterior => first == last,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Topology {
    objects: HashMap<String, TopoGeometry>,
    arcs: Vec<Vec<Coord<f64>>>,
}

impl Topology {
    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        let raw: RawTopology = serde_json::from_slice(bytes)?;
        let arcs = raw
            .arcs
            .iter()
            .map(|positions| decode_arc(positions, raw.transform.as_ref()))
            .collect();

        Ok(Self {
            objects: raw.objects,
            arcs,
        })
    }

    pub fn arc_count(&self) -> usize {
        self.arcs.len()
    }

    pub fn object(&self, name: &str) -> Result<&TopoGeometry, TopologyError> {
        self.objects
            .get(name)
            .ok_or_else(|| TopologyError::MissingObject(name.to_string()))
    }

    /// Polygonal members of a geometry collection, keyed by their FIPS id.
    /// Non-polygonal members are skipped.
    pub fn counties(&self, object: &str) -> Result<Vec<CountyGeometry>, TopologyError> {
        let geometries = match self.object(object)? {
            TopoGeometry::GeometryCollection { geometries } => geometries,
            _ => return Err(TopologyError::NotACollection(object.to_string())),
        };

        let mut counties = Vec::with_capacity(geometries.len());
        for geometry in geometries {
            let (id, polygons) = match geometry {
                TopoGeometry::Polygon { arcs, id } => (id, vec![self.polygon(arcs)?]),
                TopoGeometry::MultiPolygon { arcs, id } => (
                    id,
                    arcs.iter()
                        .map(|rings| self.polygon(rings))
                        .collect::<Result<Vec<_>, _>>()?,
                ),
                _ => {
                    tracing::debug!(object, "skipping non-polygonal geometry");
                    continue;
                }
            };

            let id = id
                .as_ref()
                .ok_or_else(|| TopologyError::InvalidId("missing".to_string()))?;
            let id = Fips::try_from(id).map_err(TopologyError::InvalidId)?;

            counties.push(CountyGeometry {
                id,
                geometry: MultiPolygon::new(polygons),
            });
        }

        Ok(counties)
    }

    /// Line geometry of the arcs used by `object`, each arc emitted once.
    pub fn mesh(&self, object: &str, filter: MeshFilter) -> Result<MultiLineString<f64>, TopologyError> {
        let mut leaves = Vec::new();
        self.object(object)?.leaves(&mut leaves);

        let mut owners: Vec<Vec<usize>> = vec![Vec::new(); self.arcs.len()];
        for (index, geometry) in leaves.iter().enumerate() {
            for arc_ref in geometry.arc_refs() {
                let (arc, _) = resolve(arc_ref);
                owners
                    .get_mut(arc)
                    .ok_or(TopologyError::ArcOutOfRange(arc_ref))?
                    .push(index);
            }
        }

        let lines = owners
            .iter()
            .zip(&self.arcs)
            .filter_map(|(owned_by, coords)| {
                let (first, last) = (*owned_by.first()?, *owned_by.last()?);
                filter
                    .accepts(first, last)
                    .then(|| LineString::new(coords.clone()))
            })
            .collect();

        Ok(MultiLineString::new(lines))
    }

    fn polygon(&self, rings: &[Vec<i64>]) -> Result<Polygon<f64>, TopologyError> {
        let mut rings = rings.iter().map(|refs| self.ring(refs));
        let exterior = match rings.next() {
            Some(ring) => ring?,
            None => LineString::new(Vec::new()),
        };
        let interiors = rings.collect::<Result<Vec<_>, _>>()?;
        Ok(Polygon::new(exterior, interiors))
    }

    fn ring(&self, refs: &[i64]) -> Result<LineString<f64>, TopologyError> {
        let mut coords: Vec<Coord<f64>> = Vec::new();
        for &arc_ref in refs {
            let (index, reversed) = resolve(arc_ref);
            let arc = self
                .arcs
                .get(index)
                .ok_or(TopologyError::ArcOutOfRange(arc_ref))?;

            // Consecutive arcs share an endpoint.
            coords.pop();
            if reversed {
                coords.extend(arc.iter().rev().copied());
            } else {
                coords.extend(arc.iter().copied());
            }
        }
        Ok(LineString::new(coords))
    }
}

/// Negative references address arc `!i` traversed backwards.
fn resolve(arc_ref: i64) -> (usize, bool) {
    let (index, reversed) = if arc_ref < 0 { (!arc_ref, true) } else { (arc_ref, false) };
    (usize::try_from(index).unwrap_or(usize::MAX), reversed)
}

fn decode_arc(positions: &[Vec<f64>], transform: Option<&Transform>) -> Vec<Coord<f64>> {
    let points = positions.iter().filter(|p| p.len() >= 2);
    match transform {
        None => points.map(|p| Coord { x: p[0], y: p[1] }).collect(),
        Some(t) => {
            let (mut x, mut y) = (0.0, 0.0);
            points
                .map(|p| {
                    x += p[0];
                    y += p[1];
                    Coord {
                        x: x * t.scale[0] + t.translate[0],
                        y: y * t.scale[1] + t.translate[1],
                    }
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use geo::{Area, Contains, Point};

    fn topology() -> Topology {
        Topology::from_slice(fixtures::TOPOLOGY.as_bytes()).unwrap()
    }

    #[test]
    fn decodes_counties_with_numeric_and_string_ids() {
        let counties = topology().counties("counties").unwrap();
        let ids: Vec<u32> = counties.iter().map(|c| c.id.0).collect();
        assert_eq!(ids, vec![1001, 1003, 13001]);

        for county in &counties {
            assert!((county.geometry.unsigned_area() - 100.0).abs() < 1e-9);
        }
        assert!(counties[1].geometry.contains(&Point::new(15.0, 5.0)));
        assert!(!counties[1].geometry.contains(&Point::new(5.0, 5.0)));
    }

    #[test]
    fn reversed_arc_closes_the_ring() {
        let counties = topology().counties("counties").unwrap();
        let ring = counties[1].geometry.0[0].exterior();
        assert_eq!(ring.0.first(), ring.0.last());
        // 4 + 2 + 2 + 2 coordinates with shared endpoints collapsed
        assert_eq!(ring.0.len(), 5);
    }

    #[test]
    fn quantized_arcs_are_delta_decoded() {
        let json = r#"{
            "type": "Topology",
            "transform": { "scale": [2, 2], "translate": [100, 200] },
            "objects": {},
            "arcs": [[[1, 1], [2, 0], [0, 3]]]
        }"#;
        let topology = Topology::from_slice(json.as_bytes()).unwrap();
        assert_eq!(
            topology.arcs[0],
            vec![
                Coord { x: 102.0, y: 202.0 },
                Coord { x: 106.0, y: 202.0 },
                Coord { x: 106.0, y: 208.0 },
            ]
        );
    }

    #[test]
    fn interior_mesh_keeps_only_shared_state_border() {
        let mesh = topology().mesh("states", MeshFilter::Interior).unwrap();
        assert_eq!(mesh.0.len(), 1);
        assert_eq!(
            mesh.0[0].0,
            vec![Coord { x: 20.0, y: 0.0 }, Coord { x: 20.0, y: 10.0 }]
        );
    }

    #[test]
    fn exterior_and_full_meshes() {
        let topology = topology();
        assert_eq!(topology.mesh("states", MeshFilter::Exterior).unwrap().0.len(), 4);
        // arc 0 is only used by the counties object
        assert_eq!(topology.mesh("states", MeshFilter::All).unwrap().0.len(), 5);
    }

    #[test]
    fn missing_object_and_bad_arc_are_errors() {
        let topology = topology();
        assert_eq!(
            topology.counties("nation").unwrap_err(),
            TopologyError::MissingObject("nation".to_string())
        );

        let json = r#"{
            "type": "Topology",
            "objects": { "counties": { "type": "GeometryCollection",
                "geometries": [{ "type": "Polygon", "id": 1, "arcs": [[3]] }] } },
            "arcs": [[[0, 0], [1, 1]]]
        }"#;
        let broken = Topology::from_slice(json.as_bytes()).unwrap();
        assert_eq!(
            broken.counties("counties").unwrap_err(),
            TopologyError::ArcOutOfRange(3)
        );
    }
}
