use geo::MultiPolygon;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// County FIPS code. Upstream data carries it as a JSON number
/// (`1001`) while other sources use the zero-padded string (`"01001"`);
/// both deserialize to the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "FipsRepr")]
pub struct Fips(pub u32);

#[derive(Deserialize)]
#[serde(untagged)]
enum FipsRepr {
    Number(u32),
    Text(String),
}

impl TryFrom<FipsRepr> for Fips {
    type Error = String;

    fn try_from(repr: FipsRepr) -> Result<Self, Self::Error> {
        match repr {
            FipsRepr::Number(n) => Ok(Fips(n)),
            FipsRepr::Text(s) => s.parse(),
        }
    }
}

impl TryFrom<&serde_json::Value> for Fips {
    type Error = String;

    fn try_from(value: &serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::Number(n) => n
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .map(Fips)
                .ok_or_else(|| format!("invalid FIPS code: {n}")),
            serde_json::Value::String(s) => s.parse(),
            other => Err(format!("invalid FIPS code: {other}")),
        }
    }
}

impl FromStr for Fips {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse()
            .map(Fips)
            .map_err(|_| format!("invalid FIPS code: {s:?}"))
    }
}

impl Fips {
    /// Five-digit form, e.g. `01001`.
    pub fn padded(self) -> String {
        format!("{:05}", self.0)
    }
}

impl fmt::Display for Fips {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A county boundary decoded from the topology.
#[derive(Debug, Clone)]
pub struct CountyGeometry {
    pub id: Fips,
    pub geometry: MultiPolygon<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EducationRecord {
    pub fips: Fips,
    pub state: String,
    pub area_name: String,
    #[serde(rename = "bachelorsOrHigher")]
    pub bachelors_or_higher: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fips_accepts_numbers_and_padded_strings() {
        let ids: Vec<Fips> = serde_json::from_str(r#"[1001, "01001", " 13001 "]"#).unwrap();
        assert_eq!(ids, vec![Fips(1001), Fips(1001), Fips(13001)]);
        assert!(serde_json::from_str::<Fips>(r#""Autauga""#).is_err());
        assert_eq!(Fips(1001).padded(), "01001");
        assert_eq!(Fips(1001).to_string(), "1001");
        assert_eq!(serde_json::to_string(&Fips(1001)).unwrap(), "1001");
    }
}
