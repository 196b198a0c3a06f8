use thiserror::Error;

use crate::types::Fips;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("no education record for county {fips}")]
    Missing { fips: Fips },

    #[error("county {fips} has {count} education records, expected exactly one")]
    Duplicate { fips: Fips, count: usize },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScaleError {
    #[error("cannot build a scale from an empty set of values")]
    EmptyDomain,

    #[error("scale values must be finite, got {0}")]
    NonFinite(f64),

    #[error("a threshold scale needs at least 2 colors, got {0}")]
    TooFewColors(usize),

    #[error("color {0:?} appears more than once in the palette")]
    DuplicateColor(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TopologyError {
    #[error("topology has no object named {0:?}")]
    MissingObject(String),

    #[error("object {0:?} is not a geometry collection")]
    NotACollection(String),

    #[error("arc reference {0} is out of range")]
    ArcOutOfRange(i64),

    #[error("geometry id is not a FIPS code: {0}")]
    InvalidId(String),
}
