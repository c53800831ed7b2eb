use thiserror::Error;

use crate::source::SourceError;

#[derive(Debug, Error)]
pub enum TleError {
    #[error("no TLE entry found")]
    NoEntries,
    #[error("TLE line 2 has {0} fields, expected at least 8")]
    TooFewFields(usize),
    #[error("invalid TLE {field}: {value:?}")]
    InvalidField { field: &'static str, value: String },
    #[error("mean motion must be positive, got {0}")]
    NonPositiveMeanMotion(f64),
    #[error("inclination out of range: {0}")]
    InvalidInclination(f64),
    #[error("fetch failed: {0}")]
    Source(#[from] SourceError),
}

#[derive(Debug, Error)]
pub enum PropagationError {
    #[error("invalid tle: {0}")]
    InvalidTle(#[from] sgp4::TleError),
    #[error("elements error: {0}")]
    Elements(#[from] sgp4::ElementsError),
    #[error("propagation error: {0}")]
    Propagation(String),
    #[error("non-finite position")]
    NonFinite,
}

impl From<sgp4::Error> for PropagationError {
    fn from(err: sgp4::Error) -> Self {
        PropagationError::Propagation(err.to_string())
    }
}
