use thiserror::Error;

/// Structurally invalid requests. Everything else degrades to "no result".
#[derive(Debug, Error, PartialEq)]
pub enum PredictError {
    #[error("minutes ahead must be a positive number within the supported time range, got {0}")]
    InvalidHorizon(f64),
    #[error("invalid location: latitude {latitude}, longitude {longitude}")]
    InvalidLocation { latitude: f64, longitude: f64 },
    #[error("invalid path: {0}")]
    InvalidPath(String),
}
