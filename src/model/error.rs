use thiserror::Error;

use crate::source::SourceError;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("fetch failed: {0}")]
    Source(#[from] SourceError),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid {coordinate} model: {message}")]
    Invalid {
        coordinate: &'static str,
        message: String,
    },
}
