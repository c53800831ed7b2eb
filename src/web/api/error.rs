use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::predict::PredictError;

pub enum ApiError {
    InvalidRequest(PredictError),
}

impl From<PredictError> for ApiError {
    fn from(e: PredictError) -> Self {
        ApiError::InvalidRequest(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::InvalidRequest(e) => {
                let code = match e {
                    PredictError::InvalidHorizon(_) => "invalid_horizon",
                    PredictError::InvalidLocation { .. } => "invalid_location",
                    PredictError::InvalidPath(_) => "invalid_path",
                };
                (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse::with_message(code, &e.to_string())),
                )
                    .into_response()
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorResponse {
    pub fn with_message(error: &str, message: &str) -> Self {
        ErrorResponse {
            error: error.to_string(),
            message: Some(message.to_string()),
        }
    }
}
