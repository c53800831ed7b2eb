use utoipa::OpenApi;

use super::api::error::ErrorResponse;
use super::api::orbit::{CalibrationRequest, CalibrationResponse, OrbitStatus};
use super::api::predict::{PathResponse, PredictRequest, PredictResponse};

#[derive(OpenApi)]
#[openapi(
    paths(
        super::api::predict::predict,
        super::api::predict::path,
        super::api::orbit::status,
        super::api::orbit::calibrate,
    ),
    components(
        schemas(
            PredictRequest,
            PredictResponse,
            PathResponse,
            OrbitStatus,
            CalibrationRequest,
            CalibrationResponse,
            ErrorResponse,
            crate::predict::LocationSample,
            crate::predict::Prediction,
            crate::predict::PathRequest,
            crate::predict::Method,
            crate::predict::VelocityVector,
            crate::predict::Tuning,
            crate::predict::BlendCurve,
            crate::orbit::OrbitalParameters,
            crate::orbit::TleRecord,
        )
    ),
    info(
        title = "ISS Position Prediction API",
        description = "Short and medium horizon ISS ground track predictions",
        version = "0.1.0"
    ),
    tags(
        (name = "predict", description = "Position predictions"),
        (name = "orbit", description = "Orbital parameters and calibration")
    )
)]
pub struct ApiDoc;
