use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::orbit::{OrbitalParameters, TleRecord};
use crate::predict::{LocationSample, Method, Prediction, Tuning};
use crate::refresh::lock_engine;
use crate::web::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::web::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct OrbitStatus {
    pub params: OrbitalParameters,
    pub revision: u64,
    pub tle: Option<TleRecord>,
    pub polynomial_loaded: bool,
    pub sgp4_available: bool,
    pub strategies: Vec<Method>,
    pub tuning: Tuning,
    pub calibration_samples: usize,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CalibrationRequest {
    /// A prediction previously returned by this service.
    pub prediction: Prediction,
    /// Observed position at the prediction's target time.
    pub actual: LocationSample,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CalibrationResponse {
    /// New period when this sample triggered an adjustment.
    pub adjusted_period_minutes: Option<f64>,
    pub period_minutes: f64,
    pub samples: usize,
}

#[utoipa::path(
    get,
    path = "/api/orbit",
    responses(
        (status = 200, description = "Current orbital parameters and model state", body = OrbitStatus)
    ),
    tag = "orbit"
)]
pub async fn status(State(state): State<AppState>) -> Json<OrbitStatus> {
    let engine = lock_engine(&state.engine);
    Json(OrbitStatus {
        params: *engine.params(),
        revision: engine.revision(),
        tle: engine.store().tle().cloned(),
        polynomial_loaded: engine.models().is_some(),
        sgp4_available: engine.has_propagator(),
        strategies: engine.strategy_names(),
        tuning: engine.tuning().clone(),
        calibration_samples: engine.calibration().len(),
    })
}

#[utoipa::path(
    post,
    path = "/api/calibration",
    request_body = CalibrationRequest,
    responses(
        (status = 200, description = "Sample recorded", body = CalibrationResponse),
        (status = 400, description = "Invalid observation", body = ErrorResponse)
    ),
    tag = "orbit"
)]
pub async fn calibrate(
    State(state): State<AppState>,
    Json(request): Json<CalibrationRequest>,
) -> ApiResult<Json<CalibrationResponse>> {
    if !request.actual.is_valid() {
        return Err(ApiError::from(crate::predict::PredictError::InvalidLocation {
            latitude: request.actual.latitude,
            longitude: request.actual.longitude,
        }));
    }

    let mut engine = lock_engine(&state.engine);
    let adjusted_period_minutes = engine.record_calibration(&request.prediction, &request.actual);
    Ok(Json(CalibrationResponse {
        adjusted_period_minutes,
        period_minutes: engine.params().period_minutes,
        samples: engine.calibration().len(),
    }))
}
