use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::predict::{LocationSample, PathRequest, Prediction, VelocityVector};
use crate::refresh::lock_engine;
use crate::web::api::error::{ApiResult, ErrorResponse};
use crate::web::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct PredictRequest {
    pub current: LocationSample,
    pub minutes_ahead: f64,
    /// Newest first.
    #[serde(default)]
    pub history: Vec<LocationSample>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PredictResponse {
    /// `null` when no strategy could answer.
    pub prediction: Option<Prediction>,
    pub velocity: Option<VelocityVector>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PathResponse {
    pub predictions: Vec<Prediction>,
    pub requested_steps: usize,
}

#[utoipa::path(
    post,
    path = "/api/predict",
    request_body = PredictRequest,
    responses(
        (status = 200, description = "Prediction, or null when unavailable", body = PredictResponse),
        (status = 400, description = "Invalid location or horizon", body = ErrorResponse)
    ),
    tag = "predict"
)]
pub async fn predict(
    State(state): State<AppState>,
    Json(request): Json<PredictRequest>,
) -> ApiResult<Json<PredictResponse>> {
    let mut engine = lock_engine(&state.engine);
    let prediction = engine.predict(&request.current, request.minutes_ahead, &request.history)?;
    let velocity = engine.estimate_velocity(&request.current, &request.history);
    Ok(Json(PredictResponse {
        prediction,
        velocity,
    }))
}

#[utoipa::path(
    post,
    path = "/api/path",
    request_body = PathRequest,
    responses(
        (status = 200, description = "Predicted ground track", body = PathResponse),
        (status = 400, description = "Invalid range or location", body = ErrorResponse)
    ),
    tag = "predict"
)]
pub async fn path(
    State(state): State<AppState>,
    Json(request): Json<PathRequest>,
) -> ApiResult<Json<PathResponse>> {
    let mut engine = lock_engine(&state.engine);
    let predictions: Vec<Prediction> = engine.path(&request)?.collect();
    Ok(Json(PathResponse {
        predictions,
        requested_steps: request.steps(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::{Method, PredictionEngine};
    use axum::response::IntoResponse;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::sync::{Arc, Mutex};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 15, 0, 0).unwrap()
    }

    fn state() -> AppState {
        AppState {
            engine: Arc::new(Mutex::new(PredictionEngine::default())),
        }
    }

    fn history() -> Vec<LocationSample> {
        vec![
            LocationSample::new(t0() - Duration::minutes(5), 42.623, -142.678),
            LocationSample::new(t0() - Duration::minutes(10), 40.123, -162.678),
        ]
    }

    #[tokio::test]
    async fn predict_returns_velocity_prediction() {
        let request = PredictRequest {
            current: LocationSample::new(t0(), 45.123, -122.678),
            minutes_ahead: 5.0,
            history: history(),
        };
        let Ok(Json(response)) = predict(State(state()), Json(request)).await else {
            panic!("prediction request rejected");
        };
        let prediction = response.prediction.unwrap();
        assert_eq!(prediction.method, Method::Velocity);
        assert_eq!(response.velocity.unwrap().sample_count, 3);
    }

    #[tokio::test]
    async fn invalid_horizon_is_bad_request() {
        let request = PredictRequest {
            current: LocationSample::new(t0(), 45.123, -122.678),
            minutes_ahead: -5.0,
            history: Vec::new(),
        };
        let Err(e) = predict(State(state()), Json(request)).await else {
            panic!("negative horizon accepted");
        };
        assert_eq!(e.into_response().status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn path_collects_steps() {
        let request = PathRequest {
            current: LocationSample::new(t0(), 45.123, -122.678),
            start_minutes: 5.0,
            end_minutes: 30.0,
            step_minutes: 5.0,
            history: history(),
        };
        let Ok(Json(response)) = path(State(state()), Json(request)).await else {
            panic!("path request rejected");
        };
        assert_eq!(response.requested_steps, 6);
        assert_eq!(response.predictions.len(), 6);
    }
}
