use super::types::{target_time, LocationSample, Method, Prediction};
use crate::geo::{clamp_latitude, wrap_longitude};
use crate::model::{ModelPair, PolynomialModel};

const CONFIDENCE_SPAN: f64 = 0.3;
const MIN_POLYNOMIAL_CONFIDENCE: f64 = 0.5;
const MAX_POLYNOMIAL_CONFIDENCE: f64 = 0.99;

/// Evaluate the fitted models, anchored to the live position.
///
/// The offset between the observed position and the model at the current
/// time is carried to the target time, so the model only contributes the
/// shape of the motion. Returns `None` when the target lies outside either
/// model's window.
pub fn predict_polynomial(
    models: &ModelPair,
    current: &LocationSample,
    minutes_ahead: f64,
) -> Option<Prediction> {
    let target = target_time(current.timestamp, minutes_ahead)?;
    let lat_model = &models.latitude;
    let lon_model = &models.longitude;

    let lat_t = lat_model.normalized_time(target);
    if !PolynomialModel::in_window(lat_t) {
        return None;
    }
    let lon_t = lon_model.normalized_time(target);
    if !PolynomialModel::in_window(lon_t) {
        return None;
    }

    let lat_now = lat_model.evaluate(lat_model.normalized_time(current.timestamp));
    let lat_offset = current.latitude - lat_now;
    let latitude = clamp_latitude(lat_model.evaluate(lat_t) + lat_offset);

    let lon_now = lon_model.evaluate(lon_model.normalized_time(current.timestamp));
    let raw_offset = current.longitude - lon_now;
    let lon_offset = if lon_model.longitude_is_unwrapped {
        wrap_longitude(raw_offset)
    } else {
        raw_offset
    };
    let longitude = wrap_longitude(lon_model.evaluate(lon_t) + lon_offset);

    let confidence = (1.0 - CONFIDENCE_SPAN * lat_t)
        .clamp(MIN_POLYNOMIAL_CONFIDENCE, MAX_POLYNOMIAL_CONFIDENCE);

    Prediction::build(
        current,
        minutes_ahead,
        latitude,
        longitude,
        confidence,
        Method::Polynomial,
    )
}
