use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use utoipa::ToSchema;

use crate::geo::{clamp_latitude, wrap_longitude};

pub const MIN_CONFIDENCE: f64 = 0.1;
pub const MAX_CONFIDENCE: f64 = 0.99;

/// A single observed ISS position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LocationSample {
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
}

impl LocationSample {
    pub fn new(timestamp: DateTime<Utc>, latitude: f64, longitude: f64) -> Self {
        Self {
            timestamp,
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Which estimation path produced a prediction.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Method {
    Polynomial,
    Sgp4Fallback,
    Orbital,
    Velocity,
    Blended,
}

/// Latitude/longitude rates derived from recent history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct VelocityVector {
    pub lat_velocity_deg_per_min: f64,
    pub lon_velocity_deg_per_min: f64,
    pub quality_score: f64,
    pub sample_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Prediction {
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub confidence: f64,
    pub minutes_ahead: f64,
    pub method: Method,
    pub source_timestamp: DateTime<Utc>,
}

impl Prediction {
    /// Build a prediction, normalizing coordinates and confidence.
    ///
    /// Returns `None` when any input is not finite or the target time is
    /// out of range, so callers can move on to the next strategy instead of
    /// handing out a corrupt value.
    pub fn build(
        source: &LocationSample,
        minutes_ahead: f64,
        latitude: f64,
        longitude: f64,
        confidence: f64,
        method: Method,
    ) -> Option<Self> {
        if !(latitude.is_finite() && longitude.is_finite() && confidence.is_finite()) {
            return None;
        }
        Some(Self {
            timestamp: target_time(source.timestamp, minutes_ahead)?,
            latitude: clamp_latitude(latitude),
            longitude: wrap_longitude(longitude),
            confidence: confidence.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE),
            minutes_ahead,
            method,
            source_timestamp: source.timestamp,
        })
    }
}

/// `from` shifted by a fractional number of minutes, at millisecond resolution.
/// `None` when the result is not a representable time.
pub fn target_time(from: DateTime<Utc>, minutes: f64) -> Option<DateTime<Utc>> {
    from.checked_add_signed(minutes_to_duration(minutes)?)
}

pub fn minutes_to_duration(minutes: f64) -> Option<Duration> {
    let millis = (minutes * 60_000.0).round();
    if !(millis.is_finite() && millis.abs() < i64::MAX as f64) {
        return None;
    }
    Duration::try_milliseconds(millis as i64)
}

pub fn minutes_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 60_000.0
}
