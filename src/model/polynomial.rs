use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::error::ModelError;
use crate::predict::minutes_between;

/// Wire form of one coordinate model.
#[derive(Debug, Clone, Deserialize)]
pub struct PolynomialDocument {
    pub coefficients: Vec<f64>,
    pub t0_timestamp: f64,
    pub duration_minutes: f64,
    pub max_error_degrees: f64,
    #[serde(default)]
    pub longitude_unwrapped: bool,
}

/// Polynomial over normalized time `(t - t0) / duration`, highest degree
/// first.
#[derive(Debug, Clone, PartialEq)]
pub struct PolynomialModel {
    pub coefficients: Vec<f64>,
    pub reference_epoch: DateTime<Utc>,
    pub valid_duration_minutes: f64,
    pub max_error_degrees: f64,
    pub longitude_is_unwrapped: bool,
}

impl PolynomialModel {
    pub fn from_json(coordinate: &'static str, json: &str) -> Result<Self, ModelError> {
        let doc: PolynomialDocument = serde_json::from_str(json)?;
        Self::from_document(coordinate, doc)
    }

    pub fn from_document(
        coordinate: &'static str,
        doc: PolynomialDocument,
    ) -> Result<Self, ModelError> {
        let invalid = |message: &str| ModelError::Invalid {
            coordinate,
            message: message.to_string(),
        };

        if doc.coefficients.is_empty() {
            return Err(invalid("no coefficients"));
        }
        if doc.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(invalid("non-finite coefficient"));
        }
        if !(doc.duration_minutes > 0.0 && doc.duration_minutes.is_finite()) {
            return Err(invalid("duration_minutes must be positive"));
        }
        if !doc.t0_timestamp.is_finite() {
            return Err(invalid("t0_timestamp must be finite"));
        }

        let millis = (doc.t0_timestamp * 1000.0).round() as i64;
        let reference_epoch =
            DateTime::from_timestamp_millis(millis).ok_or_else(|| invalid("t0_timestamp out of range"))?;

        Ok(Self {
            coefficients: doc.coefficients,
            reference_epoch,
            valid_duration_minutes: doc.duration_minutes,
            max_error_degrees: doc.max_error_degrees,
            longitude_is_unwrapped: doc.longitude_unwrapped,
        })
    }

    pub fn normalized_time(&self, at: DateTime<Utc>) -> f64 {
        minutes_between(self.reference_epoch, at) / self.valid_duration_minutes
    }

    pub fn in_window(t_norm: f64) -> bool {
        (0.0..=1.0).contains(&t_norm)
    }

    /// Horner evaluation at normalized time.
    pub fn evaluate(&self, t_norm: f64) -> f64 {
        self.coefficients
            .iter()
            .fold(0.0, |acc, c| acc * t_norm + c)
    }
}

/// Latitude and longitude models, only usable together.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelPair {
    pub latitude: PolynomialModel,
    pub longitude: PolynomialModel,
    /// When the load that produced the pair was issued.
    pub loaded_at: DateTime<Utc>,
}
