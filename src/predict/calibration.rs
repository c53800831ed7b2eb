use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::tuning::Tuning;
use super::types::{LocationSample, Prediction};
use crate::geo::longitude_delta;
use crate::orbit::OrbitalParameterStore;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct CalibrationSample {
    pub minutes_ahead: f64,
    pub longitude_error_degrees: f64,
    pub recorded_at: DateTime<Utc>,
}

/// Feeds observed longitude drift back into the orbital period.
pub struct CalibrationLoop {
    samples: VecDeque<CalibrationSample>,
    capacity: usize,
    min_samples: usize,
    gain: f64,
    min_minutes: f64,
    max_minutes: f64,
}

impl CalibrationLoop {
    pub fn new(tuning: &Tuning) -> Self {
        let capacity = tuning.calibration_capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            min_samples: tuning.calibration_min_samples.max(1),
            gain: tuning.calibration_gain,
            min_minutes: tuning.calibration_min_minutes,
            max_minutes: tuning.calibration_max_minutes,
        }
    }

    pub fn samples(&self) -> impl Iterator<Item = &CalibrationSample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Compare a past prediction against the position later observed.
    ///
    /// Returns the period after adjustment, or `None` when the horizon is
    /// outside the calibration band or too few samples exist yet.
    pub fn record(
        &mut self,
        store: &mut OrbitalParameterStore,
        prediction: &Prediction,
        actual: &LocationSample,
    ) -> Option<f64> {
        let minutes = prediction.minutes_ahead;
        if !(self.min_minutes..=self.max_minutes).contains(&minutes) {
            log::debug!("Skipping calibration for {:.1} min horizon", minutes);
            return None;
        }

        let error = longitude_delta(prediction.longitude, actual.longitude);
        if !error.is_finite() {
            return None;
        }
        self.push(CalibrationSample {
            minutes_ahead: minutes,
            longitude_error_degrees: error,
            recorded_at: Utc::now(),
        });
        self.evaluate(store)
    }

    pub fn push(&mut self, sample: CalibrationSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Nudge the period by a fraction of the mean drift rate.
    pub fn evaluate(&self, store: &mut OrbitalParameterStore) -> Option<f64> {
        if self.samples.len() < self.min_samples {
            return None;
        }

        let mean_rate = self
            .samples
            .iter()
            .map(|s| s.longitude_error_degrees / s.minutes_ahead)
            .sum::<f64>()
            / self.samples.len() as f64;
        if !mean_rate.is_finite() {
            return None;
        }

        let before = store.params().period_minutes;
        let after = store.nudge_period(self.gain * mean_rate);
        log::info!(
            "Calibrated orbital period {:.4} -> {:.4} min (mean drift {:+.4} deg/min over {} samples)",
            before,
            after,
            mean_rate,
            self.samples.len()
        );
        Some(after)
    }
}
