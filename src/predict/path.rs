use serde::Deserialize;
use utoipa::ToSchema;

use super::engine::{validate, PredictionEngine};
use super::error::PredictError;
use super::types::{LocationSample, Prediction};

/// Upper bound on the number of steps one request may ask for.
pub const MAX_PATH_STEPS: usize = 10_000;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PathRequest {
    pub current: LocationSample,
    pub start_minutes: f64,
    pub end_minutes: f64,
    pub step_minutes: f64,
    /// Newest first.
    #[serde(default)]
    pub history: Vec<LocationSample>,
}

impl PathRequest {
    pub fn validate(&self) -> Result<(), PredictError> {
        let (start, end, step) = (self.start_minutes, self.end_minutes, self.step_minutes);
        if !(start.is_finite() && end.is_finite() && step.is_finite()) {
            return Err(PredictError::InvalidPath("bounds must be finite".to_string()));
        }
        if step <= 0.0 {
            return Err(PredictError::InvalidPath(format!("step must be positive, got {}", step)));
        }
        if end < start {
            return Err(PredictError::InvalidPath(format!(
                "end {} precedes start {}",
                end, start
            )));
        }
        let count = self.step_count();
        if !(count <= MAX_PATH_STEPS as f64) {
            return Err(PredictError::InvalidPath(format!(
                "{} steps exceeds the limit of {}",
                count, MAX_PATH_STEPS
            )));
        }
        validate(&self.current, start)?;
        validate(&self.current, end)
    }

    /// Number of horizons in `[start, end]`, capped at [`MAX_PATH_STEPS`].
    pub fn steps(&self) -> usize {
        // NaN casts to 0
        self.step_count().min(MAX_PATH_STEPS as f64) as usize
    }

    fn step_count(&self) -> f64 {
        ((self.end_minutes - self.start_minutes) / self.step_minutes + 1e-9).floor() + 1.0
    }

    pub fn minutes_at(&self, index: usize) -> f64 {
        self.start_minutes + index as f64 * self.step_minutes
    }
}

/// Lazily walks a [`PathRequest`], skipping horizons no strategy can answer.
pub struct Path<'e> {
    engine: &'e mut PredictionEngine,
    request: &'e PathRequest,
    cursor: usize,
}

impl<'e> Path<'e> {
    pub(crate) fn new(
        engine: &'e mut PredictionEngine,
        request: &'e PathRequest,
    ) -> Result<Self, PredictError> {
        request.validate()?;
        Ok(Self {
            engine,
            request,
            cursor: 0,
        })
    }
}

impl Iterator for Path<'_> {
    type Item = Prediction;

    fn next(&mut self) -> Option<Prediction> {
        let steps = self.request.steps();
        while self.cursor < steps {
            let minutes = self.request.minutes_at(self.cursor);
            self.cursor += 1;
            match self
                .engine
                .predict(&self.request.current, minutes, &self.request.history)
            {
                Ok(Some(prediction)) => return Some(prediction),
                Ok(None) => continue,
                Err(e) => {
                    log::debug!("Skipping path step at +{} min: {}", minutes, e);
                    continue;
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.request.steps().saturating_sub(self.cursor)))
    }
}
