use chrono::{DateTime, Duration, Utc};

use super::cache::{CacheKey, PredictionCache, DEFAULT_TTL_MINUTES};
use super::calibration::CalibrationLoop;
use super::error::PredictError;
use super::path::{Path, PathRequest};
use super::strategy::{default_chain, strategy_for, PredictionContext, PredictionStrategy};
use super::tuning::Tuning;
use super::types::{target_time, LocationSample, Method, Prediction, VelocityVector};
use super::velocity::estimate_velocity;
use crate::model::ModelPair;
use crate::orbit::{
    OrbitalParameterStore, OrbitalParameters, PeriodBounds, Propagator, Sgp4Propagator, TleRecord,
};

/// Construction-time settings of an engine.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub defaults: OrbitalParameters,
    pub period_bounds: PeriodBounds,
    pub tuning: Tuning,
    pub strategies: Vec<Method>,
    pub cache_ttl: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            defaults: OrbitalParameters::default(),
            period_bounds: PeriodBounds::default(),
            tuning: Tuning::default(),
            strategies: default_chain(),
            cache_ttl: Duration::minutes(DEFAULT_TTL_MINUTES),
        }
    }
}

/// Single-prediction entry point and owner of every mutable input.
pub struct PredictionEngine {
    store: OrbitalParameterStore,
    models: Option<ModelPair>,
    /// Bumped on every model or propagator change.
    source_revision: u64,
    propagator: Option<Box<dyn Propagator>>,
    strategies: Vec<Box<dyn PredictionStrategy>>,
    tuning: Tuning,
    cache: PredictionCache,
    calibration: CalibrationLoop,
}

impl PredictionEngine {
    pub fn new(settings: EngineSettings) -> Self {
        log::info!(
            "Prediction engine: tuning v{}, chain {:?}",
            settings.tuning.version,
            settings.strategies
        );
        Self {
            store: OrbitalParameterStore::new(settings.defaults, settings.period_bounds),
            models: None,
            source_revision: 0,
            propagator: None,
            strategies: settings.strategies.into_iter().map(strategy_for).collect(),
            calibration: CalibrationLoop::new(&settings.tuning),
            tuning: settings.tuning,
            cache: PredictionCache::new(settings.cache_ttl),
        }
    }

    pub fn params(&self) -> &OrbitalParameters {
        self.store.params()
    }

    pub fn store(&self) -> &OrbitalParameterStore {
        &self.store
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn models(&self) -> Option<&ModelPair> {
        self.models.as_ref()
    }

    pub fn has_propagator(&self) -> bool {
        self.propagator.is_some()
    }

    pub fn calibration(&self) -> &CalibrationLoop {
        &self.calibration
    }

    pub fn strategy_names(&self) -> Vec<Method> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Combined revision of every input cached predictions depend on.
    pub fn revision(&self) -> u64 {
        self.store.revision() + self.source_revision
    }

    /// Apply an ingested TLE and rebuild the SGP4 propagator from it.
    /// Returns `false` when a newer TLE is already in place.
    pub fn apply_tle(&mut self, record: TleRecord) -> bool {
        let propagator = Sgp4Propagator::from_record(&record);
        if !self.store.apply_tle(record) {
            return false;
        }
        match propagator {
            Ok(p) => self.propagator = Some(Box::new(p)),
            Err(e) => {
                log::warn!("SGP4 unavailable for new TLE: {}", e);
                self.propagator = None;
            }
        }
        self.source_revision += 1;
        true
    }

    /// Install a loaded model pair unless a newer load already landed.
    pub fn apply_models(&mut self, pair: ModelPair) -> bool {
        if let Some(current) = &self.models {
            if pair.loaded_at < current.loaded_at {
                log::info!("Discarding stale polynomial models from {}", pair.loaded_at);
                return false;
            }
        }
        self.models = Some(pair);
        self.source_revision += 1;
        true
    }

    /// A load issued at `issued_at` failed: polynomial predictions stop,
    /// unless a newer load has succeeded in the meantime.
    pub fn disable_models(&mut self, issued_at: DateTime<Utc>) -> bool {
        match &self.models {
            Some(current) if current.loaded_at > issued_at => false,
            Some(_) => {
                log::warn!("Polynomial method disabled");
                self.models = None;
                self.source_revision += 1;
                true
            }
            None => false,
        }
    }

    pub fn set_propagator(&mut self, propagator: Option<Box<dyn Propagator>>) {
        self.propagator = propagator;
        self.source_revision += 1;
    }

    /// Velocity over `current` and the history samples preceding it.
    pub fn estimate_velocity(
        &self,
        current: &LocationSample,
        history: &[LocationSample],
    ) -> Option<VelocityVector> {
        let prior = prior_samples(current, history);
        estimate_velocity(&velocity_window(current, &prior), &self.tuning)
    }

    pub fn predict(
        &mut self,
        current: &LocationSample,
        minutes_ahead: f64,
        history: &[LocationSample],
    ) -> Result<Option<Prediction>, PredictError> {
        self.predict_at(current, minutes_ahead, history, Utc::now())
    }

    /// Predict with an explicit clock for cache expiry.
    pub fn predict_at(
        &mut self,
        current: &LocationSample,
        minutes_ahead: f64,
        history: &[LocationSample],
        now: DateTime<Utc>,
    ) -> Result<Option<Prediction>, PredictError> {
        validate(current, minutes_ahead)?;

        let revision = self.revision();
        self.cache.sync_revision(revision);
        let key = CacheKey::new(current.timestamp, minutes_ahead);
        if let Some(hit) = self.cache.get(&key, now) {
            return Ok(Some(hit));
        }

        let prior = prior_samples(current, history);
        let velocity = estimate_velocity(&velocity_window(current, &prior), &self.tuning);

        let prediction = {
            let ctx = PredictionContext {
                current,
                minutes_ahead,
                history: &prior,
                velocity: velocity.as_ref(),
                params: self.store.params(),
                tuning: &self.tuning,
                models: self.models.as_ref(),
                propagator: self.propagator.as_deref(),
            };
            self.strategies.iter().find_map(|strategy| {
                let result = strategy.try_predict(&ctx);
                if result.is_none() {
                    log::debug!(
                        "{} produced no prediction for +{} min",
                        strategy.name(),
                        minutes_ahead
                    );
                }
                result
            })
        };

        match prediction {
            Some(p) => self.cache.insert(p, now),
            None => log::warn!(
                "No strategy produced a prediction for {} +{} min",
                current.timestamp,
                minutes_ahead
            ),
        }
        Ok(prediction)
    }

    /// Lazily predict every step of `request`.
    pub fn path<'e>(&'e mut self, request: &'e PathRequest) -> Result<Path<'e>, PredictError> {
        Path::new(self, request)
    }

    /// Feed ground truth for a past prediction into period calibration.
    pub fn record_calibration(
        &mut self,
        prediction: &Prediction,
        actual: &LocationSample,
    ) -> Option<f64> {
        self.calibration.record(&mut self.store, prediction, actual)
    }
}

impl Default for PredictionEngine {
    fn default() -> Self {
        Self::new(EngineSettings::default())
    }
}

pub(crate) fn validate(current: &LocationSample, minutes_ahead: f64) -> Result<(), PredictError> {
    if !current.is_valid() {
        return Err(PredictError::InvalidLocation {
            latitude: current.latitude,
            longitude: current.longitude,
        });
    }
    if !(minutes_ahead.is_finite() && minutes_ahead > 0.0)
        || target_time(current.timestamp, minutes_ahead).is_none()
    {
        return Err(PredictError::InvalidHorizon(minutes_ahead));
    }
    Ok(())
}

fn prior_samples(current: &LocationSample, history: &[LocationSample]) -> Vec<LocationSample> {
    history
        .iter()
        .filter(|s| s.timestamp < current.timestamp)
        .copied()
        .collect()
}

/// `current` followed by the samples preceding it, newest first.
fn velocity_window(current: &LocationSample, prior: &[LocationSample]) -> Vec<LocationSample> {
    std::iter::once(*current)
        .chain(prior.iter().copied())
        .collect()
}
