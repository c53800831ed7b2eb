use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::tle::TleRecord;

pub const DEFAULT_PERIOD_MINUTES: f64 = 92.9;
pub const DEFAULT_INCLINATION_DEG: f64 = 51.6;
pub const MIN_PERIOD_MINUTES: f64 = 92.5;
pub const MAX_PERIOD_MINUTES: f64 = 93.5;

/// Earth's rotation under the ground track, degrees per minute.
pub const EARTH_ROTATION_DEG_PER_MIN: f64 = 360.0 / (24.0 * 60.0);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct OrbitalParameters {
    pub period_minutes: f64,
    pub inclination_degrees: f64,
    /// Degrees of orbital phase per minute.
    pub orbital_angular_velocity: f64,
    pub earth_rotation_rate: f64,
    pub net_longitude_rate: f64,
}

impl OrbitalParameters {
    pub fn new(period_minutes: f64, inclination_degrees: f64) -> Self {
        let orbital_angular_velocity = 360.0 / period_minutes;
        Self {
            period_minutes,
            inclination_degrees,
            orbital_angular_velocity,
            earth_rotation_rate: EARTH_ROTATION_DEG_PER_MIN,
            net_longitude_rate: orbital_angular_velocity - EARTH_ROTATION_DEG_PER_MIN,
        }
    }

    pub fn orbital_angular_velocity_rad(&self) -> f64 {
        self.orbital_angular_velocity.to_radians()
    }
}

impl Default for OrbitalParameters {
    fn default() -> Self {
        Self::new(DEFAULT_PERIOD_MINUTES, DEFAULT_INCLINATION_DEG)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct PeriodBounds {
    pub min: f64,
    pub max: f64,
}

impl Default for PeriodBounds {
    fn default() -> Self {
        Self {
            min: MIN_PERIOD_MINUTES,
            max: MAX_PERIOD_MINUTES,
        }
    }
}

impl PeriodBounds {
    pub fn clamp(&self, period: f64) -> f64 {
        period.clamp(self.min, self.max)
    }
}

/// Owner of the live orbital constants.
///
/// Every mutation bumps `revision`, which is what caches compare against to
/// decide whether their contents are still derived from current inputs.
#[derive(Debug, Clone)]
pub struct OrbitalParameterStore {
    params: OrbitalParameters,
    bounds: PeriodBounds,
    revision: u64,
    tle: Option<TleRecord>,
}

impl OrbitalParameterStore {
    pub fn new(defaults: OrbitalParameters, bounds: PeriodBounds) -> Self {
        let params = OrbitalParameters::new(
            bounds.clamp(defaults.period_minutes),
            defaults.inclination_degrees,
        );
        Self {
            params,
            bounds,
            revision: 0,
            tle: None,
        }
    }

    pub fn params(&self) -> &OrbitalParameters {
        &self.params
    }

    pub fn bounds(&self) -> PeriodBounds {
        self.bounds
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn tle(&self) -> Option<&TleRecord> {
        self.tle.as_ref()
    }

    pub fn last_ingested_at(&self) -> Option<DateTime<Utc>> {
        self.tle.as_ref().map(|t| t.ingested_at)
    }

    /// Apply a freshly ingested TLE.
    ///
    /// Returns `false` and leaves the store untouched when a record issued
    /// later than this one has already been applied.
    pub fn apply_tle(&mut self, record: TleRecord) -> bool {
        if let Some(current) = &self.tle {
            if record.ingested_at < current.ingested_at {
                log::info!(
                    "Discarding stale TLE issued at {} (current issued at {})",
                    record.ingested_at,
                    current.ingested_at
                );
                return false;
            }
        }

        let period = self.bounds.clamp(record.derived_period_minutes);
        if period != record.derived_period_minutes {
            log::warn!(
                "TLE period {:.3} min outside bounds, clamped to {:.3}",
                record.derived_period_minutes,
                period
            );
        }
        self.params = OrbitalParameters::new(period, record.inclination);
        self.tle = Some(record);
        self.revision += 1;
        true
    }

    /// Set the period, clamped into bounds. Returns the value applied.
    pub fn set_period(&mut self, period_minutes: f64) -> f64 {
        let period = self.bounds.clamp(period_minutes);
        self.params = OrbitalParameters::new(period, self.params.inclination_degrees);
        self.revision += 1;
        period
    }

    pub fn nudge_period(&mut self, delta_minutes: f64) -> f64 {
        self.set_period(self.params.period_minutes + delta_minutes)
    }
}

impl Default for OrbitalParameterStore {
    fn default() -> Self {
        Self::new(OrbitalParameters::default(), PeriodBounds::default())
    }
}
