use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::orbit::{
    OrbitalParameters, PeriodBounds, DEFAULT_INCLINATION_DEG, DEFAULT_PERIOD_MINUTES,
    ISS_NORAD_ID,
};
use crate::predict::{default_chain, EngineSettings, Method, Tuning, DEFAULT_TTL_MINUTES};
use crate::source::Source;

pub const DEFAULT_TLE_URL: &str = "https://live.ariss.org/iss.txt";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub orbit: OrbitConfig,
    pub tle: TleConfig,
    /// Polynomial models are optional; without them the chain starts at SGP4.
    pub models: Option<ModelsConfig>,
    pub cache: CacheConfig,
    pub tuning: Tuning,
    pub strategies: StrategiesConfig,
    pub web: WebConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrbitConfig {
    pub period_minutes: f64,
    pub inclination_degrees: f64,
    pub min_period_minutes: f64,
    pub max_period_minutes: f64,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        let bounds = PeriodBounds::default();
        Self {
            period_minutes: DEFAULT_PERIOD_MINUTES,
            inclination_degrees: DEFAULT_INCLINATION_DEG,
            min_period_minutes: bounds.min,
            max_period_minutes: bounds.max,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TleConfig {
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub source: Source,
    pub norad_id: Option<u32>,
    #[serde(deserialize_with = "deserialize_duration")]
    pub refresh_interval: Duration,
    #[serde(deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
}

impl Default for TleConfig {
    fn default() -> Self {
        Self {
            source: Source::Http(DEFAULT_TLE_URL.to_string()),
            norad_id: Some(ISS_NORAD_ID),
            refresh_interval: Duration::from_secs(3600),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub latitude: Source,
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub longitude: Source,
    #[serde(
        default = "default_models_refresh",
        deserialize_with = "deserialize_duration"
    )]
    pub refresh_interval: Duration,
    #[serde(default = "default_timeout", deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
}

fn default_models_refresh() -> Duration {
    Duration::from_secs(3600)
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    #[serde(deserialize_with = "deserialize_duration")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_TTL_MINUTES as u64 * 60),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct StrategiesConfig(pub Vec<Method>);

impl Default for StrategiesConfig {
    fn default() -> Self {
        Self(default_chain())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub bind: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        content.parse()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let orbit = &self.orbit;
        if !(orbit.min_period_minutes > 0.0 && orbit.min_period_minutes <= orbit.max_period_minutes)
        {
            return Err(ConfigError::Invalid(format!(
                "period bounds [{}, {}] are not an increasing positive range",
                orbit.min_period_minutes, orbit.max_period_minutes
            )));
        }
        if !(orbit.inclination_degrees > 0.0 && orbit.inclination_degrees <= 90.0) {
            return Err(ConfigError::Invalid(format!(
                "inclination {} outside (0, 90]",
                orbit.inclination_degrees
            )));
        }
        let tuning = &self.tuning;
        if tuning.blend_start_minutes >= tuning.blend_end_minutes {
            return Err(ConfigError::Invalid(format!(
                "blend window [{}, {}] is empty",
                tuning.blend_start_minutes, tuning.blend_end_minutes
            )));
        }
        if self.strategies.0.is_empty() {
            return Err(ConfigError::Invalid("strategy list is empty".to_string()));
        }
        Ok(())
    }

    pub fn engine_settings(&self) -> EngineSettings {
        let bounds = PeriodBounds {
            min: self.orbit.min_period_minutes,
            max: self.orbit.max_period_minutes,
        };
        EngineSettings {
            defaults: OrbitalParameters::new(
                bounds.clamp(self.orbit.period_minutes),
                self.orbit.inclination_degrees,
            ),
            period_bounds: bounds,
            tuning: self.tuning.clone(),
            strategies: self.strategies.0.clone(),
            cache_ttl: chrono::Duration::from_std(self.cache.ttl)
                .unwrap_or_else(|_| chrono::Duration::minutes(DEFAULT_TTL_MINUTES)),
        }
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(yaml: &str) -> Result<Self, Self::Err> {
        // an empty document deserializes as unit, not as an empty mapping
        if yaml.trim().is_empty() {
            return Ok(Config::default());
        }
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(s.trim()).map_err(serde::de::Error::custom)
}
