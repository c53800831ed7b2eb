mod blender;
mod cache;
mod calibration;
pub mod confidence;
mod engine;
mod error;
mod path;
mod polynomial;
mod strategy;
mod tuning;
mod types;
mod velocity;

pub use blender::{
    is_ascending, orbital_phase, orbital_position, velocity_position, BlendedEstimate,
    PredictionBlender,
};
pub use cache::{CacheKey, PredictionCache, DEFAULT_TTL_MINUTES};
pub use calibration::{CalibrationLoop, CalibrationSample};
pub use engine::{EngineSettings, PredictionEngine};
pub use error::PredictError;
pub use path::{Path, PathRequest, MAX_PATH_STEPS};
pub use polynomial::predict_polynomial;
pub use strategy::{default_chain, strategy_for, PredictionContext, PredictionStrategy};
pub use tuning::{BlendCurve, Tuning, TUNING_VERSION};
pub use types::{
    minutes_between, minutes_to_duration, target_time, LocationSample, Method, Prediction,
    VelocityVector, MAX_CONFIDENCE, MIN_CONFIDENCE,
};
pub use velocity::estimate_velocity;
