mod error;
mod params;
mod propagation;
mod tle;
mod tle_loader;

pub use error::{PropagationError, TleError};
pub use params::{
    OrbitalParameterStore, OrbitalParameters, PeriodBounds, DEFAULT_INCLINATION_DEG,
    DEFAULT_PERIOD_MINUTES, EARTH_ROTATION_DEG_PER_MIN,
};
pub use propagation::{GeodeticPosition, Propagator, Sgp4Propagator};
pub use tle::{parse_tle, period_from_mean_motion, TleRecord, ISS_NORAD_ID};
pub use tle_loader::TleIngestor;
