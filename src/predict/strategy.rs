use super::blender::{orbital_position, velocity_position, PredictionBlender};
use super::confidence;
use super::polynomial::predict_polynomial;
use super::tuning::Tuning;
use super::types::{target_time, LocationSample, Method, Prediction, VelocityVector};
use crate::model::ModelPair;
use crate::orbit::{OrbitalParameters, Propagator};

/// Everything a strategy may look at for one request.
pub struct PredictionContext<'a> {
    pub current: &'a LocationSample,
    pub minutes_ahead: f64,
    /// Samples preceding `current`, newest first.
    pub history: &'a [LocationSample],
    pub velocity: Option<&'a VelocityVector>,
    pub params: &'a OrbitalParameters,
    pub tuning: &'a Tuning,
    pub models: Option<&'a ModelPair>,
    pub propagator: Option<&'a dyn Propagator>,
}

/// One link of the fallback chain.
pub trait PredictionStrategy: Send + Sync {
    fn name(&self) -> Method;

    /// `None` hands the request to the next strategy.
    fn try_predict(&self, ctx: &PredictionContext) -> Option<Prediction>;
}

pub struct PolynomialStrategy;

impl PredictionStrategy for PolynomialStrategy {
    fn name(&self) -> Method {
        Method::Polynomial
    }

    fn try_predict(&self, ctx: &PredictionContext) -> Option<Prediction> {
        predict_polynomial(ctx.models?, ctx.current, ctx.minutes_ahead)
    }
}

pub struct Sgp4Strategy;

impl PredictionStrategy for Sgp4Strategy {
    fn name(&self) -> Method {
        Method::Sgp4Fallback
    }

    fn try_predict(&self, ctx: &PredictionContext) -> Option<Prediction> {
        let propagator = ctx.propagator?;
        let at = target_time(ctx.current.timestamp, ctx.minutes_ahead)?;
        let position = propagator
            .propagate(at)
            .inspect_err(|e| log::debug!("SGP4 propagation failed at {}: {}", at, e))
            .ok()?;
        Prediction::build(
            ctx.current,
            ctx.minutes_ahead,
            position.latitude_deg,
            position.longitude_deg,
            confidence::score(ctx.minutes_ahead, ctx.velocity),
            Method::Sgp4Fallback,
        )
    }
}

pub struct BlendedStrategy;

impl PredictionStrategy for BlendedStrategy {
    fn name(&self) -> Method {
        Method::Blended
    }

    fn try_predict(&self, ctx: &PredictionContext) -> Option<Prediction> {
        let estimate = PredictionBlender::new(ctx.params, ctx.tuning).predict(
            ctx.current,
            ctx.minutes_ahead,
            ctx.velocity,
            ctx.history,
        );
        Prediction::build(
            ctx.current,
            ctx.minutes_ahead,
            estimate.latitude_deg(),
            estimate.longitude_deg(),
            confidence::score(ctx.minutes_ahead, ctx.velocity),
            estimate.method,
        )
    }
}

/// Orbital mechanics alone, ignoring any velocity estimate.
pub struct OrbitalStrategy;

impl PredictionStrategy for OrbitalStrategy {
    fn name(&self) -> Method {
        Method::Orbital
    }

    fn try_predict(&self, ctx: &PredictionContext) -> Option<Prediction> {
        let ascending = super::blender::is_ascending(ctx.current, ctx.history, ctx.velocity);
        let (lat, lon) = orbital_position(ctx.current, ctx.minutes_ahead, ctx.params, ascending);
        Prediction::build(
            ctx.current,
            ctx.minutes_ahead,
            lat,
            lon,
            confidence::score(ctx.minutes_ahead, None),
            Method::Orbital,
        )
    }
}

/// Straight-line extrapolation at any horizon.
pub struct VelocityStrategy;

impl PredictionStrategy for VelocityStrategy {
    fn name(&self) -> Method {
        Method::Velocity
    }

    fn try_predict(&self, ctx: &PredictionContext) -> Option<Prediction> {
        let velocity = ctx.velocity?;
        let (lat, lon) = velocity_position(ctx.current, ctx.minutes_ahead, velocity);
        Prediction::build(
            ctx.current,
            ctx.minutes_ahead,
            lat,
            lon,
            confidence::score(ctx.minutes_ahead, Some(velocity)),
            Method::Velocity,
        )
    }
}

pub fn strategy_for(method: Method) -> Box<dyn PredictionStrategy> {
    match method {
        Method::Polynomial => Box::new(PolynomialStrategy),
        Method::Sgp4Fallback => Box::new(Sgp4Strategy),
        Method::Blended => Box::new(BlendedStrategy),
        Method::Orbital => Box::new(OrbitalStrategy),
        Method::Velocity => Box::new(VelocityStrategy),
    }
}

pub fn default_chain() -> Vec<Method> {
    vec![
        Method::Polynomial,
        Method::Sgp4Fallback,
        Method::Blended,
        Method::Velocity,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orbit::{GeodeticPosition, PropagationError};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    struct Fixed(Option<GeodeticPosition>);

    impl Propagator for Fixed {
        fn propagate(&self, _at: DateTime<Utc>) -> Result<GeodeticPosition, PropagationError> {
            self.0.ok_or(PropagationError::NonFinite)
        }
    }

    fn current() -> LocationSample {
        LocationSample::new(Utc.with_ymd_and_hms(2024, 1, 15, 15, 0, 0).unwrap(), 10.0, 20.0)
    }

    fn run(strategy: &dyn PredictionStrategy, propagator: Option<&dyn Propagator>) -> Option<Prediction> {
        let current = current();
        let params = OrbitalParameters::default();
        let tuning = Tuning::default();
        let ctx = PredictionContext {
            current: &current,
            minutes_ahead: 15.0,
            history: &[],
            velocity: None,
            params: &params,
            tuning: &tuning,
            models: None,
            propagator,
        };
        strategy.try_predict(&ctx)
    }

    #[test]
    fn missing_inputs_yield_none() {
        assert!(run(&PolynomialStrategy, None).is_none());
        assert!(run(&Sgp4Strategy, None).is_none());
        assert!(run(&VelocityStrategy, None).is_none());
    }

    #[test]
    fn orbital_paths_always_answer() {
        assert_eq!(run(&BlendedStrategy, None).unwrap().method, Method::Orbital);
        assert_eq!(run(&OrbitalStrategy, None).unwrap().method, Method::Orbital);
    }

    #[test]
    fn sgp4_uses_propagator_output() {
        let ok = Fixed(Some(GeodeticPosition {
            latitude_deg: -12.5,
            longitude_deg: 170.0,
            altitude_km: 420.0,
        }));
        let p = run(&Sgp4Strategy, Some(&ok)).unwrap();
        assert_eq!(p.method, Method::Sgp4Fallback);
        assert_eq!((p.latitude, p.longitude), (-12.5, 170.0));
        assert_eq!(p.timestamp, current().timestamp + Duration::minutes(15));

        let failing = Fixed(None);
        assert!(run(&Sgp4Strategy, Some(&failing)).is_none());
    }

    #[test]
    fn non_finite_output_is_rejected() {
        let nan = Fixed(Some(GeodeticPosition {
            latitude_deg: f64::NAN,
            longitude_deg: 0.0,
            altitude_km: 0.0,
        }));
        assert!(run(&Sgp4Strategy, Some(&nan)).is_none());
    }

    #[test]
    fn names_match_factory() {
        for method in default_chain() {
            assert_eq!(strategy_for(method).name(), method);
        }
    }
}
