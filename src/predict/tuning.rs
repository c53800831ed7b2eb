use serde::{Deserialize, Serialize};
use strum_macros::Display;
use utoipa::ToSchema;

pub const TUNING_VERSION: u32 = 1;

/// Shape of the velocity weight as the horizon crosses the blend window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BlendCurve {
    Linear,
    Exponential,
    Sigmoid,
}

impl BlendCurve {
    pub const ALL: [BlendCurve; 3] = [
        BlendCurve::Linear,
        BlendCurve::Exponential,
        BlendCurve::Sigmoid,
    ];

    /// Velocity weight at `x` in [0, 1] through the window: exactly 1 at the
    /// start and 0 at the end for every curve.
    pub fn velocity_weight(&self, x: f64, tuning: &Tuning) -> f64 {
        let x = x.clamp(0.0, 1.0);
        let w = match self {
            BlendCurve::Linear => 1.0 - x,
            BlendCurve::Exponential => {
                let k = tuning.exponential_rate;
                let floor = (-k).exp();
                ((-k * x).exp() - floor) / (1.0 - floor)
            }
            BlendCurve::Sigmoid => {
                let s = tuning.sigmoid_steepness;
                let f = |x: f64| 1.0 / (1.0 + (s * (x - 0.5)).exp());
                let (hi, lo) = (f(0.0), f(1.0));
                (f(x) - lo) / (hi - lo)
            }
        };
        w.clamp(0.0, 1.0)
    }
}

/// Tunable constants, fixed for the lifetime of an engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct Tuning {
    pub version: u32,
    pub blend_start_minutes: f64,
    pub blend_end_minutes: f64,
    pub blend_curve: BlendCurve,
    pub exponential_rate: f64,
    pub sigmoid_steepness: f64,
    /// Most recent samples considered by the velocity estimator.
    pub velocity_window: usize,
    pub recency_decay: f64,
    pub preferred_interval_minutes: f64,
    pub max_lat_velocity: f64,
    pub max_lon_velocity: f64,
    pub calibration_gain: f64,
    pub calibration_min_samples: usize,
    pub calibration_capacity: usize,
    pub calibration_min_minutes: f64,
    pub calibration_max_minutes: f64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            version: TUNING_VERSION,
            blend_start_minutes: 10.0,
            blend_end_minutes: 45.0,
            blend_curve: BlendCurve::Sigmoid,
            exponential_rate: 3.0,
            sigmoid_steepness: 10.0,
            velocity_window: 5,
            recency_decay: 0.5,
            preferred_interval_minutes: 10.0,
            max_lat_velocity: 4.0,
            max_lon_velocity: 4.5,
            calibration_gain: 0.1,
            calibration_min_samples: 10,
            calibration_capacity: 50,
            calibration_min_minutes: 5.0,
            calibration_max_minutes: 60.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(BlendCurve::Linear)]
    #[case(BlendCurve::Exponential)]
    #[case(BlendCurve::Sigmoid)]
    fn curves_hit_both_ends_and_decrease(#[case] curve: BlendCurve) {
        let tuning = Tuning::default();
        assert!((curve.velocity_weight(0.0, &tuning) - 1.0).abs() < 1e-12);
        assert!(curve.velocity_weight(1.0, &tuning).abs() < 1e-12);

        let mut previous = 1.0;
        for i in 1..=10 {
            let w = curve.velocity_weight(i as f64 / 10.0, &tuning);
            assert!(w <= previous);
            previous = w;
        }
    }

    #[test]
    fn linear_midpoint() {
        assert_eq!(BlendCurve::Linear.velocity_weight(0.5, &Tuning::default()), 0.5);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let tuning: Tuning = serde_yaml::from_str("blend_curve: linear\nblend_end_minutes: 30").unwrap();
        assert_eq!(tuning.blend_curve, BlendCurve::Linear);
        assert_eq!(tuning.blend_end_minutes, 30.0);
        assert_eq!(tuning.blend_start_minutes, 10.0);
        assert_eq!(tuning.version, TUNING_VERSION);
    }
}
