use super::types::{VelocityVector, MAX_CONFIDENCE, MIN_CONFIDENCE};

/// Horizon below which a velocity vector affects confidence.
const SHORT_HORIZON_MINUTES: f64 = 30.0;
const MISSING_VELOCITY_FACTOR: f64 = 0.85;
const PERTURBATION_HORIZON_MINUTES: f64 = 1440.0;
const PERTURBATION_MAX_LOSS: f64 = 0.2;

/// Step function of the horizon.
pub fn base_confidence(minutes_ahead: f64) -> f64 {
    match minutes_ahead {
        m if m < 5.0 => 0.95,
        m if m < 15.0 => 0.9,
        m if m < 30.0 => 0.85,
        m if m < 60.0 => 0.75,
        m if m < 120.0 => 0.65,
        m if m < 360.0 => 0.5,
        m if m < 720.0 => 0.4,
        _ => 0.3,
    }
}

/// Confidence for a prediction that did not come with its own score.
pub fn score(minutes_ahead: f64, velocity: Option<&VelocityVector>) -> f64 {
    let mut confidence = base_confidence(minutes_ahead);

    if minutes_ahead < SHORT_HORIZON_MINUTES {
        match velocity {
            Some(v) => {
                let nearness = 1.0 - minutes_ahead / SHORT_HORIZON_MINUTES;
                confidence += (MAX_CONFIDENCE - confidence) * v.quality_score * nearness;
            }
            None => confidence *= MISSING_VELOCITY_FACTOR,
        }
    }

    // drag and other unmodeled perturbations accumulate over a day
    let decay = PERTURBATION_MAX_LOSS * (minutes_ahead / PERTURBATION_HORIZON_MINUTES).min(1.0);
    confidence *= 1.0 - decay;

    confidence.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}
