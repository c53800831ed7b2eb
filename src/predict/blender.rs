use std::f64::consts::{PI, TAU};

use super::tuning::Tuning;
use super::types::{LocationSample, Method, VelocityVector};
use crate::geo::{clamp_latitude, longitude_delta, wrap_longitude};
use crate::orbit::OrbitalParameters;

/// Output of the blended path, in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendedEstimate {
    pub latitude: f64,
    pub longitude: f64,
    pub method: Method,
    pub velocity_weight: f64,
}

impl BlendedEstimate {
    pub fn latitude_deg(&self) -> f64 {
        self.latitude.to_degrees()
    }

    pub fn longitude_deg(&self) -> f64 {
        self.longitude.to_degrees()
    }
}

/// Blends short-horizon velocity extrapolation with the orbital model.
pub struct PredictionBlender<'a> {
    params: &'a OrbitalParameters,
    tuning: &'a Tuning,
}

impl<'a> PredictionBlender<'a> {
    pub fn new(params: &'a OrbitalParameters, tuning: &'a Tuning) -> Self {
        Self { params, tuning }
    }

    /// Weight of the velocity estimate at this horizon.
    pub fn velocity_weight(&self, minutes_ahead: f64) -> f64 {
        let (start, end) = (self.tuning.blend_start_minutes, self.tuning.blend_end_minutes);
        if minutes_ahead <= start {
            1.0
        } else if minutes_ahead >= end {
            0.0
        } else {
            let x = (minutes_ahead - start) / (end - start);
            self.tuning.blend_curve.velocity_weight(x, self.tuning)
        }
    }

    /// `history` holds the samples preceding `current`, newest first.
    pub fn predict(
        &self,
        current: &LocationSample,
        minutes_ahead: f64,
        velocity: Option<&VelocityVector>,
        history: &[LocationSample],
    ) -> BlendedEstimate {
        let ascending = is_ascending(current, history, velocity);
        let (orbital_lat, orbital_lon) =
            orbital_position(current, minutes_ahead, self.params, ascending);

        let Some(velocity) = velocity else {
            return estimate(orbital_lat, orbital_lon, Method::Orbital, 0.0);
        };

        let weight = self.velocity_weight(minutes_ahead);
        let (velocity_lat, velocity_lon) = velocity_position(current, minutes_ahead, velocity);

        if weight >= 1.0 {
            return estimate(velocity_lat, velocity_lon, Method::Velocity, 1.0);
        }
        if weight <= 0.0 {
            return estimate(orbital_lat, orbital_lon, Method::Orbital, 0.0);
        }

        let lat = weight * velocity_lat + (1.0 - weight) * orbital_lat;
        let lon = orbital_lon + weight * longitude_delta(orbital_lon, velocity_lon);
        estimate(lat, lon, Method::Blended, weight)
    }
}

fn estimate(lat_deg: f64, lon_deg: f64, method: Method, velocity_weight: f64) -> BlendedEstimate {
    BlendedEstimate {
        latitude: clamp_latitude(lat_deg).to_radians(),
        longitude: wrap_longitude(lon_deg).to_radians(),
        method,
        velocity_weight,
    }
}

/// Straight-line extrapolation, degrees.
pub fn velocity_position(
    current: &LocationSample,
    minutes_ahead: f64,
    velocity: &VelocityVector,
) -> (f64, f64) {
    (
        clamp_latitude(current.latitude + velocity.lat_velocity_deg_per_min * minutes_ahead),
        wrap_longitude(current.longitude + velocity.lon_velocity_deg_per_min * minutes_ahead),
    )
}

/// Sinusoidal latitude with a steadily advancing longitude, degrees.
pub fn orbital_position(
    current: &LocationSample,
    minutes_ahead: f64,
    params: &OrbitalParameters,
    ascending: bool,
) -> (f64, f64) {
    let phase = orbital_phase(current.latitude, ascending, params.inclination_degrees);
    let future_phase = phase + params.orbital_angular_velocity_rad() * minutes_ahead;
    let lat = params.inclination_degrees * future_phase.sin();
    let lon = wrap_longitude(current.longitude + params.net_longitude_rate * minutes_ahead);
    (lat, lon)
}

/// Orbital phase in [0, 2pi) from latitude and direction of travel.
///
/// Two phases share each latitude; `ascending` picks the branch.
pub fn orbital_phase(latitude: f64, ascending: bool, inclination: f64) -> f64 {
    let principal = (latitude / inclination).clamp(-1.0, 1.0).asin();
    let phase = if ascending {
        if latitude >= 0.0 {
            principal
        } else {
            TAU + principal
        }
    } else {
        PI - principal
    };
    phase.rem_euclid(TAU)
}

/// Direction of travel: the most recent observed latitude change, then the
/// velocity vector, then northbound in the northern hemisphere.
pub fn is_ascending(
    current: &LocationSample,
    history: &[LocationSample],
    velocity: Option<&VelocityVector>,
) -> bool {
    if let Some(previous) = history.first() {
        if previous.timestamp < current.timestamp {
            let dlat = current.latitude - previous.latitude;
            if dlat != 0.0 {
                return dlat > 0.0;
            }
        }
    }
    if let Some(v) = velocity {
        if v.lat_velocity_deg_per_min != 0.0 {
            return v.lat_velocity_deg_per_min > 0.0;
        }
    }
    current.latitude >= 0.0
}
