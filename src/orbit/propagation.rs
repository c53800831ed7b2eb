use chrono::{DateTime, Utc};
use sgp4::{Constants, Elements};

use super::error::PropagationError;
use super::tle::TleRecord;
use crate::geo::wrap_longitude;

// WGS-84
const WGS84_A_KM: f64 = 6378.137;
const WGS84_E2: f64 = 0.006_694_379_990_14;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeodeticPosition {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_km: f64,
}

/// Anything that can place the satellite at an absolute time.
pub trait Propagator: Send + Sync {
    fn propagate(&self, at: DateTime<Utc>) -> Result<GeodeticPosition, PropagationError>;
}

/// SGP4 over the `sgp4` crate, rebuilt every time a TLE is ingested.
pub struct Sgp4Propagator {
    elements: Elements,
    constants: Constants,
}

impl Sgp4Propagator {
    pub fn from_record(record: &TleRecord) -> Result<Self, PropagationError> {
        let elements = Elements::from_tle(
            Some(record.name.clone()),
            record.line1.as_bytes(),
            record.line2.as_bytes(),
        )?;
        let constants = Constants::from_elements(&elements)?;
        Ok(Self {
            elements,
            constants,
        })
    }

    pub fn epoch(&self) -> chrono::NaiveDateTime {
        self.elements.datetime
    }
}

impl Propagator for Sgp4Propagator {
    fn propagate(&self, at: DateTime<Utc>) -> Result<GeodeticPosition, PropagationError> {
        let minutes = self
            .elements
            .datetime_to_minutes_since_epoch(&at.naive_utc())
            .map_err(|e| PropagationError::Propagation(e.to_string()))?;
        let prediction = self.constants.propagate(minutes)?;

        let sidereal =
            sgp4::iau_epoch_to_sidereal_time(sgp4::julian_years_since_j2000(&at.naive_utc()));
        let ecef = teme_to_ecef_position(prediction.position, sidereal);
        let position = ecef_to_geodetic(ecef);

        if !(position.latitude_deg.is_finite() && position.longitude_deg.is_finite()) {
            return Err(PropagationError::NonFinite);
        }
        Ok(position)
    }
}

pub fn teme_to_ecef_position(pos_teme: [f64; 3], gmst: f64) -> [f64; 3] {
    let cos_gmst = gmst.cos();
    let sin_gmst = gmst.sin();
    [
        pos_teme[0] * cos_gmst + pos_teme[1] * sin_gmst,
        -pos_teme[0] * sin_gmst + pos_teme[1] * cos_gmst,
        pos_teme[2],
    ]
}

/// Iterative ECEF (km) to WGS-84 geodetic conversion.
pub fn ecef_to_geodetic(ecef: [f64; 3]) -> GeodeticPosition {
    let [x, y, z] = ecef;
    let p = (x * x + y * y).sqrt();
    let longitude = y.atan2(x);

    let mut latitude = z.atan2(p * (1.0 - WGS84_E2));
    let mut altitude = 0.0;
    for _ in 0..5 {
        let sin_lat = latitude.sin();
        let n = WGS84_A_KM / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
        altitude = p / latitude.cos() - n;
        latitude = z.atan2(p * (1.0 - WGS84_E2 * n / (n + altitude)));
    }

    GeodeticPosition {
        latitude_deg: latitude.to_degrees(),
        longitude_deg: wrap_longitude(longitude.to_degrees()),
        altitude_km: altitude,
    }
}
