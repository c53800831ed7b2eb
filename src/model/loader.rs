use std::time::Duration;

use chrono::Utc;

use super::error::ModelError;
use super::polynomial::{ModelPair, PolynomialModel};
use crate::source::Source;

/// Loads the latitude and longitude models as one unit.
pub struct PolynomialModelLoader {
    latitude: Source,
    longitude: Source,
    timeout: Duration,
}

impl PolynomialModelLoader {
    pub fn new(latitude: Source, longitude: Source, timeout: Duration) -> Self {
        Self {
            latitude,
            longitude,
            timeout,
        }
    }

    /// Both models are fetched independently; either failing fails the pair.
    pub async fn load(&self) -> Result<ModelPair, ModelError> {
        let loaded_at = Utc::now();
        let (lat, lon) = tokio::join!(
            load_one("latitude", &self.latitude, self.timeout),
            load_one("longitude", &self.longitude, self.timeout),
        );

        match (lat, lon) {
            (Ok(latitude), Ok(longitude)) => {
                log::info!(
                    "Polynomial models loaded: lat degree {}, lon degree {}, window {:.0} min",
                    latitude.coefficients.len().saturating_sub(1),
                    longitude.coefficients.len().saturating_sub(1),
                    latitude.valid_duration_minutes
                );
                Ok(ModelPair {
                    latitude,
                    longitude,
                    loaded_at,
                })
            }
            (Err(e), _) | (_, Err(e)) => Err(e),
        }
    }
}

async fn load_one(
    coordinate: &'static str,
    source: &Source,
    timeout: Duration,
) -> Result<PolynomialModel, ModelError> {
    let json = source.fetch(timeout).await.map_err(|e| {
        log::warn!("Failed to fetch {} model from {}: {}", coordinate, source, e);
        e
    })?;
    PolynomialModel::from_json(coordinate, &json).map_err(|e| {
        log::warn!("Failed to parse {} model from {}: {}", coordinate, source, e);
        e
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const LAT: &str = r#"{"coefficients":[0.0,10.0],"t0_timestamp":1705320000,"duration_minutes":90,"max_error_degrees":0.2}"#;
    const LON: &str = r#"{"coefficients":[300.0,-100.0],"t0_timestamp":1705320000,"duration_minutes":90,"max_error_degrees":0.4,"longitude_unwrapped":true}"#;

    fn temp_file(tag: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("iss-predict-{}-{}.json", tag, std::process::id()));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn loads_both_models() {
        let lat = temp_file("lat-ok", LAT);
        let lon = temp_file("lon-ok", LON);
        let loader = PolynomialModelLoader::new(
            Source::File(lat.clone()),
            Source::File(lon.clone()),
            Duration::from_secs(5),
        );
        let pair = loader.load().await.unwrap();
        assert!(pair.longitude.longitude_is_unwrapped);
        assert_eq!(pair.latitude.coefficients, vec![0.0, 10.0]);
        std::fs::remove_file(lat).unwrap();
        std::fs::remove_file(lon).unwrap();
    }

    #[tokio::test]
    async fn one_missing_model_fails_the_pair() {
        let lat = temp_file("lat-only", LAT);
        let loader = PolynomialModelLoader::new(
            Source::File(lat.clone()),
            Source::File(PathBuf::from("/nonexistent/lon.json")),
            Duration::from_secs(5),
        );
        assert!(matches!(loader.load().await, Err(ModelError::Source(_))));
        std::fs::remove_file(lat).unwrap();
    }
}
