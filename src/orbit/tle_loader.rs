use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};

use super::error::TleError;
use super::tle::{parse_tle, TleRecord};
use crate::source::Source;

/// Fetches TLEs from a source no more often than `refresh_interval`.
pub struct TleIngestor {
    source: Source,
    norad_id: Option<u32>,
    refresh_interval: Duration,
    timeout: StdDuration,
    last_attempt: Option<DateTime<Utc>>,
}

impl TleIngestor {
    pub fn new(
        source: Source,
        norad_id: Option<u32>,
        refresh_interval: Duration,
        timeout: StdDuration,
    ) -> Self {
        Self {
            source,
            norad_id,
            refresh_interval,
            timeout,
            last_attempt: None,
        }
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    /// Whether a fetch is allowed at `now`. Failed attempts count too, so a
    /// broken source is retried on the next interval rather than immediately.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_attempt {
            Some(last) => now - last >= self.refresh_interval,
            None => true,
        }
    }

    /// Fetch and parse. The record is stamped with the time the fetch was
    /// issued so late completions lose against newer ones.
    pub async fn fetch(&mut self) -> Result<TleRecord, TleError> {
        let issued_at = Utc::now();
        self.last_attempt = Some(issued_at);
        log::info!("Fetching TLE from {}", self.source);

        let content = self.source.fetch(self.timeout).await?;
        let record = parse_tle(&content, self.norad_id, issued_at)?;

        log::info!(
            "TLE parameters loaded: {} inclination={:.4} period={:.2} min",
            record.name,
            record.inclination,
            record.derived_period_minutes
        );
        Ok(record)
    }

    /// Fetch only when due. `None` means the interval has not elapsed.
    pub async fn fetch_if_due(&mut self) -> Option<Result<TleRecord, TleError>> {
        if !self.is_due(Utc::now()) {
            return None;
        }
        Some(self.fetch().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceError;
    use std::path::PathBuf;

    const ISS: &str = "ISS (ZARYA)
1 25544U 98067A   20194.88612269 -.00002218  00000-0 -31515-4 0  9992
2 25544  51.6461 221.2784 0001413  89.1723 280.4612 15.49507896236008";

    fn temp_file(tag: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("iss-predict-{}-{}.txt", tag, std::process::id()));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn fetches_and_throttles() {
        let path = temp_file("tle-ok", ISS);
        let mut ingestor = TleIngestor::new(
            Source::File(path.clone()),
            Some(25544),
            Duration::hours(1),
            StdDuration::from_secs(5),
        );

        let record = ingestor.fetch_if_due().await.unwrap().unwrap();
        assert_eq!(record.name, "ISS (ZARYA)");
        assert!(ingestor.fetch_if_due().await.is_none());
        assert!(ingestor.is_due(Utc::now() + Duration::hours(1)));
        std::fs::remove_file(path).unwrap();
    }

    #[tokio::test]
    async fn failure_still_counts_as_attempt() {
        let mut ingestor = TleIngestor::new(
            Source::File(PathBuf::from("/nonexistent/iss.txt")),
            None,
            Duration::hours(1),
            StdDuration::from_secs(5),
        );
        assert!(matches!(ingestor.fetch().await, Err(TleError::Source(_))));
        assert!(!ingestor.is_due(Utc::now()));
    }

    #[tokio::test]
    async fn timeout_is_an_ordinary_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/iss.txt", listener.local_addr().unwrap());
        let mut ingestor = TleIngestor::new(
            Source::Http(url),
            None,
            Duration::hours(1),
            StdDuration::from_millis(200),
        );
        assert!(matches!(
            ingestor.fetch().await,
            Err(TleError::Source(SourceError::Timeout(_)))
        ));
        assert!(!ingestor.is_due(Utc::now()));
        assert!(ingestor.is_due(Utc::now() + Duration::hours(1)));
    }

    #[tokio::test]
    async fn malformed_content_is_parse_error() {
        let path = temp_file("tle-bad", "ISS\n1 25544U\n2 25544 51.6");
        let mut ingestor = TleIngestor::new(
            Source::File(path.clone()),
            None,
            Duration::hours(1),
            StdDuration::from_secs(5),
        );
        assert!(matches!(ingestor.fetch().await, Err(TleError::TooFewFields(_))));
        std::fs::remove_file(path).unwrap();
    }
}
