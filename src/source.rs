use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("read error: {0}")]
    Io(#[from] std::io::Error),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Where a text document (TLE or polynomial model) comes from.
///
/// In YAML this is written as a single-key map (`http: <url>` or
/// `file: <path>`); fields holding a `Source` deserialize through
/// `serde_yaml::with::singleton_map`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    File(PathBuf),
    Http(String),
}

impl Source {
    /// Fetch the whole document. Both reads are bounded by `timeout`, and an
    /// elapsed deadline is reported as [`SourceError::Timeout`].
    pub async fn fetch(&self, timeout: Duration) -> Result<String, SourceError> {
        match tokio::time::timeout(timeout, self.read(timeout)).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::Timeout(timeout)),
        }
    }

    async fn read(&self, timeout: Duration) -> Result<String, SourceError> {
        match self {
            Source::File(path) => Ok(tokio::fs::read_to_string(path).await?),
            Source::Http(url) => {
                let http_error = |e: reqwest::Error| {
                    if e.is_timeout() {
                        SourceError::Timeout(timeout)
                    } else {
                        SourceError::Http(e)
                    }
                };
                let client = reqwest::Client::builder().timeout(timeout).build()?;
                let response = client
                    .get(url)
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(http_error)?;
                response.text().await.map_err(http_error)
            }
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::File(path) => write!(f, "{}", path.display()),
            Source::Http(url) => write!(f, "{}", url),
        }
    }
}
