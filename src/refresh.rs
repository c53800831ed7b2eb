use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::config::Config;
use crate::model::PolynomialModelLoader;
use crate::orbit::TleIngestor;
use crate::predict::PredictionEngine;

pub type SharedEngine = Arc<StdMutex<PredictionEngine>>;

/// Upper bound on how long the worker sleeps between due-checks.
const POLL_INTERVAL: StdDuration = StdDuration::from_secs(30);

/// Lock the engine, ignoring poisoning.
pub fn lock_engine(engine: &StdMutex<PredictionEngine>) -> MutexGuard<'_, PredictionEngine> {
    engine.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Polynomial model reload schedule.
pub struct ModelRefresh {
    loader: PolynomialModelLoader,
    interval: Duration,
    last_attempt: Option<DateTime<Utc>>,
}

impl ModelRefresh {
    pub fn new(loader: PolynomialModelLoader, interval: Duration) -> Self {
        Self {
            loader,
            interval,
            last_attempt: None,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.last_attempt
            .map(|last| now - last >= self.interval)
            .unwrap_or(true)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub tle_applied: bool,
    pub models_applied: bool,
}

/// Owns the fetchers and applies their results to a shared engine.
pub struct Refresher {
    tle: TleIngestor,
    models: Option<ModelRefresh>,
}

impl Refresher {
    pub fn new(tle: TleIngestor, models: Option<ModelRefresh>) -> Self {
        Self { tle, models }
    }

    pub fn from_config(config: &Config) -> Self {
        let tle = TleIngestor::new(
            config.tle.source.clone(),
            config.tle.norad_id,
            to_chrono(config.tle.refresh_interval),
            config.tle.timeout,
        );
        let models = config.models.as_ref().map(|m| {
            ModelRefresh::new(
                PolynomialModelLoader::new(m.latitude.clone(), m.longitude.clone(), m.timeout),
                to_chrono(m.refresh_interval),
            )
        });
        Self::new(tle, models)
    }

    /// Run every fetch that is due. The engine lock is only taken once a
    /// fetch has completed.
    pub async fn refresh_due(&mut self, engine: &StdMutex<PredictionEngine>) -> RefreshOutcome {
        let mut outcome = RefreshOutcome::default();

        if let Some(result) = self.tle.fetch_if_due().await {
            match result {
                Ok(record) => {
                    outcome.tle_applied = lock_engine(engine).apply_tle(record);
                    if !outcome.tle_applied {
                        log::info!("Discarded TLE superseded by a newer fetch");
                    }
                }
                Err(e) => log::warn!(
                    "TLE refresh from {} failed, keeping previous parameters: {}",
                    self.tle.source(),
                    e
                ),
            }
        }

        if let Some(models) = self.models.as_mut() {
            let issued_at = Utc::now();
            if models.is_due(issued_at) {
                models.last_attempt = Some(issued_at);
                match models.loader.load().await {
                    Ok(pair) => outcome.models_applied = lock_engine(engine).apply_models(pair),
                    Err(e) => {
                        log::warn!("Polynomial model load failed: {}", e);
                        lock_engine(engine).disable_models(issued_at);
                    }
                }
            }
        }

        outcome
    }
}

struct WorkerHandle {
    stop_tx: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

/// Background task keeping TLE parameters and polynomial models current.
pub struct RefreshWorker {
    worker: Option<WorkerHandle>,
}

impl RefreshWorker {
    pub fn start(engine: SharedEngine, mut refresher: Refresher) -> Self {
        let (stop_tx, mut stop_rx) = oneshot::channel();

        let join = tokio::spawn(async move {
            log::info!("Refresh worker started");
            loop {
                refresher.refresh_due(&engine).await;

                let should_stop = tokio::select! {
                    _ = sleep(POLL_INTERVAL) => false,
                    _ = &mut stop_rx => true,
                };
                if should_stop {
                    break;
                }
            }
            log::info!("Refresh worker stopped");
        });

        Self {
            worker: Some(WorkerHandle { stop_tx, join }),
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    pub async fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_tx.send(());
            let _ = worker.join.await;
        }
    }
}

fn to_chrono(d: StdDuration) -> Duration {
    Duration::from_std(d).unwrap_or_else(|_| Duration::weeks(52))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Source;
    use std::path::PathBuf;

    const ISS: &str = "ISS (ZARYA)
1 25544U 98067A   20194.88612269 -.00002218  00000-0 -31515-4 0  9992
2 25544  51.6461 221.2784 0001413  89.1723 280.4612 15.49507896236008";

    const MODEL: &str = r#"{"coefficients":[1.0, 0.0],"t0_timestamp":1705320000,"duration_minutes":90,"max_error_degrees":0.1}"#;

    fn temp_file(tag: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "iss-predict-refresh-{}-{}.txt",
            tag,
            std::process::id()
        ));
        std::fs::write(&path, content).unwrap();
        path
    }

    fn ingestor(path: PathBuf) -> TleIngestor {
        TleIngestor::new(
            Source::File(path),
            None,
            Duration::hours(1),
            StdDuration::from_secs(5),
        )
    }

    fn model_refresh(lat: PathBuf, lon: PathBuf) -> ModelRefresh {
        ModelRefresh::new(
            PolynomialModelLoader::new(Source::File(lat), Source::File(lon), StdDuration::from_secs(5)),
            Duration::zero(),
        )
    }

    #[tokio::test]
    async fn applies_tle_and_models() {
        let tle = temp_file("tle", ISS);
        let lat = temp_file("lat", MODEL);
        let lon = temp_file("lon", MODEL);
        let engine = StdMutex::new(PredictionEngine::default());
        let mut refresher = Refresher::new(ingestor(tle.clone()), Some(model_refresh(lat.clone(), lon.clone())));

        let outcome = refresher.refresh_due(&engine).await;
        assert_eq!(
            outcome,
            RefreshOutcome {
                tle_applied: true,
                models_applied: true
            }
        );
        {
            let engine = lock_engine(&engine);
            assert!(engine.has_propagator());
            assert!(engine.models().is_some());
            assert!((engine.params().period_minutes - 1440.0 / 15.49507896).abs() < 1e-9);
        }

        // TLE not due again within the hour
        let outcome = refresher.refresh_due(&engine).await;
        assert!(!outcome.tle_applied);

        for path in [tle, lat, lon] {
            std::fs::remove_file(path).unwrap();
        }
    }

    #[tokio::test]
    async fn failures_keep_defaults_and_disable_models() {
        let lat = temp_file("lat-only", MODEL);
        let engine = StdMutex::new(PredictionEngine::default());
        let missing = PathBuf::from("/nonexistent/iss.txt");
        let mut refresher = Refresher::new(
            ingestor(missing.clone()),
            Some(model_refresh(lat.clone(), lat.clone())),
        );
        refresher.refresh_due(&engine).await;
        assert!(lock_engine(&engine).models().is_some());

        refresher.models = Some(model_refresh(lat.clone(), missing));
        let outcome = refresher.refresh_due(&engine).await;
        assert_eq!(outcome, RefreshOutcome::default());

        let engine = lock_engine(&engine);
        assert!(engine.models().is_none());
        assert!(!engine.has_propagator());
        assert_eq!(engine.params().period_minutes, crate::orbit::DEFAULT_PERIOD_MINUTES);
        std::fs::remove_file(lat).unwrap();
    }

    #[tokio::test]
    async fn unresponsive_source_keeps_defaults() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/iss.txt", listener.local_addr().unwrap());
        let engine = StdMutex::new(PredictionEngine::default());
        let mut refresher = Refresher::new(
            TleIngestor::new(
                Source::Http(url),
                None,
                Duration::hours(1),
                StdDuration::from_millis(200),
            ),
            None,
        );

        let outcome = refresher.refresh_due(&engine).await;
        assert_eq!(outcome, RefreshOutcome::default());
        let engine = lock_engine(&engine);
        assert!(!engine.has_propagator());
        assert_eq!(engine.params().period_minutes, crate::orbit::DEFAULT_PERIOD_MINUTES);
    }

    #[tokio::test]
    async fn worker_loads_then_stops() {
        let tle = temp_file("worker", ISS);
        let engine: SharedEngine = Arc::new(StdMutex::new(PredictionEngine::default()));
        let mut worker = RefreshWorker::start(engine.clone(), Refresher::new(ingestor(tle.clone()), None));
        assert!(worker.is_running());

        for _ in 0..100 {
            if lock_engine(&engine).has_propagator() {
                break;
            }
            sleep(StdDuration::from_millis(20)).await;
        }
        assert!(lock_engine(&engine).has_propagator());

        tokio::time::timeout(StdDuration::from_secs(5), worker.stop())
            .await
            .unwrap();
        assert!(!worker.is_running());
        std::fs::remove_file(tle).unwrap();
    }
}
