use chrono::Duration;
use serde::Serialize;

use crate::geo::great_circle_km;
use crate::predict::{
    target_time, BlendCurve, EngineSettings, LocationSample, Method, PredictionEngine, Tuning,
};

/// Parameter grid explored by [`run_sweep`].
#[derive(Debug, Clone)]
pub struct SweepGrid {
    pub curves: Vec<BlendCurve>,
    pub blend_starts: Vec<f64>,
    pub blend_ends: Vec<f64>,
    pub horizons: Vec<f64>,
    /// Largest gap between a target time and the observation scored against it.
    pub tolerance_minutes: f64,
}

impl Default for SweepGrid {
    fn default() -> Self {
        Self {
            curves: BlendCurve::ALL.to_vec(),
            blend_starts: vec![5.0, 10.0, 15.0, 20.0],
            blend_ends: vec![30.0, 45.0, 60.0],
            horizons: vec![5.0, 10.0, 15.0, 20.0, 30.0, 45.0, 60.0],
            tolerance_minutes: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepResult {
    pub blend_curve: BlendCurve,
    pub blend_start_minutes: f64,
    pub blend_end_minutes: f64,
    pub mean_error_km: f64,
    pub evaluated: usize,
}

/// Backtest every grid combination of the blended path against `history`,
/// best (lowest mean great-circle error) first. Orbit defaults, period bounds
/// and the remaining tuning come from `settings`.
pub fn run_sweep(
    history: &[LocationSample],
    settings: &EngineSettings,
    grid: &SweepGrid,
) -> Vec<SweepResult> {
    let mut samples: Vec<LocationSample> =
        history.iter().filter(|s| s.is_valid()).copied().collect();
    samples.sort_by_key(|s| s.timestamp);

    let mut results = Vec::new();
    for &curve in &grid.curves {
        for &start in &grid.blend_starts {
            for &end in grid.blend_ends.iter().filter(|&&end| end > start) {
                let tuning = Tuning {
                    blend_curve: curve,
                    blend_start_minutes: start,
                    blend_end_minutes: end,
                    ..settings.tuning.clone()
                };
                if let Some(result) = evaluate(&samples, settings, tuning, grid) {
                    results.push(result);
                }
            }
        }
    }

    results.sort_by(|a, b| a.mean_error_km.total_cmp(&b.mean_error_km));
    if let Some(best) = results.first() {
        log::info!(
            "Best of {} combinations: {} {}..{} min, mean error {:.1} km over {} predictions",
            results.len(),
            best.blend_curve,
            best.blend_start_minutes,
            best.blend_end_minutes,
            best.mean_error_km,
            best.evaluated
        );
    }
    results
}

/// `samples` ascending by time.
fn evaluate(
    samples: &[LocationSample],
    settings: &EngineSettings,
    tuning: Tuning,
    grid: &SweepGrid,
) -> Option<SweepResult> {
    let (curve, start, end) = (
        tuning.blend_curve,
        tuning.blend_start_minutes,
        tuning.blend_end_minutes,
    );
    let window = tuning.velocity_window;
    let mut engine = PredictionEngine::new(EngineSettings {
        tuning,
        strategies: vec![Method::Blended],
        cache_ttl: Duration::zero(),
        ..settings.clone()
    });

    let mut total_km = 0.0;
    let mut evaluated = 0;
    for (i, current) in samples.iter().enumerate() {
        let prior: Vec<LocationSample> = samples[..i].iter().rev().take(window).copied().collect();
        for &minutes in &grid.horizons {
            let Some(observed) = target_time(current.timestamp, minutes)
                .and_then(|at| observation_near(samples, at, grid.tolerance_minutes))
            else {
                continue;
            };
            let Ok(Some(prediction)) = engine.predict(current, minutes, &prior) else {
                continue;
            };
            total_km += great_circle_km(
                prediction.latitude,
                prediction.longitude,
                observed.latitude,
                observed.longitude,
            );
            evaluated += 1;
        }
    }

    (evaluated > 0).then(|| SweepResult {
        blend_curve: curve,
        blend_start_minutes: start,
        blend_end_minutes: end,
        mean_error_km: total_km / evaluated as f64,
        evaluated,
    })
}

/// Observation closest to `at`, if one lies within `tolerance_minutes`.
fn observation_near(
    samples: &[LocationSample],
    at: chrono::DateTime<chrono::Utc>,
    tolerance_minutes: f64,
) -> Option<&LocationSample> {
    let idx = samples.partition_point(|s| s.timestamp < at);
    let candidates = [idx.checked_sub(1), Some(idx)];
    candidates
        .into_iter()
        .flatten()
        .filter_map(|i| samples.get(i))
        .map(|s| (s, (s.timestamp - at).num_milliseconds().abs() as f64 / 60_000.0))
        .filter(|(_, gap)| *gap <= tolerance_minutes)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(s, _)| s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orbit::{OrbitalParameters, PeriodBounds};
    use crate::predict::orbital_position;
    use chrono::{DateTime, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 15, 0, 0).unwrap()
    }

    /// Ground track sampled every five minutes, newest first.
    fn track(points: i64) -> Vec<LocationSample> {
        let params = OrbitalParameters::default();
        let origin = LocationSample::new(t0(), 0.0, 0.0);
        let mut samples: Vec<LocationSample> = (0..points)
            .map(|i| {
                let minutes = (i * 5) as f64;
                let (lat, lon) = orbital_position(&origin, minutes, &params, true);
                LocationSample::new(t0() + Duration::minutes(i * 5), lat, lon)
            })
            .collect();
        samples.reverse();
        samples
    }

    #[test]
    fn results_sorted_best_first() {
        let grid = SweepGrid {
            horizons: vec![5.0, 15.0, 30.0],
            ..SweepGrid::default()
        };
        let results = run_sweep(&track(30), &EngineSettings::default(), &grid);

        // every start is below every end in the default grid
        assert_eq!(results.len(), 3 * 4 * 3);
        assert!(results
            .windows(2)
            .all(|w| w[0].mean_error_km <= w[1].mean_error_km));
        assert!(results.iter().all(|r| r.evaluated > 0 && r.mean_error_km.is_finite()));
    }

    #[test]
    fn skips_empty_windows_and_history() {
        let grid = SweepGrid {
            curves: vec![BlendCurve::Linear],
            blend_starts: vec![30.0],
            blend_ends: vec![30.0, 45.0],
            ..SweepGrid::default()
        };
        let results = run_sweep(&track(20), &EngineSettings::default(), &grid);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].blend_end_minutes, 45.0);

        assert!(run_sweep(&[], &EngineSettings::default(), &grid).is_empty());
    }

    #[test]
    fn configured_period_bounds_apply() {
        let grid = SweepGrid {
            curves: vec![BlendCurve::Linear],
            blend_starts: vec![10.0],
            blend_ends: vec![30.0],
            horizons: vec![45.0, 60.0],
            ..SweepGrid::default()
        };
        let slow = OrbitalParameters::new(99.0, OrbitalParameters::default().inclination_degrees);
        // default bounds pull 99 min back near the true period
        let clamped = EngineSettings {
            defaults: slow,
            ..EngineSettings::default()
        };
        let wide = EngineSettings {
            defaults: slow,
            period_bounds: PeriodBounds { min: 80.0, max: 120.0 },
            ..EngineSettings::default()
        };

        let clamped = run_sweep(&track(30), &clamped, &grid);
        let wide = run_sweep(&track(30), &wide, &grid);
        assert!(wide[0].mean_error_km > clamped[0].mean_error_km);
    }

    #[test]
    fn nearest_observation_within_tolerance() {
        let mut samples = track(4);
        samples.reverse();
        let at = t0() + Duration::seconds(5 * 60 + 20);
        assert_eq!(observation_near(&samples, at, 1.0).unwrap().timestamp, t0() + Duration::minutes(5));
        let between = t0() + Duration::seconds(150);
        assert!(observation_near(&samples, between, 1.0).is_none());
    }
}
