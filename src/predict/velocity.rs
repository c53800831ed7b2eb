use super::tuning::Tuning;
use super::types::{minutes_between, LocationSample, VelocityVector};
use crate::geo::longitude_delta;

/// Cosine floor for the longitude scale, keeps polar pairs from blowing up.
const MIN_COS_LATITUDE: f64 = 0.1;
const MIN_INTERVAL_WEIGHT: f64 = 0.05;
/// Pairwise spread, in (deg/min)^2, at which the variance score halves.
const VARIANCE_SCALE: f64 = 0.01;
const VARIANCE_SHARE: f64 = 0.6;
/// Points needed for full sample-count credit.
const FULL_CREDIT_POINTS: usize = 3;
/// Beyond this multiple of the plausible bound a result is discarded
/// outright instead of downgraded.
const REJECT_FACTOR: f64 = 2.0;

struct PairVelocity {
    lat: f64,
    lon_scaled: f64,
    scale: f64,
    weight: f64,
}

/// Estimate a velocity from newest-first samples.
pub fn estimate_velocity(history: &[LocationSample], tuning: &Tuning) -> Option<VelocityVector> {
    let window = &history[..history.len().min(tuning.velocity_window.max(2))];
    if window.len() < 2 {
        return None;
    }

    let pairs: Vec<PairVelocity> = window
        .windows(2)
        .enumerate()
        .filter_map(|(i, pair)| pair_velocity(i, &pair[0], &pair[1], tuning))
        .collect();
    if pairs.is_empty() {
        return None;
    }

    let total: f64 = pairs.iter().map(|p| p.weight).sum();
    let lat_mean = pairs.iter().map(|p| p.weight * p.lat).sum::<f64>() / total;
    let lon_scaled_mean = pairs.iter().map(|p| p.weight * p.lon_scaled).sum::<f64>() / total;
    let scale_mean = pairs.iter().map(|p| p.weight * p.scale).sum::<f64>() / total;
    let lon_mean = lon_scaled_mean / scale_mean;

    let variance = pairs
        .iter()
        .map(|p| {
            let dlat = p.lat - lat_mean;
            let dlon = p.lon_scaled / p.scale - lon_mean;
            p.weight * (dlat * dlat + dlon * dlon)
        })
        .sum::<f64>()
        / total;

    let points = pairs.len() + 1;
    let variance_score = 1.0 / (1.0 + variance / VARIANCE_SCALE);
    let count_score =
        ((points - 1) as f64 / (FULL_CREDIT_POINTS - 1) as f64).min(1.0);
    let mut quality = VARIANCE_SHARE * variance_score + (1.0 - VARIANCE_SHARE) * count_score;

    let lat_excess = lat_mean.abs() / tuning.max_lat_velocity;
    let lon_excess = lon_mean.abs() / tuning.max_lon_velocity;
    if lat_excess > REJECT_FACTOR || lon_excess > REJECT_FACTOR {
        log::debug!(
            "Rejecting implausible velocity lat={:.3} lon={:.3} deg/min",
            lat_mean,
            lon_mean
        );
        return None;
    }
    if lat_excess > 1.0 || lon_excess > 1.0 {
        quality *= 0.5;
    }

    if !(lat_mean.is_finite() && lon_mean.is_finite() && quality.is_finite()) {
        return None;
    }

    Some(VelocityVector {
        lat_velocity_deg_per_min: lat_mean,
        lon_velocity_deg_per_min: lon_mean,
        quality_score: quality.clamp(0.0, 1.0),
        sample_count: points,
    })
}

fn pair_velocity(
    index: usize,
    newer: &LocationSample,
    older: &LocationSample,
    tuning: &Tuning,
) -> Option<PairVelocity> {
    let dt = minutes_between(older.timestamp, newer.timestamp);
    if dt <= 0.0 {
        return None;
    }

    let lat = (newer.latitude - older.latitude) / dt;
    let lon = longitude_delta(older.longitude, newer.longitude) / dt;
    let mean_lat = (newer.latitude + older.latitude) / 2.0;
    let scale = 1.0 / mean_lat.to_radians().cos().max(MIN_COS_LATITUDE);

    let recency = (-tuning.recency_decay * index as f64).exp();
    let weight = recency * interval_weight(dt, tuning.preferred_interval_minutes);

    Some(PairVelocity {
        lat,
        lon_scaled: lon * scale,
        scale,
        weight,
    })
}

/// Rises toward 1 as the interval approaches the preferred length, decays
/// for longer gaps.
fn interval_weight(dt: f64, preferred: f64) -> f64 {
    let w = if dt <= preferred {
        dt / preferred
    } else {
        (-(dt - preferred) / preferred).exp()
    };
    w.max(MIN_INTERVAL_WEIGHT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 15, 0, 0).unwrap()
    }

    fn at(minutes_before: i64, lat: f64, lon: f64) -> LocationSample {
        LocationSample::new(t0() - Duration::minutes(minutes_before), lat, lon)
    }

    #[test]
    fn needs_two_samples() {
        assert!(estimate_velocity(&[], &Tuning::default()).is_none());
        assert!(estimate_velocity(&[at(0, 1.0, 1.0)], &Tuning::default()).is_none());
    }

    #[test]
    fn constant_motion_recovered_exactly() {
        let history = [
            at(0, 45.123, -122.678),
            at(5, 42.623, -142.678),
            at(10, 40.123, -162.678),
        ];
        let v = estimate_velocity(&history, &Tuning::default()).unwrap();
        assert!((v.lat_velocity_deg_per_min - 0.5).abs() < 1e-9);
        assert!((v.lon_velocity_deg_per_min - 4.0).abs() < 1e-9);
        assert_eq!(v.sample_count, 3);
        assert!(v.quality_score > 0.99);
    }

    #[test]
    fn steady_rate_at_changing_latitude_is_not_spread() {
        // each pair sits at a different latitude, so a different cos scale
        let history = [
            at(0, 60.0, 40.0),
            at(5, 50.0, 20.0),
            at(10, 40.0, 0.0),
            at(15, 30.0, -20.0),
        ];
        let v = estimate_velocity(&history, &Tuning::default()).unwrap();
        assert!((v.lon_velocity_deg_per_min - 4.0).abs() < 1e-9);
        assert!(v.quality_score > 0.99);
    }

    #[test]
    fn folds_antimeridian_crossing() {
        let history = [at(0, 0.0, -178.0), at(1, 0.0, 178.0)];
        let v = estimate_velocity(&history, &Tuning::default()).unwrap();
        assert!((v.lon_velocity_deg_per_min - 4.0).abs() < 1e-9);
    }

    #[test]
    fn two_points_get_partial_count_credit() {
        let history = [at(0, 1.0, 1.0), at(5, 0.0, 0.0)];
        let v = estimate_velocity(&history, &Tuning::default()).unwrap();
        assert!((v.quality_score - 0.8).abs() < 1e-9);
        assert_eq!(v.sample_count, 2);
    }

    #[test]
    fn noisy_history_lowers_quality() {
        let smooth = [at(0, 3.0, 12.0), at(1, 2.5, 8.0), at(2, 2.0, 4.0), at(3, 1.5, 0.0)];
        let noisy = [at(0, 3.0, 12.0), at(1, 2.0, 9.0), at(2, 2.2, 3.0), at(3, 1.0, 0.5)];
        let tuning = Tuning::default();
        let a = estimate_velocity(&smooth, &tuning).unwrap();
        let b = estimate_velocity(&noisy, &tuning).unwrap();
        assert!(a.quality_score > b.quality_score);
    }

    #[test]
    fn implausible_speed_is_downgraded_then_rejected() {
        let tuning = Tuning::default();
        // 6 deg/min longitude: above 4.5, below twice that
        let fast = [at(0, 0.0, 6.0), at(1, 0.0, 0.0)];
        let v = estimate_velocity(&fast, &tuning).unwrap();
        assert!((v.quality_score - 0.4).abs() < 1e-9);

        let absurd = [at(0, 0.0, 20.0), at(1, 0.0, 0.0)];
        assert!(estimate_velocity(&absurd, &tuning).is_none());
    }

    #[test]
    fn skips_out_of_order_pairs() {
        let history = [at(5, 0.0, 0.0), at(0, 1.0, 1.0)];
        assert!(estimate_velocity(&history, &Tuning::default()).is_none());
    }

    #[test]
    fn only_window_is_used() {
        let mut history: Vec<_> = (0..5).map(|i| at(i, 10.0 - i as f64 * 0.5, 0.0)).collect();
        // outside the five-sample window, would skew the estimate
        history.push(at(5, -80.0, 0.0));
        let v = estimate_velocity(&history, &Tuning::default()).unwrap();
        assert!((v.lat_velocity_deg_per_min - 0.5).abs() < 1e-9);
        assert_eq!(v.sample_count, 5);
    }

    #[test]
    fn interval_weight_prefers_ten_minutes() {
        assert!(interval_weight(10.0, 10.0) > interval_weight(2.0, 10.0));
        assert!(interval_weight(10.0, 10.0) > interval_weight(30.0, 10.0));
        assert_eq!(interval_weight(500.0, 10.0), MIN_INTERVAL_WEIGHT);
    }
}
