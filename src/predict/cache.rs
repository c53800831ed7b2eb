use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use super::types::Prediction;

pub const DEFAULT_TTL_MINUTES: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    source_timestamp: DateTime<Utc>,
    minutes_ahead_ms: i64,
}

impl CacheKey {
    pub fn new(source_timestamp: DateTime<Utc>, minutes_ahead: f64) -> Self {
        Self {
            source_timestamp,
            minutes_ahead_ms: (minutes_ahead * 60_000.0).round() as i64,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    prediction: Prediction,
    inserted_at: DateTime<Utc>,
}

/// TTL cache of single predictions, tied to an input revision.
#[derive(Debug)]
pub struct PredictionCache {
    ttl: Duration,
    revision: u64,
    entries: HashMap<CacheKey, CacheEntry>,
}

impl PredictionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            revision: 0,
            entries: HashMap::new(),
        }
    }

    /// Drop everything when the inputs the entries were derived from changed.
    pub fn sync_revision(&mut self, revision: u64) -> bool {
        if revision == self.revision {
            return false;
        }
        if !self.entries.is_empty() {
            log::debug!(
                "Input revision {} -> {}, clearing {} cached predictions",
                self.revision,
                revision,
                self.entries.len()
            );
        }
        self.entries.clear();
        self.revision = revision;
        true
    }

    pub fn get(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<Prediction> {
        self.entries
            .get(key)
            .filter(|entry| now - entry.inserted_at < self.ttl)
            .map(|entry| entry.prediction)
    }

    pub fn insert(&mut self, prediction: Prediction, now: DateTime<Utc>) {
        let ttl = self.ttl;
        self.entries.retain(|_, entry| now - entry.inserted_at < ttl);
        let key = CacheKey::new(prediction.source_timestamp, prediction.minutes_ahead);
        self.entries.insert(
            key,
            CacheEntry {
                prediction,
                inserted_at: now,
            },
        );
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for PredictionCache {
    fn default() -> Self {
        Self::new(Duration::minutes(DEFAULT_TTL_MINUTES))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::types::Method;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 15, 0, 0).unwrap()
    }

    fn prediction(minutes: f64) -> Prediction {
        Prediction {
            timestamp: t0(),
            latitude: 1.0,
            longitude: 2.0,
            confidence: 0.5,
            minutes_ahead: minutes,
            method: Method::Orbital,
            source_timestamp: t0(),
        }
    }

    #[test]
    fn serves_until_ttl() {
        let mut cache = PredictionCache::default();
        cache.insert(prediction(5.0), t0());
        let key = CacheKey::new(t0(), 5.0);

        assert_eq!(cache.get(&key, t0() + Duration::minutes(4)), Some(prediction(5.0)));
        assert_eq!(cache.get(&key, t0() + Duration::minutes(5)), None);
        assert_eq!(cache.get(&CacheKey::new(t0(), 10.0), t0()), None);
    }

    #[test]
    fn insert_purges_expired() {
        let mut cache = PredictionCache::default();
        cache.insert(prediction(5.0), t0());
        cache.insert(prediction(10.0), t0() + Duration::minutes(6));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn revision_change_clears() {
        let mut cache = PredictionCache::default();
        cache.insert(prediction(5.0), t0());
        assert!(!cache.sync_revision(0));
        assert_eq!(cache.len(), 1);
        assert!(cache.sync_revision(1));
        assert!(cache.is_empty());
    }
}
