//! Memoization side-table for repeated identical aggregations
//!
//! Optional and explicit: callers own the cache instance and decide when
//! to consult it; there is no ambient module state. Entries are keyed by
//! a canonical hash of the request and expire after a fixed TTL.

use crate::query::aggregation::{AggregationRequest, AggregationResult};
use ahash::AHashMap;
use std::hash::{BuildHasher, Hasher};
use std::time::{Duration, Instant};

struct CacheEntry {
    result: AggregationResult,
    inserted_at: Instant,
}

pub struct QueryCache {
    entries: AHashMap<u64, CacheEntry>,
    ttl: Duration,
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: AHashMap::new(),
            ttl,
        }
    }

    /// Canonical key: fixed-seed hash over the request's canonical JSON,
    /// so equal requests collide across processes and restarts.
    pub fn key(request: &AggregationRequest) -> u64 {
        let canonical = serde_json::to_string(request).unwrap_or_default();
        let mut hasher = ahash::RandomState::with_seeds(
            0x243f_6a88_85a3_08d3,
            0x1319_8a2e_0370_7344,
            0xa409_3822_299f_31d0,
            0x082e_fa98_ec4e_6c89,
        )
        .build_hasher();
        hasher.write(canonical.as_bytes());
        hasher.finish()
    }

    pub fn get(&mut self, request: &AggregationRequest) -> Option<AggregationResult> {
        self.get_at(request, Instant::now())
    }

    pub fn insert(&mut self, request: &AggregationRequest, result: AggregationResult) {
        self.insert_at(request, result, Instant::now());
    }

    /// Fetch the result for `request` or compute and cache it.
    pub fn get_or_compute<E>(
        &mut self,
        request: &AggregationRequest,
        compute: impl FnOnce() -> std::result::Result<AggregationResult, E>,
    ) -> std::result::Result<AggregationResult, E> {
        if let Some(hit) = self.get(request) {
            tracing::debug!("aggregation cache hit");
            return Ok(hit);
        }
        let result = compute()?;
        self.insert(request, result.clone());
        Ok(result)
    }

    /// Drop every expired entry.
    pub fn purge_expired(&mut self) {
        let now = Instant::now();
        let ttl = self.ttl;
        self.entries
            .retain(|_, e| now.duration_since(e.inserted_at) < ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn get_at(&mut self, request: &AggregationRequest, now: Instant) -> Option<AggregationResult> {
        let key = Self::key(request);
        match self.entries.get(&key) {
            Some(entry) if now.duration_since(entry.inserted_at) < self.ttl => {
                Some(entry.result.clone())
            }
            Some(_) => {
                self.entries.remove(&key);
                None
            }
            None => None,
        }
    }

    fn insert_at(&mut self, request: &AggregationRequest, result: AggregationResult, now: Instant) {
        self.entries.insert(
            Self::key(request),
            CacheEntry {
                result,
                inserted_at: now,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::MetricField;
    use crate::dataset::store::sample_merchants;
    use crate::query::aggregation::{AggregateOp, AggregationExecutor};
    use crate::query::filter::GroupKey;

    fn request() -> AggregationRequest {
        AggregationRequest {
            operation: AggregateOp::Avg,
            field: Some(MetricField::HealthScore),
            group_by: Some(GroupKey::RiskLevel),
            ..Default::default()
        }
    }

    #[test]
    fn test_key_is_stable_for_equal_requests() {
        assert_eq!(QueryCache::key(&request()), QueryCache::key(&request()));
    }

    #[test]
    fn test_key_differs_for_different_requests() {
        let mut other = request();
        other.group_by = Some(GroupKey::Floor);
        assert_ne!(QueryCache::key(&request()), QueryCache::key(&other));
    }

    #[test]
    fn test_hit_within_ttl() {
        let merchants = sample_merchants();
        let result = AggregationExecutor::default()
            .execute(&request(), &merchants)
            .unwrap();

        let mut cache = QueryCache::new(Duration::from_secs(60));
        cache.insert(&request(), result.clone());
        let hit = cache.get(&request()).unwrap();
        assert_eq!(hit.total, result.total);
    }

    #[test]
    fn test_expired_entry_is_dropped() {
        let merchants = sample_merchants();
        let result = AggregationExecutor::default()
            .execute(&request(), &merchants)
            .unwrap();

        let mut cache = QueryCache::new(Duration::from_secs(60));
        let t0 = Instant::now();
        cache.insert_at(&request(), result, t0);

        let later = t0 + Duration::from_secs(120);
        assert!(cache.get_at(&request(), later).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_get_or_compute_runs_once() {
        let merchants = sample_merchants();
        let executor = AggregationExecutor::default();
        let mut cache = QueryCache::new(Duration::from_secs(60));
        let mut computed = 0;

        for _ in 0..3 {
            let req = request();
            cache
                .get_or_compute(&req, || {
                    computed += 1;
                    executor.execute(&req, &merchants)
                })
                .unwrap();
        }
        assert_eq!(computed, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_purge_expired() {
        let merchants = sample_merchants();
        let result = AggregationExecutor::default()
            .execute(&request(), &merchants)
            .unwrap();

        let mut cache = QueryCache::new(Duration::from_nanos(1));
        cache.insert(&request(), result);
        std::thread::sleep(Duration::from_millis(1));
        cache.purge_expired();
        assert!(cache.is_empty());
    }
}
