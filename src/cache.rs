//! In-memory TTL cache for completed analysis reports
//!
//! Caching is the caller's concern, not the pipeline's: the orchestrator
//! always returns a fresh report and this layer decides whether to serve a
//! previous one. Reads flip the report's `cached` flag.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

use crate::models::AnalysisResult;

struct CachedEntry {
    result: AnalysisResult,
    expires_at: Instant,
}

/// TTL key-value cache of analysis reports keyed by fid
pub struct AnalysisCache {
    entries: DashMap<u64, CachedEntry>,
    ttl: Duration,
}

impl AnalysisCache {
    pub fn new(ttl_seconds: u64) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: Duration::from_secs(ttl_seconds),
        }
    }

    /// An unexpired cached report for this fid, marked as cached
    pub fn get(&self, fid: u64) -> Option<AnalysisResult> {
        let entry = self.entries.get(&fid)?;
        if entry.expires_at <= Instant::now() {
            drop(entry);
            self.entries.remove(&fid);
            return None;
        }

        let mut result = entry.result.clone();
        result.cached = true;
        debug!("Cache hit for fid {}", fid);
        Some(result)
    }

    /// Store a freshly computed report
    pub fn insert(&self, fid: u64, result: AnalysisResult) {
        self.entries.insert(
            fid,
            CachedEntry {
                result,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Drop a specific entry, e.g. on a forced re-analysis
    pub fn invalidate(&self, fid: u64) {
        self.entries.remove(&fid);
    }

    /// Drop all expired entries
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::sample_result;

    #[test]
    fn get_marks_result_as_cached() {
        let cache = AnalysisCache::new(60);
        cache.insert(42, sample_result(42));

        let hit = cache.get(42).unwrap();
        assert!(hit.cached);
        assert_eq!(hit.user.fid, 42);
    }

    #[test]
    fn miss_on_unknown_fid() {
        let cache = AnalysisCache::new(60);
        assert!(cache.get(7).is_none());
    }

    #[test]
    fn zero_ttl_expires_immediately() {
        let cache = AnalysisCache::new(0);
        cache.insert(42, sample_result(42));

        assert!(cache.get(42).is_none());
        // The stale read also evicted the entry
        assert!(cache.is_empty());
    }

    #[test]
    fn invalidate_drops_entry() {
        let cache = AnalysisCache::new(60);
        cache.insert(42, sample_result(42));
        cache.invalidate(42);
        assert!(cache.get(42).is_none());
    }

    #[test]
    fn purge_expired_keeps_live_entries() {
        let cache = AnalysisCache::new(60);
        cache.insert(1, sample_result(1));
        cache.insert(2, sample_result(2));
        cache.purge_expired();
        assert_eq!(cache.len(), 2);
    }
}
