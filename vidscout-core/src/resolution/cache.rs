//! Resolution caching with separate lifetimes for hits and misses
//!
//! Memoizes resolution results per content reference so identical requests
//! within a short window do not re-probe every mirror. Backed by a sharded
//! concurrent map: operations on different keys never contend on one lock,
//! and no lock is ever held across a network wait.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tokio::time::Instant;

use super::engine::ResolutionResult;
use crate::config::CacheConfig;
use crate::content::{ContentRef, MediaKind};

/// Cache key for one resolvable title
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub content_id: String,
    pub kind: MediaKind,
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

impl From<&ContentRef> for CacheKey {
    fn from(content: &ContentRef) -> Self {
        Self {
            content_id: content.content_id().to_string(),
            kind: content.kind(),
            season: content.season(),
            episode: content.episode(),
        }
    }
}

/// Cached entry with metadata
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub result: ResolutionResult,
    pub inserted_at: Instant,
    pub expires_at: Instant,
}

impl CacheEntry {
    fn new(result: ResolutionResult, ttl: Duration) -> Self {
        let now = Instant::now();
        Self {
            result,
            inserted_at: now,
            expires_at: now + ttl,
        }
    }

    /// Whether the entry is past its expiry at `now`
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now > self.expires_at
    }

    /// Get age of entry
    pub fn age(&self) -> Duration {
        self.inserted_at.elapsed()
    }
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatistics {
    pub entries: usize,
    pub capacity: usize,
    pub hit_count: u64,
    pub miss_count: u64,
    pub eviction_count: u64,
    pub hit_rate: f64,
}

impl CacheStatistics {
    /// Calculate hit rate as a fraction of all lookups
    pub fn calculate_hit_rate(hit_count: u64, miss_count: u64) -> f64 {
        if hit_count + miss_count == 0 {
            0.0
        } else {
            (hit_count as f64) / ((hit_count + miss_count) as f64)
        }
    }
}

/// Concurrent TTL cache of resolution results
#[derive(Clone)]
pub struct ResolutionCache {
    entries: Arc<DashMap<CacheKey, CacheEntry>>,
    max_entries: usize,
    hit_count: Arc<AtomicU64>,
    miss_count: Arc<AtomicU64>,
    eviction_count: Arc<AtomicU64>,
}

impl ResolutionCache {
    /// Create new cache holding at most `max_entries` results
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            max_entries: max_entries.max(1),
            hit_count: Arc::new(AtomicU64::new(0)),
            miss_count: Arc::new(AtomicU64::new(0)),
            eviction_count: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_entries)
    }

    /// Get a live result for `key`.
    ///
    /// An expired entry for `key` is removed on the way out; nothing else is
    /// touched.
    pub fn get(&self, key: &CacheKey) -> Option<ResolutionResult> {
        let now = Instant::now();

        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired_at(now) {
                self.hit_count.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(content_id = %key.content_id, kind = %key.kind, "Resolution cache hit");
                return Some(entry.result.clone());
            }
        }

        // Re-check under the shard lock so a fresh concurrent write survives.
        if self
            .entries
            .remove_if(key, |_, entry| entry.is_expired_at(now))
            .is_some()
        {
            self.eviction_count.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(content_id = %key.content_id, "Expired resolution evicted");
        }

        self.miss_count.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store `result` for `key` for `ttl`. Last write wins.
    pub fn put(&self, key: CacheKey, result: ResolutionResult, ttl: Duration) {
        self.entries.insert(key, CacheEntry::new(result, ttl));

        if self.entries.len() > self.max_entries {
            self.evict_to_capacity();
        }
    }

    /// Remove the entry for `key`, if any.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));
        let removed = before.saturating_sub(self.entries.len());
        self.eviction_count
            .fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn statistics(&self) -> CacheStatistics {
        let hit_count = self.hit_count.load(Ordering::Relaxed);
        let miss_count = self.miss_count.load(Ordering::Relaxed);

        CacheStatistics {
            entries: self.entries.len(),
            capacity: self.max_entries,
            hit_count,
            miss_count,
            eviction_count: self.eviction_count.load(Ordering::Relaxed),
            hit_rate: CacheStatistics::calculate_hit_rate(hit_count, miss_count),
        }
    }

    /// Evict earliest-expiring entries until within capacity.
    fn evict_to_capacity(&self) {
        while self.entries.len() > self.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.expires_at)
                .map(|entry| (entry.key().clone(), entry.expires_at));

            let Some((key, expires_at)) = oldest else {
                break;
            };

            // Skip if the entry was rewritten since the scan.
            if self
                .entries
                .remove_if(&key, |_, entry| entry.expires_at == expires_at)
                .is_some()
            {
                self.eviction_count.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(content_id = %key.content_id, "Resolution evicted for capacity");
            }
        }
    }
}

impl Default for ResolutionCache {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}
