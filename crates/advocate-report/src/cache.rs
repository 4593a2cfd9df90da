//! Report payload caching, keyed by report identity.
//!
//! ## Expiry
//!
//! Every entry expires `retention` after it was stored. A lookup past that
//! instant is a miss and evicts the entry. A retention too large to add to
//! the clock never expires. Storing an identity again replaces
//! its entry outright.
//!
//! ## LRU eviction
//!
//! With a `max_entries` bound, inserting a new identity into a full cache
//! first drops expired entries, and only if none were expired the
//! least-recently-accessed one.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::types::ReportId;

/// Cache entry with metadata.
#[derive(Debug, Clone)]
struct CacheEntry {
    payload: Arc<str>,
    /// `None` when the retention reaches past the clock's range.
    expires_at: Option<Instant>,
    /// When the entry was last accessed (for LRU).
    last_accessed: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// In-memory, time-bounded cache of raw report payloads.
///
/// Safe to share between concurrent retrievals; each entry is inserted and
/// replaced as a whole, so readers never see a partial entry.
#[derive(Debug)]
pub struct ReportCache {
    entries: DashMap<ReportId, CacheEntry>,
    retention: Duration,
    max_entries: Option<usize>,
}

impl ReportCache {
    /// Create a cache whose entries live for `retention`.
    pub fn new(retention: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            retention,
            max_entries: None,
        }
    }

    /// Bound the number of cached reports.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries.max(1));
        self
    }

    /// Cached payload for `id` if present and unexpired.
    pub fn get(&self, id: &ReportId) -> Option<Arc<str>> {
        let now = Instant::now();
        if let Some(mut entry) = self.entries.get_mut(id) {
            if !entry.is_expired(now) {
                entry.last_accessed = now;
                return Some(Arc::clone(&entry.payload));
            }
        } else {
            return None;
        }

        // Expired: the guard above is released before removing.
        self.entries.remove_if(id, |_, entry| entry.is_expired(now));
        tracing::debug!(report_id = %id, "cache entry expired");
        None
    }

    /// Store `payload` for `id`, replacing any previous entry.
    pub fn put(&self, id: &ReportId, payload: impl Into<Arc<str>>) -> Arc<str> {
        if let Some(max) = self.max_entries {
            if self.entries.len() >= max && !self.entries.contains_key(id) {
                self.evict_lru();
            }
        }

        let now = Instant::now();
        let payload = payload.into();
        self.entries.insert(
            id.clone(),
            CacheEntry {
                payload: Arc::clone(&payload),
                expires_at: now.checked_add(self.retention),
                last_accessed: now,
            },
        );
        payload
    }

    /// Remove the entry for `id`.
    pub fn invalidate(&self, id: &ReportId) {
        self.entries.remove(id);
    }

    /// Remove all expired entries.
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| !entry.is_expired(now));
    }

    /// Evict the least-recently-used cache entry.
    fn evict_lru(&self) {
        let before = self.entries.len();
        self.cleanup_expired();
        if self.entries.len() < before {
            return;
        }

        let lru = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().last_accessed)
            .map(|entry| entry.key().clone());

        if let Some(id) = lru {
            tracing::info!(report_id = %id, "evicting LRU cache entry");
            self.entries.remove(&id);
        }
    }

    /// Number of cached reports (including expired).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }
}
