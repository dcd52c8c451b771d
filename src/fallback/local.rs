//! Device-local fallback cache
//!
//! In-memory storage for previously-seen campaign records with TTL support.
//! Holds the best-effort list consulted when the chain does not (yet)
//! recognize an identifier.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::types::{CampaignKey, FallbackRecord};

/// Default record lifetime, matching the five-minute freshness window used by
/// the presentation layer's cache.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Stored record with expiry
#[derive(Debug, Clone)]
struct CacheEntry {
    record: FallbackRecord,
    /// When this entry expires (absolute time)
    expires_at: Instant,
}

/// Local campaign cache with concurrent access
pub struct LocalCampaignCache {
    /// Record storage: canonical identifier -> entry
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl LocalCampaignCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Store a record wholesale, returning its canonical key
    pub fn put(&self, record: FallbackRecord) -> String {
        let key = record.id.canonical();
        let entry = CacheEntry {
            record,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.insert(key.clone(), entry);
        key
    }

    /// Look up a record by key, matching either identifier shape
    pub fn get(&self, key: &CampaignKey) -> Option<FallbackRecord> {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.record.clone())
            .find(|record| key.matches_record(record))
    }

    /// All unexpired records
    pub fn all(&self) -> Vec<FallbackRecord> {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.record.clone())
            .collect()
    }

    /// Cleanup expired entries
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before - self.entries.len()
    }

    /// Get stats about the cache
    pub fn stats(&self) -> LocalCacheStats {
        LocalCacheStats {
            total_records: self.entries.len(),
        }
    }
}

impl Default for LocalCampaignCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

/// Statistics about the local cache
#[derive(Debug, Clone)]
pub struct LocalCacheStats {
    pub total_records: usize,
}

/// Spawn a background task to periodically cleanup expired entries
pub fn spawn_cleanup_task(cache: Arc<LocalCampaignCache>) {
    tokio::spawn(async move {
        let interval = Duration::from_secs(60);
        loop {
            tokio::time::sleep(interval).await;
            let removed = cache.cleanup();
            if removed > 0 {
                debug!("Local cache cleanup: removed {} expired records", removed);
            }
        }
    });
    info!("Local cache cleanup task started");
}
