//! Fallback store
//!
//! Merges the off-chain document collection with the device-local record list
//! into one best-effort view, de-duplicated by identifier with document-store
//! precedence. Records are read and written wholesale; partial merging is the
//! reconciler's job, not the store's.

pub mod local;

pub use local::{spawn_cleanup_task, LocalCampaignCache};

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::types::{CampaignKey, FallbackRecord, Result};

/// Off-chain document collection holding previously-seen campaign records.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list(&self) -> Result<Vec<FallbackRecord>>;

    /// Store a record wholesale, replacing any record under the same
    /// identifier.
    async fn upsert(&self, record: &FallbackRecord) -> Result<()>;
}

/// Combined fallback source: document store over local cache.
pub struct FallbackStore {
    documents: Option<Arc<dyn DocumentStore>>,
    local: Arc<LocalCampaignCache>,
}

impl FallbackStore {
    pub fn new(documents: Option<Arc<dyn DocumentStore>>, local: Arc<LocalCampaignCache>) -> Self {
        Self { documents, local }
    }

    /// Local-only store, used when no document store is configured.
    pub fn local_only(local: Arc<LocalCampaignCache>) -> Self {
        Self::new(None, local)
    }

    /// All known fallback records, document-store entries first and winning on
    /// identifier collision. Document-store failure degrades to local-only.
    pub async fn load_all(&self) -> Vec<FallbackRecord> {
        let mut merged = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        if let Some(documents) = &self.documents {
            match documents.list().await {
                Ok(records) => {
                    for record in records {
                        seen.insert(record.id.canonical());
                        if let Some(onchain) = &record.onchain_id {
                            seen.insert(onchain.canonical());
                        }
                        merged.push(record);
                    }
                }
                Err(e) => {
                    warn!(error = %e, "document store unavailable, serving local records only");
                }
            }
        }

        for record in self.local.all() {
            let collides = seen.contains(&record.id.canonical())
                || record
                    .onchain_id
                    .as_ref()
                    .map(|id| seen.contains(&id.canonical()))
                    .unwrap_or(false);
            if !collides {
                merged.push(record);
            }
        }

        merged
    }

    /// Best-effort record for one identifier, or absent.
    pub async fn load(&self, key: &CampaignKey) -> Option<FallbackRecord> {
        let record = self
            .load_all()
            .await
            .into_iter()
            .find(|record| key.matches_record(record));
        if record.is_some() {
            debug!(campaign = %key, "fallback record found");
        }
        record
    }

    /// Persist a record wholesale to both sides.
    pub async fn save(&self, record: FallbackRecord) -> Result<()> {
        self.local.put(record.clone());
        if let Some(documents) = &self.documents {
            documents.upsert(&record).await?;
        }
        Ok(())
    }

    /// Seed only the device-local side, used for write-through caching of
    /// records observed from authoritative sources.
    pub fn seed_local(&self, record: FallbackRecord) {
        self.local.put(record);
    }
}
