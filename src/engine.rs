//! Campaign engine
//!
//! Façade owning the source adapters, the fallback store, the donation
//! coordinator, and the last-published view per campaign. All four reads for
//! an identifier are issued concurrently and the merge waits until every one
//! has settled; the shared view map only ever receives fully-formed values,
//! written by the reconciler's output or the donation success path.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

use crate::donation::{CampaignRefresher, DonationCoordinator, DonationStatus};
use crate::fallback::FallbackStore;
use crate::ownership;
use crate::reconcile::{apply_aggregate, reconcile};
use crate::sources::{
    ChainCampaignReader, DonationAggregateReader, MetadataFetcher, OwnershipMutator,
    ValueTransferSubmitter,
};
use crate::types::{
    AggregateRecord, AlmonerError, Campaign, CampaignKey, ChainRecord, FallbackRecord, IdValue,
    Result,
};

/// Engine tuning knobs
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long terminal donation states stay visible before reverting to idle
    pub display_window: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            display_window: crate::donation::DEFAULT_DISPLAY_WINDOW,
        }
    }
}

/// Campaign state reconciliation engine.
pub struct CampaignEngine {
    chain: Arc<dyn ChainCampaignReader>,
    metadata: Arc<dyn MetadataFetcher>,
    aggregates: Arc<dyn DonationAggregateReader>,
    mutator: Arc<dyn OwnershipMutator>,
    fallback: Arc<FallbackStore>,
    donations: DonationCoordinator,
    /// Last fully-formed view per canonical campaign key
    views: RwLock<HashMap<String, Campaign>>,
}

impl CampaignEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        chain: Arc<dyn ChainCampaignReader>,
        metadata: Arc<dyn MetadataFetcher>,
        aggregates: Arc<dyn DonationAggregateReader>,
        submitter: Arc<dyn ValueTransferSubmitter>,
        mutator: Arc<dyn OwnershipMutator>,
        fallback: Arc<FallbackStore>,
        config: EngineConfig,
    ) -> Arc<Self> {
        let donations =
            DonationCoordinator::new(submitter, Arc::clone(&aggregates), config.display_window);

        info!(display_window_ms = config.display_window.as_millis() as u64, "CampaignEngine initialized");

        Arc::new(Self {
            chain,
            metadata,
            aggregates,
            mutator,
            fallback,
            donations,
            views: RwLock::new(HashMap::new()),
        })
    }

    /// Load and reconcile one campaign.
    ///
    /// Returns `None` when no source recognizes the identifier: not found,
    /// as opposed to still loading.
    pub async fn load_campaign(&self, raw_id: &str) -> Option<Campaign> {
        let key = CampaignKey::parse(raw_id);
        let numeric = key.numeric();

        let chain_fut = async {
            match numeric {
                Some(id) => self.chain.get(id).await,
                None => None,
            }
        };
        let metadata_fut = async {
            let id = numeric?;
            let address = self.chain.metadata_address(id).await?;
            self.metadata.fetch(&address).await
        };
        let aggregate_fut = async {
            match numeric {
                Some(id) => self.aggregates.totals_for(id).await,
                None => None,
            }
        };
        let fallback_fut = self.fallback.load(&key);

        // All four sources settle before any merge.
        let (chain, metadata, aggregate, fallback) =
            futures::join!(chain_fut, metadata_fut, aggregate_fut, fallback_fut);

        let previous = self.views.read().await.get(&key.canonical()).cloned();
        let view = reconcile(
            &key,
            fallback.as_ref(),
            chain.as_ref(),
            metadata.as_ref(),
            aggregate.as_ref(),
            previous.as_ref(),
        )?;

        self.publish(&key, view.clone()).await;
        Some(view)
    }

    /// Currently active campaigns, newest first, enriched from fallback
    /// records and written through to the device-local cache.
    pub async fn list_active(&self) -> Vec<Campaign> {
        let listed = self.chain.list_active().await;
        let fallbacks = self.fallback.load_all().await;

        let mut ranked: Vec<(Option<DateTime<Utc>>, Campaign)> = Vec::new();
        for (id, record) in listed {
            let key = CampaignKey::from_numeric(id);
            let enrichment = fallbacks.iter().find(|r| key.matches_record(r));
            let previous = self.views.read().await.get(&key.canonical()).cloned();

            if let Some(view) = reconcile(&key, enrichment, Some(&record), None, None, previous.as_ref())
            {
                self.publish(&key, view.clone()).await;
                self.fallback.seed_local(seed_record(id, &record, enrichment));
                ranked.push((enrichment.and_then(|r| r.created_at), view));
            }
        }

        debug!(count = ranked.len(), "active campaigns assembled");
        ranked.sort_by(|a, b| b.0.cmp(&a.0));
        ranked.into_iter().map(|(_, view)| view).collect()
    }

    /// Begin a donation attempt, or observe the one already in flight for
    /// this campaign. The receiver yields each lifecycle state in order.
    pub fn donate(
        self: &Arc<Self>,
        raw_id: &str,
        amount_input: &str,
    ) -> broadcast::Receiver<DonationStatus> {
        let key = CampaignKey::parse(raw_id);
        self.donations
            .donate(key, amount_input, Arc::clone(self) as Arc<dyn CampaignRefresher>)
    }

    /// Whether the actor controls the campaign.
    pub fn is_owner(&self, campaign: &Campaign, actor: Option<&str>) -> bool {
        ownership::is_owner(campaign, actor)
    }

    /// Last published view for an identifier, if any.
    pub async fn current_view(&self, raw_id: &str) -> Option<Campaign> {
        let key = CampaignKey::parse(raw_id);
        self.views.read().await.get(&key.canonical()).cloned()
    }

    /// Owner-gated record update.
    pub async fn update_campaign(
        &self,
        campaign: &Campaign,
        actor: Option<&str>,
        title: &str,
        description: &str,
        image_ref: &str,
    ) -> Result<()> {
        self.require_owner(campaign, actor)?;
        let id = numeric_id(campaign)?;
        self.mutator
            .update_record(id, title, description, image_ref)
            .await
    }

    /// Owner-gated deactivation. On success the published view flips to
    /// inactive immediately rather than waiting for the registry to re-index.
    pub async fn deactivate_campaign(
        &self,
        campaign: &Campaign,
        actor: Option<&str>,
    ) -> Result<()> {
        self.require_owner(campaign, actor)?;
        let id = numeric_id(campaign)?;
        self.mutator.deactivate(id).await?;

        let key = CampaignKey::from_numeric(id);
        let mut views = self.views.write().await;
        if let Some(view) = views.get_mut(&key.canonical()) {
            view.active = false;
        }
        info!(campaign = id, "campaign deactivated");
        Ok(())
    }

    fn require_owner(&self, campaign: &Campaign, actor: Option<&str>) -> Result<()> {
        if self.is_owner(campaign, actor) {
            Ok(())
        } else {
            Err(AlmonerError::Validation(
                "only the campaign owner can modify the record".to_string(),
            ))
        }
    }

    async fn publish(&self, key: &CampaignKey, view: Campaign) {
        self.views.write().await.insert(key.canonical(), view);
    }
}

#[async_trait]
impl CampaignRefresher for CampaignEngine {
    async fn refresh(
        &self,
        key: &CampaignKey,
        aggregate: Option<AggregateRecord>,
    ) -> Option<Campaign> {
        let previous = self.views.read().await.get(&key.canonical()).cloned();
        match previous {
            Some(previous) => {
                let updated = apply_aggregate(&previous, aggregate.as_ref());
                self.publish(key, updated.clone()).await;
                Some(updated)
            }
            // Nothing published yet for this campaign (the view was abandoned
            // mid-attempt); rebuild it from scratch.
            None => self.load_campaign(&key.canonical()).await,
        }
    }
}

fn numeric_id(campaign: &Campaign) -> Result<u64> {
    campaign.id.numeric().ok_or_else(|| {
        AlmonerError::Validation("campaign has no on-chain identifier".to_string())
    })
}

/// Write-through record for the device-local cache: latest authoritative
/// fields, with enrichment preserved from any existing fallback record.
fn seed_record(id: u64, record: &ChainRecord, enrichment: Option<&FallbackRecord>) -> FallbackRecord {
    FallbackRecord {
        id: IdValue::Number(id),
        onchain_id: Some(IdValue::Number(id)),
        title: record
            .title
            .clone()
            .or_else(|| enrichment.and_then(|r| r.title.clone())),
        description: record
            .description
            .clone()
            .or_else(|| enrichment.and_then(|r| r.description.clone())),
        image: record
            .image
            .clone()
            .or_else(|| enrichment.and_then(|r| r.image.clone())),
        goal: Some(record.goal),
        amount_raised: enrichment.and_then(|r| r.amount_raised),
        organization: enrichment.and_then(|r| r.organization.clone()),
        legacy_owner: enrichment.and_then(|r| r.legacy_owner.clone()),
        created_at: enrichment.and_then(|r| r.created_at),
    }
}
