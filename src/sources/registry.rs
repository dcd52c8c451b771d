//! Registry mirror client
//!
//! HTTP reader over the registry mirror's REST contract. The mirror projects
//! the on-chain campaign registry and its donation ledger as JSON:
//!
//! ```text
//! GET /campaigns?active=true        -> [CampaignEntry]
//! GET /campaigns/{id}               -> CampaignEntry | 404
//! GET /campaigns/{id}/metadata      -> { "cid": "..." } | 404
//! GET /campaigns/{id}/donations     -> { "totalRaised": "..." }
//! ```
//!
//! Amounts arrive in base units (1e18 per native unit) as decimal strings and
//! are converted on ingest. Read failures are logged and folded to absence.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::{ChainCampaignReader, DonationAggregateReader};
use crate::ownership::normalize_address;
use crate::types::{AggregateRecord, ChainRecord, Result};

/// Base units per native unit on the ledger.
const BASE_UNITS_PER_NATIVE: f64 = 1e18;

/// Registry entry as served by the mirror.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CampaignEntryDto {
    id: u64,
    /// Controlling account of the campaign.
    ngo: String,
    /// Fundraising target in base units, as a decimal string.
    goal: String,
    active: bool,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MetadataAddressDto {
    #[serde(default)]
    cid: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DonationTotalsDto {
    /// Sum of donation events in base units, as a decimal string.
    total_raised: String,
}

impl CampaignEntryDto {
    fn into_record(self) -> (u64, ChainRecord) {
        let owner = normalize_address(&self.ngo).unwrap_or(self.ngo);
        (
            self.id,
            ChainRecord {
                owner_address: owner,
                active: self.active,
                goal: base_to_native(&self.goal),
                title: self.title.filter(|t| !t.is_empty()),
                description: self.description.filter(|d| !d.is_empty()),
                image: self.image.filter(|i| !i.is_empty()),
            },
        )
    }
}

/// Convert a base-unit decimal string to native units.
fn base_to_native(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(v) => v / BASE_UNITS_PER_NATIVE,
        Err(_) => {
            warn!(raw = raw, "unparseable base-unit amount, treating as zero");
            0.0
        }
    }
}

/// HTTP client for the registry mirror.
///
/// Implements both the campaign reader and the donation aggregate reader; the
/// mirror serves both projections.
pub struct RegistryHttpReader {
    http: reqwest::Client,
    base_url: String,
}

impl RegistryHttpReader {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn try_get(&self, id: u64) -> Result<Option<CampaignEntryDto>> {
        let url = format!("{}/campaigns/{}", self.base_url, id);
        let response = self.http.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let entry = response.error_for_status()?.json::<CampaignEntryDto>().await?;
        Ok(Some(entry))
    }

    async fn try_list_active(&self) -> Result<Vec<CampaignEntryDto>> {
        let url = format!("{}/campaigns?active=true", self.base_url);
        let entries = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<CampaignEntryDto>>()
            .await?;
        Ok(entries)
    }

    async fn try_metadata_address(&self, id: u64) -> Result<Option<String>> {
        let url = format!("{}/campaigns/{}/metadata", self.base_url, id);
        let response = self.http.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let dto = response
            .error_for_status()?
            .json::<MetadataAddressDto>()
            .await?;
        Ok(dto.cid.filter(|c| !c.is_empty()))
    }

    async fn try_totals_for(&self, id: u64) -> Result<AggregateRecord> {
        let url = format!("{}/campaigns/{}/donations", self.base_url, id);
        let dto = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<DonationTotalsDto>()
            .await?;

        Ok(AggregateRecord {
            total_raised: base_to_native(&dto.total_raised),
        })
    }
}

#[async_trait]
impl ChainCampaignReader for RegistryHttpReader {
    async fn get(&self, id: u64) -> Option<ChainRecord> {
        match self.try_get(id).await {
            Ok(entry) => entry.map(|e| e.into_record().1),
            Err(e) => {
                warn!(campaign = id, error = %e, "registry read failed, treating record as absent");
                None
            }
        }
    }

    async fn list_active(&self) -> Vec<(u64, ChainRecord)> {
        match self.try_list_active().await {
            Ok(entries) => {
                debug!(count = entries.len(), "active campaigns listed");
                entries.into_iter().map(|e| e.into_record()).collect()
            }
            Err(e) => {
                warn!(error = %e, "active-campaign listing failed");
                Vec::new()
            }
        }
    }

    async fn metadata_address(&self, id: u64) -> Option<String> {
        match self.try_metadata_address(id).await {
            Ok(addr) => addr,
            Err(e) => {
                warn!(campaign = id, error = %e, "metadata-address read failed");
                None
            }
        }
    }
}

#[async_trait]
impl DonationAggregateReader for RegistryHttpReader {
    async fn totals_for(&self, id: u64) -> Option<AggregateRecord> {
        match self.try_totals_for(id).await {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(campaign = id, error = %e, "donation-aggregate read failed");
                None
            }
        }
    }
}
