//! Content-addressed metadata fetching
//!
//! Dereferences the content address stored alongside a chain record into a
//! [`MetadataRecord`]. Documents are JSON-shaped but written by many clients,
//! so parsing is best-effort: fields are picked individually, empty strings
//! normalize to absent, and the goal is accepted as either number or string.

use async_trait::async_trait;
use cid::Cid;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

use super::MetadataFetcher;
use crate::types::{AlmonerError, MetadataRecord, Result};

/// Validate a content address and return its canonical string form.
///
/// Accepts CIDv0 ("Qm...") and CIDv1 ("baf...", "z...") forms.
fn validate_content_address(addr: &str) -> Result<String> {
    let addr = addr.trim();
    match Cid::from_str(addr) {
        Ok(cid) => Ok(cid.to_string()),
        Err(e) => Err(AlmonerError::Validation(format!(
            "invalid content address '{}': {}",
            addr, e
        ))),
    }
}

/// Pick a non-empty string field out of a JSON document.
fn non_empty_str(value: Option<&serde_json::Value>) -> Option<String> {
    value
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// The goal may be written as a JSON number or a numeric string.
fn numeric_field(value: Option<&serde_json::Value>) -> Option<f64> {
    let value = value?;
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .filter(|v| v.is_finite())
}

/// Best-effort projection of a metadata document.
fn parse_metadata(document: &serde_json::Value) -> MetadataRecord {
    MetadataRecord {
        title: non_empty_str(document.get("title")),
        description: non_empty_str(document.get("description")),
        image: non_empty_str(document.get("image")),
        goal: numeric_field(document.get("goal")),
    }
}

/// Fetches metadata documents through a public gateway.
pub struct GatewayMetadataFetcher {
    http: reqwest::Client,
    gateway_base: String,
}

impl GatewayMetadataFetcher {
    pub fn new(gateway_base: &str, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            gateway_base: gateway_base.trim_end_matches('/').to_string(),
        }
    }

    async fn try_fetch(&self, address: &str) -> Result<MetadataRecord> {
        let cid = validate_content_address(address)?;
        let url = format!("{}/ipfs/{}", self.gateway_base, cid);

        let document = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<serde_json::Value>()
            .await?;

        debug!(cid = %cid, "metadata document fetched");
        Ok(parse_metadata(&document))
    }
}

#[async_trait]
impl MetadataFetcher for GatewayMetadataFetcher {
    async fn fetch(&self, address: &str) -> Option<MetadataRecord> {
        match self.try_fetch(address).await {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(address = address, error = %e, "metadata fetch failed, treating as absent");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_content_address() {
        use multihash_codetable::{Code, MultihashDigest};

        // Build a CIDv1 over known bytes and round-trip it.
        let data = b"campaign metadata";
        let hash = Code::Sha2_256.digest(data);
        let cid = Cid::new_v1(0x55, hash); // 0x55 = raw codec
        let cid_str = cid.to_string();

        let validated = validate_content_address(&cid_str).unwrap();
        assert_eq!(validated, cid_str);
        assert_eq!(hex::encode(cid.hash().digest()).len(), 64);

        assert!(validate_content_address("not-a-cid").is_err());
        assert!(validate_content_address("").is_err());
    }

    #[test]
    fn test_parse_metadata_normalizes_empty_fields() {
        let doc = serde_json::json!({
            "title": "",
            "description": "Rebuild the school",
            "image": "   ",
            "goal": 120.5
        });
        let record = parse_metadata(&doc);
        assert_eq!(record.title, None);
        assert_eq!(record.description.as_deref(), Some("Rebuild the school"));
        assert_eq!(record.image, None);
        assert_eq!(record.goal, Some(120.5));
    }

    #[test]
    fn test_parse_metadata_goal_shapes() {
        let numeric = parse_metadata(&serde_json::json!({ "goal": 50 }));
        assert_eq!(numeric.goal, Some(50.0));

        let textual = parse_metadata(&serde_json::json!({ "goal": "75.25" }));
        assert_eq!(textual.goal, Some(75.25));

        let junk = parse_metadata(&serde_json::json!({ "goal": "a lot" }));
        assert_eq!(junk.goal, None);

        let missing = parse_metadata(&serde_json::json!({}));
        assert_eq!(missing.goal, None);
    }
}
