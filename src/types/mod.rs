//! Domain types for campaign reconciliation
//!
//! Each external source projects into its own record shape with explicit
//! optional fields; the unified [`Campaign`] view is recomputed on every load
//! and never persisted. Identifiers arrive in two shapes (small integer or
//! large-integer string) and are normalized through [`CampaignKey`] before any
//! lookup.

pub mod error;

pub use error::{AlmonerError, Result, TransferError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A campaign identifier as stored by the fallback sources.
///
/// Records written before a campaign was indexed on-chain may carry either the
/// numeric registry identifier or its string rendering; both shapes survive
/// round-trips through the document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdValue {
    Number(u64),
    Text(String),
}

impl IdValue {
    /// Canonical comparable rendering: numeric form when the value is (or
    /// parses as) a number, else the trimmed string.
    pub fn canonical(&self) -> String {
        match self {
            IdValue::Number(n) => n.to_string(),
            IdValue::Text(s) => match s.trim().parse::<u64>() {
                Ok(n) => n.to_string(),
                Err(_) => s.trim().to_string(),
            },
        }
    }

    pub fn numeric(&self) -> Option<u64> {
        match self {
            IdValue::Number(n) => Some(*n),
            IdValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl Default for IdValue {
    fn default() -> Self {
        IdValue::Number(0)
    }
}

impl std::fmt::Display for IdValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdValue::Number(n) => write!(f, "{}", n),
            IdValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Canonical campaign key, normalized once at the engine boundary.
///
/// Holds the raw input alongside its numeric parse so equality checks against
/// stored identifiers can try both shapes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CampaignKey {
    raw: String,
    numeric: Option<u64>,
}

impl CampaignKey {
    pub fn parse(input: &str) -> Self {
        let raw = input.trim().to_string();
        let numeric = raw.parse().ok();
        Self { raw, numeric }
    }

    pub fn from_numeric(id: u64) -> Self {
        Self {
            raw: id.to_string(),
            numeric: Some(id),
        }
    }

    /// The on-chain identifier, when the key has a numeric shape.
    pub fn numeric(&self) -> Option<u64> {
        self.numeric
    }

    /// One canonical comparable form: the numeric rendering when available.
    pub fn canonical(&self) -> String {
        match self.numeric {
            Some(n) => n.to_string(),
            None => self.raw.clone(),
        }
    }

    /// Equality against a stored identifier, trying string equality and
    /// numeric equality.
    pub fn matches(&self, candidate: &IdValue) -> bool {
        if let (Some(a), Some(b)) = (self.numeric, candidate.numeric()) {
            if a == b {
                return true;
            }
        }
        self.raw == candidate.canonical() || self.canonical() == candidate.canonical()
    }

    /// Whether a fallback record belongs to this key, under either its local
    /// identifier or its on-chain identifier.
    pub fn matches_record(&self, record: &FallbackRecord) -> bool {
        if self.matches(&record.id) {
            return true;
        }
        record
            .onchain_id
            .as_ref()
            .map(|id| self.matches(id))
            .unwrap_or(false)
    }

    /// The unified view's identifier for this key.
    pub fn id_value(&self) -> IdValue {
        match self.numeric {
            Some(n) => IdValue::Number(n),
            None => IdValue::Text(self.raw.clone()),
        }
    }
}

impl std::fmt::Display for CampaignKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

/// Unified campaign view, recomputed on each load.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: IdValue,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    /// Fundraising target in the ledger's native unit.
    pub goal: f64,
    pub amount_raised: f64,
    /// Derived from `amount_raised / goal`; not clamped, over-funded campaigns
    /// exceed 100.
    pub percentage: f64,
    /// Controlling account, asserted only by the chain record.
    pub owner_address: Option<String>,
    /// Older records kept the controlling wallet under a separate field; it is
    /// still honored for ownership checks.
    pub legacy_owner: Option<String>,
    /// Human-readable organization name; fallback enrichment only.
    pub organization: Option<String>,
    pub active: bool,
}

/// Read-only projection of the registry entry for one identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainRecord {
    pub owner_address: String,
    pub active: bool,
    /// Fundraising target in native units (the registry stores it in base
    /// units; adapters convert on ingest).
    pub goal: f64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
}

/// Content-addressed metadata document, best-effort parsed.
///
/// Absence of the whole record or of any field is normal; empty strings are
/// normalized to absent at parse time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub goal: Option<f64>,
}

/// Sum of donation events for one identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateRecord {
    pub total_raised: f64,
}

/// Best-effort cached campaign shape from the device-local list or the
/// off-chain document store.
///
/// Written wholesale when a campaign is first created locally; superseded
/// field-by-field once authoritative sources answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackRecord {
    pub id: IdValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onchain_id: Option<IdValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_raised: Option<f64>,
    /// Human-readable organization name, not carried by chain or metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    /// Legacy alternate-owner wallet from records predating the registry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legacy_owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_parses_both_shapes() {
        let small = CampaignKey::parse("7");
        assert_eq!(small.numeric(), Some(7));
        assert_eq!(small.canonical(), "7");

        let big = CampaignKey::parse("18446744073709551615");
        assert_eq!(big.numeric(), Some(u64::MAX));

        let textual = CampaignKey::parse("draft-acacia");
        assert_eq!(textual.numeric(), None);
        assert_eq!(textual.canonical(), "draft-acacia");
    }

    #[test]
    fn test_key_matches_numeric_and_string() {
        let key = CampaignKey::parse("42");
        assert!(key.matches(&IdValue::Number(42)));
        assert!(key.matches(&IdValue::Text("42".to_string())));
        assert!(!key.matches(&IdValue::Number(43)));
        assert!(!key.matches(&IdValue::Text("campaign-42".to_string())));
    }

    #[test]
    fn test_key_matches_record_via_onchain_id() {
        let record = FallbackRecord {
            id: IdValue::Text("local-1700000000".to_string()),
            onchain_id: Some(IdValue::Number(9)),
            ..Default::default()
        };
        assert!(CampaignKey::parse("9").matches_record(&record));
        assert!(CampaignKey::parse("local-1700000000").matches_record(&record));
        assert!(!CampaignKey::parse("10").matches_record(&record));
    }

    #[test]
    fn test_id_value_roundtrip() {
        let parsed: IdValue = serde_json::from_str("12").unwrap();
        assert_eq!(parsed, IdValue::Number(12));

        let parsed: IdValue = serde_json::from_str("\"12\"").unwrap();
        assert_eq!(parsed, IdValue::Text("12".to_string()));
        assert_eq!(parsed.canonical(), "12");
        assert_eq!(parsed.numeric(), Some(12));
    }

    #[test]
    fn test_fallback_record_wire_shape() {
        let json = serde_json::json!({
            "id": "1699999999999",
            "onchainId": 3,
            "title": "Clean Water",
            "goal": 250.0,
            "ngo": "ignored-unknown-field"
        });
        let record: FallbackRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.onchain_id, Some(IdValue::Number(3)));
        assert_eq!(record.title.as_deref(), Some("Clean Water"));
        assert_eq!(record.goal, Some(250.0));
    }
}
