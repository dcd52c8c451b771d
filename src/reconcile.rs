//! Campaign reconciliation
//!
//! Pure merge of the four source records into one unified [`Campaign`] view.
//! Field precedence, highest first: metadata, chain, fallback, then the
//! type-appropriate zero value. Ownership and activation come only from the
//! chain record; the amount raised comes only from the aggregate read, with
//! the previously displayed view as the degradation path when that read
//! failed. The function never fails: adapter trouble arrives here already
//! folded into absence, and the output is either a fully-formed view or
//! absent.

use tracing::trace;

use crate::types::{
    AggregateRecord, Campaign, CampaignKey, ChainRecord, FallbackRecord, MetadataRecord,
};

/// Merge the settled source records for one identifier.
///
/// `previous` is the last view published for this identifier, supplied by the
/// caller so a failed aggregate read degrades to the known value instead of
/// resetting the display to zero.
///
/// Returns `None` when no source recognizes the identifier; callers must
/// treat that as "not found", distinct from "still loading".
pub fn reconcile(
    key: &CampaignKey,
    fallback: Option<&FallbackRecord>,
    chain: Option<&ChainRecord>,
    metadata: Option<&MetadataRecord>,
    aggregate: Option<&AggregateRecord>,
    previous: Option<&Campaign>,
) -> Option<Campaign> {
    // Existence: the aggregate carries no signal here, since totals sum to
    // zero for unknown identifiers just as for unfunded ones.
    if chain.is_none() && metadata.is_none() && fallback.is_none() {
        return None;
    }

    let title = pick_text(
        metadata.and_then(|m| m.title.as_deref()),
        chain.and_then(|c| c.title.as_deref()),
        fallback.and_then(|f| f.title.as_deref()),
    );
    let description = pick_text(
        metadata.and_then(|m| m.description.as_deref()),
        chain.and_then(|c| c.description.as_deref()),
        fallback.and_then(|f| f.description.as_deref()),
    );
    let image = metadata
        .and_then(|m| m.image.clone())
        .or_else(|| chain.and_then(|c| c.image.clone()))
        .or_else(|| fallback.and_then(|f| f.image.clone()));

    // A chain record makes its goal authoritative over any cached value;
    // freshly fetched metadata still wins.
    let goal = metadata
        .and_then(|m| m.goal)
        .or_else(|| chain.map(|c| c.goal))
        .or_else(|| fallback.and_then(|f| f.goal))
        .unwrap_or(0.0);

    let amount_raised = aggregate
        .map(|a| a.total_raised)
        .or_else(|| previous.map(|p| p.amount_raised))
        .or_else(|| fallback.and_then(|f| f.amount_raised))
        .unwrap_or(0.0);

    let campaign = Campaign {
        id: key.id_value(),
        title,
        description,
        image,
        goal,
        amount_raised,
        percentage: percentage_of(goal, amount_raised),
        owner_address: chain.map(|c| c.owner_address.clone()),
        legacy_owner: fallback.and_then(|f| f.legacy_owner.clone()),
        organization: fallback.and_then(|f| f.organization.clone()),
        active: chain.map(|c| c.active).unwrap_or(true),
    };

    trace!(campaign = %key, goal = campaign.goal, raised = campaign.amount_raised, "reconciled");
    Some(campaign)
}

/// Recompute the raised amount and percentage of an already-published view
/// from a fresh aggregate read. The two fields always change together; a
/// missing aggregate leaves both untouched.
pub fn apply_aggregate(previous: &Campaign, aggregate: Option<&AggregateRecord>) -> Campaign {
    let amount_raised = aggregate
        .map(|a| a.total_raised)
        .unwrap_or(previous.amount_raised);

    Campaign {
        amount_raised,
        percentage: percentage_of(previous.goal, amount_raised),
        ..previous.clone()
    }
}

fn pick_text(first: Option<&str>, second: Option<&str>, third: Option<&str>) -> String {
    first
        .or(second)
        .or(third)
        .map(str::to_string)
        .unwrap_or_default()
}

fn percentage_of(goal: f64, raised: f64) -> f64 {
    if goal > 0.0 {
        raised / goal * 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IdValue;

    fn key(raw: &str) -> CampaignKey {
        CampaignKey::parse(raw)
    }

    fn chain_record() -> ChainRecord {
        ChainRecord {
            owner_address: "0x00000000000000000000000000000000000000aa".to_string(),
            active: true,
            goal: 100.0,
            title: Some("Chain Title".to_string()),
            description: Some("Chain description".to_string()),
            image: Some("https://img.example/chain.png".to_string()),
        }
    }

    fn metadata_record() -> MetadataRecord {
        MetadataRecord {
            title: Some("Metadata Title".to_string()),
            description: None,
            image: None,
            goal: Some(50.0),
        }
    }

    fn fallback_record() -> FallbackRecord {
        FallbackRecord {
            id: IdValue::Number(1),
            title: Some("Fallback Title".to_string()),
            description: Some("Fallback description".to_string()),
            image: Some("https://img.example/fallback.png".to_string()),
            goal: Some(10.0),
            amount_raised: Some(4.0),
            organization: Some("Relief Works".to_string()),
            legacy_owner: Some("0x00000000000000000000000000000000000000bb".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_all_sources_absent_is_not_found() {
        assert!(reconcile(&key("1"), None, None, None, None, None).is_none());

        // An aggregate alone does not establish existence.
        let aggregate = AggregateRecord { total_raised: 3.0 };
        assert!(reconcile(&key("1"), None, None, None, Some(&aggregate), None).is_none());
    }

    #[test]
    fn test_any_record_source_present_yields_view() {
        assert!(reconcile(&key("1"), Some(&fallback_record()), None, None, None, None).is_some());
        assert!(reconcile(&key("1"), None, Some(&chain_record()), None, None, None).is_some());
        assert!(reconcile(&key("1"), None, None, Some(&metadata_record()), None, None).is_some());
    }

    #[test]
    fn test_field_precedence_metadata_over_chain_over_fallback() {
        let campaign = reconcile(
            &key("1"),
            Some(&fallback_record()),
            Some(&chain_record()),
            Some(&metadata_record()),
            None,
            None,
        )
        .unwrap();

        assert_eq!(campaign.title, "Metadata Title");
        // Metadata has no description; the chain's wins over the fallback's.
        assert_eq!(campaign.description, "Chain description");
        assert_eq!(campaign.image.as_deref(), Some("https://img.example/chain.png"));
        assert_eq!(campaign.goal, 50.0);
    }

    #[test]
    fn test_goal_chain_absent_metadata_wins_over_fallback() {
        let campaign = reconcile(
            &key("1"),
            Some(&fallback_record()),
            None,
            Some(&metadata_record()),
            None,
            None,
        )
        .unwrap();
        assert_eq!(campaign.goal, 50.0);
    }

    #[test]
    fn test_goal_ignores_stale_fallback_once_chained() {
        let metadata = MetadataRecord::default();
        let campaign = reconcile(
            &key("1"),
            Some(&fallback_record()),
            Some(&chain_record()),
            Some(&metadata),
            None,
            None,
        )
        .unwrap();
        // Chain goal, never the cached 10.0.
        assert_eq!(campaign.goal, 100.0);
    }

    #[test]
    fn test_owner_and_active_come_only_from_chain() {
        let with_chain = reconcile(
            &key("1"),
            Some(&fallback_record()),
            Some(&chain_record()),
            None,
            None,
            None,
        )
        .unwrap();
        assert_eq!(
            with_chain.owner_address.as_deref(),
            Some("0x00000000000000000000000000000000000000aa")
        );
        assert!(with_chain.active);

        let without_chain =
            reconcile(&key("1"), Some(&fallback_record()), None, None, None, None).unwrap();
        assert_eq!(without_chain.owner_address, None);
        // Optimistic default when the chain has not answered.
        assert!(without_chain.active);

        let mut deactivated = chain_record();
        deactivated.active = false;
        let flagged = reconcile(
            &key("1"),
            Some(&fallback_record()),
            Some(&deactivated),
            None,
            None,
            None,
        )
        .unwrap();
        assert!(!flagged.active);
    }

    #[test]
    fn test_percentage_derivation() {
        let mut chain = chain_record();
        chain.goal = 200.0;
        let aggregate = AggregateRecord { total_raised: 50.0 };
        let campaign = reconcile(&key("1"), None, Some(&chain), None, Some(&aggregate), None).unwrap();
        assert_eq!(campaign.percentage, 25.0);

        // Over-funded campaigns exceed 100.
        let aggregate = AggregateRecord {
            total_raised: 500.0,
        };
        let campaign = reconcile(&key("1"), None, Some(&chain), None, Some(&aggregate), None).unwrap();
        assert_eq!(campaign.percentage, 250.0);

        // Zero goal never divides.
        chain.goal = 0.0;
        let campaign = reconcile(&key("1"), None, Some(&chain), None, Some(&aggregate), None).unwrap();
        assert_eq!(campaign.percentage, 0.0);
    }

    #[test]
    fn test_failed_aggregate_keeps_previous_amount() {
        let chain = chain_record();
        let aggregate = AggregateRecord { total_raised: 40.0 };
        let first = reconcile(&key("1"), None, Some(&chain), None, Some(&aggregate), None).unwrap();
        assert_eq!(first.amount_raised, 40.0);

        let degraded = reconcile(&key("1"), None, Some(&chain), None, None, Some(&first)).unwrap();
        assert_eq!(degraded.amount_raised, 40.0);
        assert_eq!(degraded.percentage, 40.0);
    }

    #[test]
    fn test_first_load_aggregate_failure_seeds_from_fallback() {
        let campaign =
            reconcile(&key("1"), Some(&fallback_record()), None, None, None, None).unwrap();
        assert_eq!(campaign.amount_raised, 4.0);
        assert_eq!(campaign.goal, 10.0);
        assert_eq!(campaign.percentage, 40.0);
    }

    #[test]
    fn test_enrichment_fields_come_from_fallback() {
        let campaign = reconcile(
            &key("1"),
            Some(&fallback_record()),
            Some(&chain_record()),
            None,
            None,
            None,
        )
        .unwrap();
        assert_eq!(campaign.organization.as_deref(), Some("Relief Works"));
        assert_eq!(
            campaign.legacy_owner.as_deref(),
            Some("0x00000000000000000000000000000000000000bb")
        );
    }

    #[test]
    fn test_idempotence() {
        let aggregate = AggregateRecord { total_raised: 7.5 };
        let a = reconcile(
            &key("3"),
            Some(&fallback_record()),
            Some(&chain_record()),
            Some(&metadata_record()),
            Some(&aggregate),
            None,
        );
        let b = reconcile(
            &key("3"),
            Some(&fallback_record()),
            Some(&chain_record()),
            Some(&metadata_record()),
            Some(&aggregate),
            None,
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_values_when_no_source_supplies_field() {
        let metadata = MetadataRecord {
            title: Some("Only a title".to_string()),
            ..Default::default()
        };
        let campaign = reconcile(&key("2"), None, None, Some(&metadata), None, None).unwrap();
        assert_eq!(campaign.title, "Only a title");
        assert_eq!(campaign.description, "");
        assert_eq!(campaign.image, None);
        assert_eq!(campaign.goal, 0.0);
        assert_eq!(campaign.amount_raised, 0.0);
        assert_eq!(campaign.percentage, 0.0);
    }

    #[test]
    fn test_textual_identifier_flows_through() {
        let campaign =
            reconcile(&key("draft-7"), Some(&fallback_record()), None, None, None, None).unwrap();
        assert_eq!(campaign.id, IdValue::Text("draft-7".to_string()));
    }

    #[test]
    fn test_apply_aggregate_recomputes_pair() {
        let chain = chain_record();
        let base = reconcile(&key("1"), None, Some(&chain), None, None, None).unwrap();

        let refreshed = apply_aggregate(&base, Some(&AggregateRecord { total_raised: 25.0 }));
        assert_eq!(refreshed.amount_raised, 25.0);
        assert_eq!(refreshed.percentage, 25.0);

        let unchanged = apply_aggregate(&refreshed, None);
        assert_eq!(unchanged.amount_raised, 25.0);
        assert_eq!(unchanged.percentage, 25.0);
    }
}
