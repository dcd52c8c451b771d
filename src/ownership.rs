//! Ownership resolution
//!
//! Decides whether the current actor controls a campaign. Recomputed on every
//! campaign or actor change; never cached.

use crate::types::Campaign;

/// Normalize an account address to its lowercase canonical form.
///
/// Accepts the ledger's `0x` + 20-byte hex shape; anything else is not an
/// address.
pub fn normalize_address(input: &str) -> Option<String> {
    let trimmed = input.trim();
    let digits = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X"))?;
    if digits.len() != 40 || hex::decode(digits).is_err() {
        return None;
    }
    Some(trimmed.to_ascii_lowercase())
}

/// True iff the actor controls the campaign: case-insensitive match against
/// the chain-asserted owner or the legacy alternate-owner field. Absent actor
/// or absent owners resolve to `false`, never unknown.
pub fn is_owner(campaign: &Campaign, actor: Option<&str>) -> bool {
    let actor = match actor.map(str::trim) {
        Some(a) if !a.is_empty() => a,
        _ => return false,
    };

    let matches = |candidate: &Option<String>| {
        candidate
            .as_deref()
            .map(|c| c.eq_ignore_ascii_case(actor))
            .unwrap_or(false)
    };

    matches(&campaign.owner_address) || matches(&campaign.legacy_owner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IdValue;

    fn campaign(owner: Option<&str>, legacy: Option<&str>) -> Campaign {
        Campaign {
            id: IdValue::Number(1),
            title: "Test".to_string(),
            description: String::new(),
            image: None,
            goal: 0.0,
            amount_raised: 0.0,
            percentage: 0.0,
            owner_address: owner.map(str::to_string),
            legacy_owner: legacy.map(str::to_string),
            organization: None,
            active: true,
        }
    }

    const OWNER: &str = "0x00000000000000000000000000000000000000aa";

    #[test]
    fn test_case_insensitive_owner_match() {
        let c = campaign(Some(OWNER), None);
        assert!(is_owner(&c, Some(&OWNER.to_uppercase())));
        assert!(is_owner(&c, Some(OWNER)));
        assert!(!is_owner(
            &c,
            Some("0x00000000000000000000000000000000000000ab")
        ));
    }

    #[test]
    fn test_legacy_owner_field_honored() {
        let c = campaign(None, Some(OWNER));
        assert!(is_owner(&c, Some(OWNER)));
    }

    #[test]
    fn test_absent_actor_or_owner_is_false() {
        assert!(!is_owner(&campaign(Some(OWNER), None), None));
        assert!(!is_owner(&campaign(Some(OWNER), None), Some("")));
        assert!(!is_owner(&campaign(None, None), Some(OWNER)));
    }

    #[test]
    fn test_normalize_address() {
        assert_eq!(
            normalize_address("0x00000000000000000000000000000000000000AA"),
            Some(OWNER.to_string())
        );
        assert_eq!(normalize_address("0xabc"), None);
        assert_eq!(normalize_address("not-an-address"), None);
        assert_eq!(
            normalize_address("0xzz000000000000000000000000000000000000aa"),
            None
        );
    }
}
