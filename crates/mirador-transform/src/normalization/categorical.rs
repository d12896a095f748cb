//! Categorical normalization.

use std::collections::BTreeMap;

/// Code assigned to values outside a field's lookup table.
pub const OTHER_CATEGORY: &str = "other";

/// Keeps only uppercase ASCII alphanumerics.
pub fn compact_key(value: &str) -> String {
    value
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|ch| ch.to_ascii_uppercase())
        .collect()
}

/// Resolves a raw category against `lookup` (raw value → code).
///
/// An empty lookup passes the trimmed value through. Otherwise an exact
/// match wins, then a match ignoring case and punctuation. `None` means the
/// value is unknown to the lookup.
pub fn resolve_category(lookup: &BTreeMap<String, String>, raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if lookup.is_empty() {
        return Some(trimmed.to_string());
    }
    if let Some(code) = lookup.get(trimmed) {
        return Some(code.clone());
    }
    let compact = compact_key(trimmed);
    if compact.is_empty() {
        return None;
    }
    lookup
        .iter()
        .find(|(candidate, _)| compact_key(candidate) == compact)
        .map(|(_, code)| code.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome_lookup() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("Survived".to_string(), "1".to_string()),
            ("Died".to_string(), "0".to_string()),
            ("Lost to follow-up".to_string(), "2".to_string()),
        ])
    }

    #[test]
    fn exact_then_compact_match() {
        let lookup = outcome_lookup();
        assert_eq!(resolve_category(&lookup, "Died"), Some("0".to_string()));
        assert_eq!(resolve_category(&lookup, " survived "), Some("1".to_string()));
        assert_eq!(
            resolve_category(&lookup, "LOST TO FOLLOWUP"),
            Some("2".to_string())
        );
    }

    #[test]
    fn unknown_values_do_not_resolve() {
        let lookup = outcome_lookup();
        assert_eq!(resolve_category(&lookup, "transferred"), None);
        assert_eq!(resolve_category(&lookup, "--"), None);
    }

    #[test]
    fn empty_lookup_passes_through() {
        assert_eq!(
            resolve_category(&BTreeMap::new(), " Kenema "),
            Some("Kenema".to_string())
        );
    }
}
