//! BCP 47 locale matching, reduced to what installer selection needs.

/// Primary language subtag, lowercased.
pub(crate) fn language(tag: &str) -> String {
    tag.split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

pub(crate) fn is_exact(a: &str, b: &str) -> bool {
    !a.is_empty() && a.replace('_', "-").eq_ignore_ascii_case(&b.replace('_', "-"))
}

/// Same tag or same primary language.
pub(crate) fn is_compatible(requested: &str, available: &str) -> bool {
    is_exact(requested, available)
        || (!requested.is_empty() && language(requested) == language(available))
}

/// Closeness of an installer locale to the caller's preferences. Higher is
/// better; zero means no relation at all.
pub(crate) fn rank(requested: &[String], previous_intent: Option<&str>, available: &str) -> u8 {
    if available.is_empty() {
        return 1;
    }
    if requested.iter().any(|r| is_exact(r, available)) {
        return 4;
    }
    if requested.iter().any(|r| is_compatible(r, available)) {
        return 3;
    }
    if previous_intent.is_some_and(|p| is_compatible(p, available)) {
        return 2;
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching() {
        assert!(is_exact("en-US", "EN-us"));
        assert!(is_exact("en_US", "en-US"));
        assert!(!is_exact("", ""));
        assert!(is_compatible("en-US", "en-GB"));
        assert!(is_compatible("en", "en-GB"));
        assert!(!is_compatible("en-US", "fr-FR"));
    }

    #[test]
    fn test_rank_order() {
        let requested = vec!["en-US".to_string()];
        assert_eq!(rank(&requested, None, "en-US"), 4);
        assert_eq!(rank(&requested, None, "en-GB"), 3);
        assert_eq!(rank(&requested, Some("fr-FR"), "fr-CA"), 2);
        assert_eq!(rank(&requested, None, ""), 1);
        assert_eq!(rank(&requested, None, "de-DE"), 0);
    }
}
