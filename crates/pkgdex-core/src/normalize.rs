//! Name and publisher normalization for correlation search.
//!
//! Normalized values drop the noise installers add to display names
//! (architecture, version numbers, bracketed qualifiers) so that
//! `Contoso Editor (x64) 1.2.3` and `Contoso Editor` correlate.

use std::sync::LazyLock;

use regex::Regex;

static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)|\[[^\]]*\]").expect("valid regex"));

static ARCHITECTURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(x64|x86|x86_64|amd64|arm64|aarch64|64-bit|32-bit|64bit|32bit)\b")
        .expect("valid regex")
});

static VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(version\s*)?v?\d+(\.\d+)+\b|\bversion\b").expect("valid regex")
});

static LEGAL_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\b(incorporated|inc|corporation|corp|company|co|llc|ltd|limited",
        r"|gmbh|ag|sa|srl|bv|pty|plc)\b\.?",
    ))
    .expect("valid regex")
});

/// Normalize a package display name.
pub fn normalize_name(name: &str) -> String {
    let s = BRACKETED.replace_all(name, " ");
    let s = ARCHITECTURE.replace_all(&s, " ");
    let s = VERSION.replace_all(&s, " ");
    squash(&s)
}

/// Normalize a publisher display name.
pub fn normalize_publisher(publisher: &str) -> String {
    let s = BRACKETED.replace_all(publisher, " ");
    let s = LEGAL_SUFFIX.replace_all(&s, " ");
    squash(&s)
}

/// Lowercase and keep only alphanumerics.
fn squash(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Contoso Editor"), "contosoeditor");
        assert_eq!(normalize_name("Contoso Editor (x64)"), "contosoeditor");
        assert_eq!(normalize_name("Contoso Editor 1.2.3 x86"), "contosoeditor");
        assert_eq!(normalize_name("Contoso Editor version 10.4"), "contosoeditor");
        assert_eq!(normalize_name("Contoso Editor [Preview]"), "contosoeditor");
    }

    #[test]
    fn test_normalize_publisher() {
        assert_eq!(normalize_publisher("Contoso, Ltd."), "contoso");
        assert_eq!(normalize_publisher("Contoso Corporation"), "contoso");
        assert_eq!(normalize_publisher("Fabrikam GmbH"), "fabrikam");
    }

    #[test]
    fn test_names_keep_digits_that_are_not_versions() {
        assert_eq!(normalize_name("7-Zip"), "7zip");
        assert_eq!(normalize_name("Notepad++"), "notepad");
    }
}
