//! Package and manifest version model.
//!
//! A [`Version`] is a best-effort, never-failing parse of a dot-separated
//! version string. A [`ManifestVer`] is the strict form used for the
//! manifest schema version: a numeric core of at most three parts plus
//! optional hyphen-separated extensions such as `1.0.0-beta`.

use std::cmp::Ordering;
use std::fmt;

use crate::validation::{ManifestError, ValidationError};

/// One dot-separated segment of a version.
#[derive(Debug, Clone, Default)]
pub struct VersionPart {
    /// Leading decimal digits, or 0 when the segment has none.
    pub integer: u64,
    /// Whatever follows the leading digits.
    pub other: String,
}

impl VersionPart {
    /// Parse a single segment. Never fails.
    pub fn parse(segment: &str) -> Self {
        let digits = segment.bytes().take_while(u8::is_ascii_digit).count();
        let (number, rest) = segment.split_at(digits);
        match number.parse::<u64>() {
            Ok(integer) => Self {
                integer,
                other: rest.to_string(),
            },
            // Either no digits, or more than fit in a u64: keep the text.
            Err(_) => Self {
                integer: 0,
                other: segment.to_string(),
            },
        }
    }
}

impl PartialEq for VersionPart {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for VersionPart {}

impl PartialOrd for VersionPart {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VersionPart {
    fn cmp(&self, other: &Self) -> Ordering {
        self.integer.cmp(&other.integer).then_with(|| {
            match (self.other.is_empty(), other.other.is_empty()) {
                (true, true) => Ordering::Equal,
                // A bare number outranks one carrying a tag: 1.0 > 1.0beta
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => self
                    .other
                    .to_lowercase()
                    .cmp(&other.other.to_lowercase()),
            }
        })
    }
}

/// A dot-separated version such as `1.2.3` or `10.0.19041-preview`.
///
/// # Example
///
/// ```
/// use pkgdex_schema::Version;
///
/// assert!(Version::parse("1.2.3") < Version::parse("1.10.0"));
/// assert_eq!(Version::parse("1.0"), Version::parse("1.0.0"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Version {
    raw: String,
    parts: Vec<VersionPart>,
}

impl Version {
    /// Parse a version string. Never fails.
    pub fn parse(s: &str) -> Self {
        let raw = s.trim().to_string();
        let parts = if raw.is_empty() {
            Vec::new()
        } else {
            raw.split('.').map(VersionPart::parse).collect()
        };
        Self { raw, parts }
    }

    /// The trimmed input string.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Parsed segments, in order.
    pub fn parts(&self) -> &[VersionPart] {
        &self.parts
    }

    /// Segment at `index`, or the zero part when the version is shorter.
    pub fn part_at(&self, index: usize) -> VersionPart {
        self.parts.get(index).cloned().unwrap_or_default()
    }

    /// Whether the string is usable as a package version: non-blank, no
    /// whitespace and no empty segments.
    pub fn is_well_formed(&self) -> bool {
        !self.raw.is_empty()
            && !self.raw.chars().any(char::is_whitespace)
            && self.raw.split('.').all(|s| !s.is_empty())
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        (0..len)
            .map(|i| self.part_at(i).cmp(&other.part_at(i)))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

/// Maximum number of parts in a manifest version core.
const MANIFEST_VER_MAX_PARTS: usize = 3;

const MANIFEST_VERSION_FIELD: &str = "ManifestVersion";

/// Strict manifest schema version, e.g. `1.0.0` or `1.1.0-msstore`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ManifestVer {
    core: Version,
    extensions: Vec<Version>,
}

impl ManifestVer {
    /// Parse a manifest version.
    ///
    /// # Errors
    ///
    /// Returns an [`ManifestError::InvalidFieldValue`] error carrying the raw
    /// value when the core has an empty or non-numeric part or more than
    /// three parts, or when an extension does not start with a tag.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let invalid = || {
            ValidationError::field_value(
                ManifestError::InvalidFieldValue,
                MANIFEST_VERSION_FIELD,
                s,
            )
        };

        let (core_str, ext_str) = match s.split_once('-') {
            Some((core, rest)) => (core, Some(rest)),
            None => (s, None),
        };

        let core = Version::parse(core_str);
        if core_str.split('.').any(str::is_empty)
            || core.parts().is_empty()
            || core.parts().len() > MANIFEST_VER_MAX_PARTS
            || core.parts().iter().any(|p| !p.other.is_empty())
        {
            return Err(invalid());
        }

        let mut extensions = Vec::new();
        if let Some(rest) = ext_str {
            for block in rest.split('-') {
                let ext = Version::parse(block);
                let well_formed = ext
                    .parts()
                    .first()
                    .is_some_and(|p| p.integer == 0 && !p.other.is_empty());
                if !well_formed {
                    return Err(invalid());
                }
                extensions.push(ext);
            }
        }

        Ok(Self { core, extensions })
    }

    /// Major component.
    pub fn major(&self) -> u64 {
        self.core.part_at(0).integer
    }

    /// Minor component.
    pub fn minor(&self) -> u64 {
        self.core.part_at(1).integer
    }

    /// Patch component.
    pub fn patch(&self) -> u64 {
        self.core.part_at(2).integer
    }

    /// Extension blocks following the core, in order.
    pub fn extensions(&self) -> &[Version] {
        &self.extensions
    }

    /// Whether any extension is tagged `tag` (case-insensitive).
    pub fn has_extension(&self, tag: &str) -> bool {
        self.extensions.iter().any(|ext| {
            ext.parts()
                .first()
                .is_some_and(|p| p.integer == 0 && p.other.eq_ignore_ascii_case(tag))
        })
    }
}

impl Default for ManifestVer {
    fn default() -> Self {
        Self {
            core: Version::parse("1.0.0"),
            extensions: Vec::new(),
        }
    }
}

impl fmt::Display for ManifestVer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.core)?;
        for ext in &self.extensions {
            write!(f, "-{ext}")?;
        }
        Ok(())
    }
}

impl TryFrom<String> for ManifestVer {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<ManifestVer> for String {
    fn from(v: ManifestVer) -> Self {
        v.to_string()
    }
}
