//! Search requests and results.

use std::fmt;
use std::str::FromStr;

use crate::normalize::{normalize_name, normalize_publisher};

/// Field a search value is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PackageMatchField {
    Id,
    Name,
    Moniker,
    Command,
    Tag,
    PackageFamilyName,
    ProductCode,
    NormalizedName,
    NormalizedPublisher,
    UpgradeCode,
}

impl PackageMatchField {
    /// Fields a free-text query is matched against.
    pub const QUERY_FIELDS: [Self; 5] = [
        Self::Id,
        Self::Name,
        Self::Moniker,
        Self::Command,
        Self::Tag,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Moniker => "moniker",
            Self::Command => "command",
            Self::Tag => "tag",
            Self::PackageFamilyName => "pfn",
            Self::ProductCode => "productcode",
            Self::NormalizedName => "normalizedname",
            Self::NormalizedPublisher => "normalizedpublisher",
            Self::UpgradeCode => "upgradecode",
        }
    }

    /// Bring a search value into the form the field is stored in.
    pub fn prepare_value(&self, value: &str) -> String {
        match self {
            Self::NormalizedName => normalize_name(value),
            Self::NormalizedPublisher => normalize_publisher(value),
            _ => value.to_string(),
        }
    }
}

impl fmt::Display for PackageMatchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PackageMatchField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "id" => Ok(Self::Id),
            "name" => Ok(Self::Name),
            "moniker" => Ok(Self::Moniker),
            "command" => Ok(Self::Command),
            "tag" => Ok(Self::Tag),
            "pfn" | "packagefamilyname" => Ok(Self::PackageFamilyName),
            "productcode" => Ok(Self::ProductCode),
            "normalizedname" => Ok(Self::NormalizedName),
            "normalizedpublisher" => Ok(Self::NormalizedPublisher),
            "upgradecode" => Ok(Self::UpgradeCode),
            _ => Err(format!("Unknown match field: {s}")),
        }
    }
}

/// How a search value is compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MatchType {
    Exact,
    #[default]
    CaseInsensitive,
    StartsWith,
    Substring,
}

impl MatchType {
    /// SQL clause appended to the matched column; binds `?1`.
    pub(crate) fn clause(self) -> &'static str {
        match self {
            Self::Exact => " = ?1",
            Self::CaseInsensitive => " = ?1 COLLATE NOCASE",
            Self::StartsWith | Self::Substring => r" LIKE ?1 ESCAPE '\'",
        }
    }

    /// Value bound to `?1` for this match type.
    pub(crate) fn bind(self, value: &str) -> String {
        match self {
            Self::Exact | Self::CaseInsensitive => value.to_string(),
            Self::StartsWith => format!("{}%", escape_like(value)),
            Self::Substring => format!("%{}%", escape_like(value)),
        }
    }
}

impl FromStr for MatchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "caseinsensitive" | "insensitive" => Ok(Self::CaseInsensitive),
            "startswith" | "prefix" => Ok(Self::StartsWith),
            "substring" | "contains" => Ok(Self::Substring),
            _ => Err(format!("Unknown match type: {s}")),
        }
    }
}

fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// A value and how to match it, without a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMatch {
    pub match_type: MatchType,
    pub value: String,
}

impl RequestMatch {
    pub fn new(match_type: MatchType, value: impl Into<String>) -> Self {
        Self {
            match_type,
            value: value.into(),
        }
    }
}

/// A value matched against one specific field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageMatchFilter {
    pub field: PackageMatchField,
    pub match_type: MatchType,
    pub value: String,
}

impl PackageMatchFilter {
    pub fn new(field: PackageMatchField, match_type: MatchType, value: impl Into<String>) -> Self {
        Self {
            field,
            match_type,
            value: value.into(),
        }
    }
}

/// Search over the index.
///
/// A package is returned when it matches the query or any inclusion, and
/// every filter. With neither a query nor inclusions every package is a
/// candidate for the filters.
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub query: Option<RequestMatch>,
    pub inclusions: Vec<PackageMatchFilter>,
    pub filters: Vec<PackageMatchFilter>,
    /// Zero means unlimited.
    pub maximum_results: usize,
}

impl SearchRequest {
    /// Free-text search over the query fields.
    pub fn query(match_type: MatchType, value: impl Into<String>) -> Self {
        Self {
            query: Some(RequestMatch::new(match_type, value)),
            ..Self::default()
        }
    }

    pub fn with_filter(mut self, filter: PackageMatchFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_inclusion(mut self, inclusion: PackageMatchFilter) -> Self {
        self.inclusions.push(inclusion);
        self
    }

    pub fn with_maximum_results(mut self, maximum: usize) -> Self {
        self.maximum_results = maximum;
        self
    }

    pub(crate) fn is_unbounded(&self) -> bool {
        self.query.is_none() && self.inclusions.is_empty()
    }
}

/// One package found by a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchMatch {
    /// Schema-specific package key.
    pub package: i64,
    pub id: String,
    /// First field the package matched on, if the request had any.
    pub matched: Option<PackageMatchFilter>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResult {
    pub matches: Vec<SearchMatch>,
    /// More packages matched than `maximum_results` allowed.
    pub truncated: bool,
}
