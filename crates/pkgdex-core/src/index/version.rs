//! On-disk schema version record.

use std::fmt;
use std::str::FromStr;

/// Major.minor version of an index schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaVersion {
    pub major: u32,
    pub minor: u32,
}

impl SchemaVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Version used when creating an index without asking for one.
    pub const DEFAULT: Self = Self::new(1, 7);
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for SchemaVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (major, minor) = s
            .split_once('.')
            .ok_or_else(|| format!("Expected MAJOR.MINOR, got '{s}'"))?;
        let major = major
            .trim()
            .parse()
            .map_err(|_| format!("Invalid major version in '{s}'"))?;
        let minor = minor
            .trim()
            .parse()
            .map_err(|_| format!("Invalid minor version in '{s}'"))?;
        Ok(Self { major, minor })
    }
}
