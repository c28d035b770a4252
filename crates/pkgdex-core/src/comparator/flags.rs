use std::collections::BTreeSet;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Why an installer was rejected by a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Inapplicability {
    MachineArchitecture,
    InstallerType,
    InstalledType,
    Scope,
    InstalledScope,
    Locale,
    InstalledLocale,
    Market,
}

impl Inapplicability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MachineArchitecture => "MachineArchitecture",
            Self::InstallerType => "InstallerType",
            Self::InstalledType => "InstalledType",
            Self::Scope => "Scope",
            Self::InstalledScope => "InstalledScope",
            Self::Locale => "Locale",
            Self::InstalledLocale => "InstalledLocale",
            Self::Market => "Market",
        }
    }
}

impl fmt::Display for Inapplicability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of rejection reasons. Empty means applicable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InapplicabilityFlags(BTreeSet<Inapplicability>);

impl InapplicabilityFlags {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, flag: Inapplicability) -> bool {
        self.0.contains(&flag)
    }

    pub fn insert(&mut self, flag: Inapplicability) {
        self.0.insert(flag);
    }

    pub fn iter(&self) -> impl Iterator<Item = Inapplicability> + '_ {
        self.0.iter().copied()
    }
}

impl From<Inapplicability> for InapplicabilityFlags {
    fn from(flag: Inapplicability) -> Self {
        Self(BTreeSet::from([flag]))
    }
}

impl FromIterator<Inapplicability> for InapplicabilityFlags {
    fn from_iter<I: IntoIterator<Item = Inapplicability>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl BitOr for InapplicabilityFlags {
    type Output = Self;

    fn bitor(mut self, rhs: Self) -> Self {
        self |= rhs;
        self
    }
}

impl BitOr<Inapplicability> for InapplicabilityFlags {
    type Output = Self;

    fn bitor(mut self, rhs: Inapplicability) -> Self {
        self.insert(rhs);
        self
    }
}

impl BitOrAssign for InapplicabilityFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0.extend(rhs.0);
    }
}

impl fmt::Display for InapplicabilityFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("None");
        }
        let names: Vec<&str> = self.0.iter().map(Inapplicability::as_str).collect();
        f.write_str(&names.join("|"))
    }
}
