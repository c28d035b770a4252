//! Installer technology, scope and behaviour enums.
//!
//! Manifest values are parsed leniently: anything unrecognised becomes the
//! `Unknown` variant so the validator can report it instead of the parser
//! rejecting the whole document.

use std::fmt;

/// Implements string (de)serialization through `as_str` and `From<String>`.
macro_rules! lenient_string_enum {
    ($ty:ty) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl serde::Serialize for $ty {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Ok(Self::from(s.as_str()))
            }
        }

        impl From<String> for $ty {
            fn from(s: String) -> Self {
                Self::from(s.as_str())
            }
        }
    };
}

/// Installer technology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum InstallerType {
    /// Generic executable installer.
    Exe,
    /// Inno Setup installer.
    Inno,
    /// Nullsoft (NSIS) installer.
    Nullsoft,
    /// Windows Installer package.
    Msi,
    /// WiX-authored Windows Installer package.
    Wix,
    /// MSIX / APPX package.
    Msix,
    /// Microsoft Store product.
    MSStore,
    /// Plain zip archive.
    Zip,
    /// WiX Burn bundle.
    Burn,
    /// Missing or unrecognised value.
    #[default]
    Unknown,
}

/// Interchangeable groups of installer technologies.
///
/// The groups are disjoint; `Zip` and `Unknown` belong to none.
const COMPATIBILITY_SETS: &[&[InstallerType]] = &[
    &[
        InstallerType::Inno,
        InstallerType::Nullsoft,
        InstallerType::Exe,
        InstallerType::Burn,
    ],
    &[InstallerType::Wix, InstallerType::Msi],
    &[InstallerType::Msix, InstallerType::MSStore],
];

impl InstallerType {
    /// Convert to the manifest string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exe => "exe",
            Self::Inno => "inno",
            Self::Nullsoft => "nullsoft",
            Self::Msi => "msi",
            Self::Wix => "wix",
            Self::Msix => "msix",
            Self::MSStore => "msstore",
            Self::Zip => "zip",
            Self::Burn => "burn",
            Self::Unknown => "unknown",
        }
    }

    /// Whether a `ProductCode` may be declared for this installer type.
    pub fn supports_product_code(self) -> bool {
        matches!(
            self,
            Self::Exe | Self::Inno | Self::Msi | Self::Nullsoft | Self::Wix | Self::Burn
        )
    }

    /// Whether a `PackageFamilyName` may be declared for this installer type.
    pub fn supports_package_family_name(self) -> bool {
        matches!(self, Self::Msix | Self::MSStore)
    }

    /// The compatibility set this type belongs to, if any.
    pub fn compatibility_set(self) -> Option<&'static [InstallerType]> {
        COMPATIBILITY_SETS
            .iter()
            .copied()
            .find(|set| set.contains(&self))
    }
}

impl From<&str> for InstallerType {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "exe" => Self::Exe,
            "inno" => Self::Inno,
            "nullsoft" => Self::Nullsoft,
            "msi" => Self::Msi,
            "wix" => Self::Wix,
            "msix" | "appx" => Self::Msix,
            "msstore" => Self::MSStore,
            "zip" => Self::Zip,
            "burn" => Self::Burn,
            _ => Self::Unknown,
        }
    }
}

lenient_string_enum!(InstallerType);

/// Whether two installer types are interchangeable when matching an
/// already-installed package.
///
/// True when the types are identical or share a compatibility set.
/// `Unknown` is compatible with nothing, itself included.
///
/// # Example
///
/// ```
/// use pkgdex_schema::{InstallerType, is_installer_type_compatible};
///
/// assert!(is_installer_type_compatible(InstallerType::Msi, InstallerType::Wix));
/// assert!(!is_installer_type_compatible(InstallerType::Msi, InstallerType::Msix));
/// ```
pub fn is_installer_type_compatible(a: InstallerType, b: InstallerType) -> bool {
    if a == InstallerType::Unknown || b == InstallerType::Unknown {
        return false;
    }
    if a == b {
        return true;
    }
    a.compatibility_set().is_some_and(|set| set.contains(&b))
}

/// Install scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Scope {
    /// Installed for the current user only.
    User,
    /// Installed for all users of the machine.
    Machine,
    /// Not declared.
    #[default]
    Unknown,
}

impl Scope {
    /// Convert to the manifest string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Machine => "machine",
            Self::Unknown => "unknown",
        }
    }
}

impl From<&str> for Scope {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "user" => Self::User,
            "machine" => Self::Machine,
            _ => Self::Unknown,
        }
    }
}

lenient_string_enum!(Scope);

/// What to do with an existing installation when upgrading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UpdateBehavior {
    /// Install the new version over the old one.
    #[default]
    Install,
    /// Uninstall the previous version first.
    UninstallPrevious,
    /// Unrecognised value.
    Unknown,
}

impl UpdateBehavior {
    /// Convert to the manifest string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::UninstallPrevious => "uninstallPrevious",
            Self::Unknown => "unknown",
        }
    }
}

impl From<&str> for UpdateBehavior {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "install" => Self::Install,
            "uninstallprevious" => Self::UninstallPrevious,
            _ => Self::Unknown,
        }
    }
}

lenient_string_enum!(UpdateBehavior);

/// Kinds of installer command line switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InstallerSwitchType {
    /// Fully silent install.
    Silent,
    /// Silent install that still shows progress.
    SilentWithProgress,
    /// Interactive install.
    Interactive,
    /// Switch taking the install location.
    InstallLocation,
    /// Switch taking the log file path.
    Log,
    /// Switch used when upgrading.
    Upgrade,
    /// Extra switches always appended.
    Custom,
    /// Unrecognised switch name.
    Unknown,
}

impl InstallerSwitchType {
    /// Convert to the manifest key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Silent => "Silent",
            Self::SilentWithProgress => "SilentWithProgress",
            Self::Interactive => "Interactive",
            Self::InstallLocation => "InstallLocation",
            Self::Log => "Log",
            Self::Upgrade => "Upgrade",
            Self::Custom => "Custom",
            Self::Unknown => "Unknown",
        }
    }
}

impl From<&str> for InstallerSwitchType {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "silent" => Self::Silent,
            "silentwithprogress" => Self::SilentWithProgress,
            "interactive" => Self::Interactive,
            "installlocation" => Self::InstallLocation,
            "log" => Self::Log,
            "upgrade" => Self::Upgrade,
            "custom" => Self::Custom,
            _ => Self::Unknown,
        }
    }
}

lenient_string_enum!(InstallerSwitchType);
