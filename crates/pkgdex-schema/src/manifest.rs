//! In-memory package manifest.
//!
//! Field names follow the upstream YAML manifest format (PascalCase keys),
//! so a manifest document deserializes straight into [`Manifest`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::arch::Architecture;
use crate::installer::{InstallerSwitchType, InstallerType, Scope, UpdateBehavior};
use crate::version::{ManifestVer, Version};

/// One version of one package, with all of its installers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Manifest {
    /// Package identifier, e.g. `Contoso.Editor`.
    #[serde(rename = "PackageIdentifier")]
    pub id: String,
    /// Package version string.
    #[serde(rename = "PackageVersion", deserialize_with = "scalar_text::deserialize")]
    pub version: String,
    /// Release channel. Not supported yet; must stay empty.
    #[serde(default)]
    pub channel: String,
    /// Short alias used for search.
    #[serde(default)]
    pub moniker: String,
    /// Manifest schema version.
    #[serde(
        default,
        rename = "ManifestVersion",
        with = "manifest_ver_serde"
    )]
    pub manifest_version: ManifestVer,
    /// Locale of the root-level (default) localization.
    #[serde(default)]
    pub package_locale: String,
    /// Publisher display name.
    #[serde(default)]
    pub publisher: String,
    /// Package display name.
    #[serde(default)]
    pub package_name: String,
    /// License name. Required.
    #[serde(default)]
    pub license: String,
    /// License URL.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub license_url: String,
    /// One line description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub short_description: String,
    /// Project homepage.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub homepage: String,
    /// Search tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Per-locale overrides of the default localization.
    #[serde(default, rename = "Localization", skip_serializing_if = "Vec::is_empty")]
    pub localizations: Vec<Localization>,
    /// Commands the package puts on the path.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<String>,
    /// Other packages this one requires.
    #[serde(default)]
    pub dependencies: Dependencies,
    /// Installer variants of this version.
    #[serde(default)]
    pub installers: Vec<ManifestInstaller>,
}

impl Manifest {
    /// Parsed package version.
    pub fn parsed_version(&self) -> Version {
        Version::parse(&self.version)
    }

    /// The root-level metadata as a [`Localization`].
    pub fn default_localization(&self) -> Localization {
        Localization {
            package_locale: self.package_locale.clone(),
            publisher: self.publisher.clone(),
            package_name: self.package_name.clone(),
            license: self.license.clone(),
            license_url: self.license_url.clone(),
            short_description: self.short_description.clone(),
            homepage: self.homepage.clone(),
            tags: self.tags.clone(),
        }
    }

    /// Localization for `locale`, falling back to the root-level one.
    pub fn localization(&self, locale: &str) -> Localization {
        self.localizations
            .iter()
            .find(|l| l.package_locale.eq_ignore_ascii_case(locale))
            .cloned()
            .unwrap_or_else(|| self.default_localization())
    }
}

/// (De)serializes [`ManifestVer`] as its string form, failing fast on a
/// malformed value.
mod manifest_ver_serde {
    use serde::{Deserializer, Serializer};

    use crate::version::ManifestVer;

    pub(super) fn serialize<S: Serializer>(v: &ManifestVer, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&v.to_string())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<ManifestVer, D::Error> {
        let raw = super::scalar_text::deserialize(d)?;
        ManifestVer::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Version-like fields that YAML may hand over as numbers when unquoted,
/// e.g. `PackageVersion: 1.0`. Plain scalars keep their text where the
/// format offers it.
mod scalar_text {
    use std::fmt;

    use serde::Deserializer;
    use serde::de::{self, Visitor};

    struct ScalarText;

    impl Visitor<'_> for ScalarText {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string or number")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }

        // Debug keeps the trailing `.0` of whole floats.
        fn visit_f64<E: de::Error>(self, v: f64) -> Result<String, E> {
            Ok(format!("{v:?}"))
        }
    }

    struct OptionalScalarText;

    impl<'de> Visitor<'de> for OptionalScalarText {
        type Value = Option<String>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an optional string or number")
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
            deserialize(d).map(Some)
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        d.deserialize_str(ScalarText)
    }

    pub(super) fn deserialize_option<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<String>, D::Error> {
        d.deserialize_option(OptionalScalarText)
    }
}

/// Locale-specific package metadata.
///
/// The root of a manifest carries the same fields as its default
/// localization; [`Manifest::localizations`] holds per-locale overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Localization {
    /// BCP-47 locale of this block.
    #[serde(default)]
    pub package_locale: String,
    /// Publisher display name.
    #[serde(default)]
    pub publisher: String,
    /// Package display name.
    #[serde(default)]
    pub package_name: String,
    /// License name. Required in the default localization.
    #[serde(default)]
    pub license: String,
    /// License URL.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub license_url: String,
    /// One line description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub short_description: String,
    /// Project homepage.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub homepage: String,
    /// Search tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Packages a manifest depends on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Dependencies {
    /// Dependencies on other packages.
    #[serde(default)]
    pub package_dependencies: Vec<PackageDependency>,
}

impl Dependencies {
    /// True when nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.package_dependencies.is_empty()
    }
}

/// A dependency on another package, optionally with a minimum version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PackageDependency {
    /// Identifier of the required package.
    pub package_identifier: String,
    /// Lowest acceptable version.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "scalar_text::deserialize_option"
    )]
    pub minimum_version: Option<String>,
}

/// Market restrictions of an installer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Markets {
    /// If non-empty, the installer may only be used in these markets.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_markets: Vec<String>,
    /// The installer may not be used in these markets.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_markets: Vec<String>,
}

impl Markets {
    /// True when neither list restricts anything.
    pub fn is_empty(&self) -> bool {
        self.allowed_markets.is_empty() && self.excluded_markets.is_empty()
    }
}

/// What an installer writes to the Add/Remove Programs registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AppsAndFeaturesEntry {
    /// Display name shown in Add/Remove Programs.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    /// Publisher shown in Add/Remove Programs.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub publisher: String,
    /// Version shown in Add/Remove Programs.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_version: String,
    /// Product code of the entry.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub product_code: String,
    /// Upgrade code of the entry.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub upgrade_code: String,
}

/// One downloadable installer of a manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ManifestInstaller {
    /// Target architecture.
    #[serde(default)]
    pub architecture: Architecture,
    /// Installer technology.
    #[serde(default)]
    pub installer_type: InstallerType,
    /// Install scope, [`Scope::Unknown`] when not declared.
    #[serde(default)]
    pub scope: Scope,
    /// Installer UI locale.
    #[serde(default, rename = "InstallerLocale")]
    pub locale: String,
    /// Download URL.
    #[serde(default, rename = "InstallerUrl")]
    pub url: String,
    /// SHA-256 of the downloaded file.
    #[serde(default, rename = "InstallerSha256")]
    pub sha256: String,
    /// SHA-256 of the MSIX signature.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub signature_sha256: String,
    /// Store product id, only for MSStore installers.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub product_id: String,
    /// Windows Installer product code.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub product_code: String,
    /// MSIX package family name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub package_family_name: String,
    /// Command line switches by kind.
    #[serde(default, rename = "InstallerSwitches", skip_serializing_if = "BTreeMap::is_empty")]
    pub switches: BTreeMap<InstallerSwitchType, String>,
    /// Exit codes besides 0 that mean success.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub installer_success_codes: Vec<i64>,
    /// Upgrade behaviour.
    #[serde(default, rename = "UpgradeBehavior")]
    pub update_behavior: UpdateBehavior,
    /// Market restrictions.
    #[serde(default, skip_serializing_if = "Markets::is_empty")]
    pub markets: Markets,
    /// Add/Remove Programs entries written by this installer.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub apps_and_features_entries: Vec<AppsAndFeaturesEntry>,
}

impl ManifestInstaller {
    /// Whether a switch of the given kind is declared and non-empty.
    pub fn has_switch(&self, kind: InstallerSwitchType) -> bool {
        self.switches.get(&kind).is_some_and(|s| !s.is_empty())
    }
}
