//! Shared data model for pkgdex.
//!
//! This crate holds the leaf types every other pkgdex crate agrees on:
//! versions, manifests, installers and the validation error vocabulary.
//! It performs no I/O.

pub mod arch;
pub mod installer;
pub mod manifest;
pub mod validation;
pub mod version;

// Re-exports
pub use arch::*;
pub use installer::*;
pub use manifest::{
    AppsAndFeaturesEntry, Dependencies, Localization, Manifest, ManifestInstaller, Markets,
    PackageDependency,
};
pub use validation::{ManifestError, Severity, ValidationError, ValidationReport};
pub use version::{ManifestVer, Version, VersionPart};

/// Newest manifest schema major version this build understands.
pub const MAX_SUPPORTED_MANIFEST_MAJOR: u64 = 1;
