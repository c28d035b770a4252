//! Manifest validation.
//!
//! Every rule is checked and every violation recorded; nothing here
//! short-circuits. Callers refuse a manifest when the report
//! [`has_errors`](ValidationReport::has_errors) and show warnings otherwise.

use std::collections::HashSet;

use pkgdex_schema::{
    Architecture, InstallerSwitchType, InstallerType, Manifest, ManifestError, ManifestInstaller,
    MAX_SUPPORTED_MANIFEST_MAJOR, Scope, UpdateBehavior, ValidationError, ValidationReport,
};
use tracing::debug;

/// Installer identity for duplicate detection.
#[derive(Debug, PartialEq, Eq, Hash)]
struct InstallerKey {
    installer_type: InstallerType,
    architecture: Architecture,
    locale: String,
    scope: Scope,
}

impl InstallerKey {
    fn of(installer: &ManifestInstaller) -> Self {
        Self {
            installer_type: installer.installer_type,
            architecture: installer.architecture,
            locale: installer.locale.to_lowercase(),
            scope: installer.scope,
        }
    }
}

/// Validate a manifest, collecting every problem.
pub fn validate_manifest(manifest: &Manifest) -> ValidationReport {
    let mut report = ValidationReport::new();

    if manifest.id.trim().is_empty() {
        report.push(ValidationError::field(
            ManifestError::RequiredFieldMissing,
            "PackageIdentifier",
        ));
    }

    if manifest.manifest_version.major() > MAX_SUPPORTED_MANIFEST_MAJOR {
        report.push(ValidationError::field_value(
            ManifestError::FieldValueNotSupported,
            "ManifestVersion",
            manifest.manifest_version.to_string(),
        ));
    }

    if !manifest.channel.is_empty() {
        report.push(
            ValidationError::field_value(
                ManifestError::FieldNotSupported,
                "Channel",
                &manifest.channel,
            )
            .warning(),
        );
    }

    if !manifest.parsed_version().is_well_formed() {
        report.push(ValidationError::field_value(
            ManifestError::InvalidFieldValue,
            "PackageVersion",
            &manifest.version,
        ));
    }

    if manifest.license.trim().is_empty() {
        report.push(ValidationError::field(
            ManifestError::RequiredFieldMissing,
            "License",
        ));
    }

    let mut seen = HashSet::new();
    let mut duplicate_reported = false;

    for installer in &manifest.installers {
        if !seen.insert(InstallerKey::of(installer)) && !duplicate_reported {
            report.push(ValidationError::new(ManifestError::DuplicateInstallerEntry));
            duplicate_reported = true;
        }
        validate_installer(installer, &mut report);
    }

    debug!(
        id = %manifest.id,
        version = %manifest.version,
        problems = report.errors().len(),
        "validated manifest"
    );

    report
}

fn validate_installer(installer: &ManifestInstaller, report: &mut ValidationReport) {
    let installer_type = installer.installer_type;

    if installer.architecture == Architecture::Unknown {
        report.push(ValidationError::field(
            ManifestError::InvalidFieldValue,
            "Architecture",
        ));
    }

    if installer_type == InstallerType::Unknown {
        report.push(ValidationError::field(
            ManifestError::InvalidFieldValue,
            "InstallerType",
        ));
    }

    if installer.update_behavior == UpdateBehavior::Unknown {
        report.push(ValidationError::field(
            ManifestError::InvalidFieldValue,
            "UpgradeBehavior",
        ));
    }

    if !installer.package_family_name.is_empty() && !installer_type.supports_package_family_name()
    {
        report.push(ValidationError::field_value(
            ManifestError::InstallerTypeDoesNotSupportPackageFamilyName,
            "InstallerType",
            installer_type.as_str(),
        ));
    }

    if !installer.product_code.is_empty() && !installer_type.supports_product_code() {
        report.push(ValidationError::field_value(
            ManifestError::InstallerTypeDoesNotSupportProductCode,
            "InstallerType",
            installer_type.as_str(),
        ));
    }

    if installer_type == InstallerType::MSStore {
        // Store installs are not available in this deployment.
        report.push(ValidationError::field_value(
            ManifestError::FieldValueNotSupported,
            "InstallerType",
            installer_type.as_str(),
        ));

        if installer.product_id.is_empty() {
            report.push(ValidationError::field(
                ManifestError::RequiredFieldMissing,
                "ProductId",
            ));
        }
    } else {
        if installer.url.is_empty() {
            report.push(ValidationError::field(
                ManifestError::RequiredFieldMissing,
                "InstallerUrl",
            ));
        }

        if installer.sha256.is_empty() {
            report.push(ValidationError::field(
                ManifestError::RequiredFieldMissing,
                "InstallerSha256",
            ));
        } else if !is_sha256(&installer.sha256) {
            report.push(ValidationError::field_value(
                ManifestError::InvalidFieldValue,
                "InstallerSha256",
                &installer.sha256,
            ));
        }

        if !installer.product_id.is_empty() {
            report.push(ValidationError::field_value(
                ManifestError::FieldNotSupported,
                "ProductId",
                &installer.product_id,
            ));
        }
    }

    if installer_type == InstallerType::Exe
        && !installer.has_switch(InstallerSwitchType::Silent)
        && !installer.has_switch(InstallerSwitchType::SilentWithProgress)
    {
        report.push(
            ValidationError::new(ManifestError::ExeInstallerMissingSilentSwitches).warning(),
        );
    }

    if !installer.url.is_empty() && url::Url::parse(&installer.url).is_err() {
        report.push(ValidationError::field_value(
            ManifestError::InvalidFieldValue,
            "InstallerUrl",
            &installer.url,
        ));
    }
}

fn is_sha256(s: &str) -> bool {
    s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit())
}
