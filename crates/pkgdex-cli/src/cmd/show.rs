//! Show command

use anyhow::{Result, bail};
use crossterm::style::Stylize;
use pkgdex_core::index::{ManifestProperty, PackageMatchField, Result as IndexResult};
use pkgdex_core::{IndexError, OpenDisposition};

use super::Context;
use crate::ui::table::version_table;

const LABEL_WIDTH: usize = 14;

/// `Ok(None)` when the index schema does not record this data.
fn optional<T>(result: IndexResult<T>) -> IndexResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(IndexError::NotSupportedBySchema { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Show the versions of a package and the details of one of them.
pub fn show(ctx: &Context, id: &str, version: Option<&str>, channel: &str) -> Result<()> {
    let index = ctx.open_index(OpenDisposition::ReadOnly)?;

    let versions = index.get_versions(id)?;
    if versions.is_empty() {
        bail!("Package '{id}' not found");
    }

    let selected = match version {
        Some(v) => match index.get_manifest_id_by_version(id, v, channel)? {
            Some(rowid) => rowid,
            None => bail!("Package '{id}' has no version {v}"),
        },
        None => versions[0].manifest,
    };

    let property = |p| index.get_property(selected, p);
    let shown_version = property(ManifestProperty::Version)?.unwrap_or_default();

    println!();
    println!("  {} {}", id.white().bold(), shown_version.as_str().dark_grey());
    if let Some(name) = property(ManifestProperty::Name)? {
        println!("  {name}");
    }
    println!();

    let details = [
        ("publisher", ManifestProperty::Publisher),
        ("moniker", ManifestProperty::Moniker),
        ("channel", ManifestProperty::Channel),
        ("path", ManifestProperty::RelativePath),
        ("hash", ManifestProperty::ManifestHash),
        ("arp min", ManifestProperty::ArpMinVersion),
        ("arp max", ManifestProperty::ArpMaxVersion),
        ("indexed", ManifestProperty::IndexedAt),
    ];
    for (label, prop) in details {
        if let Some(value) = property(prop)?.filter(|v| !v.is_empty()) {
            println!("  {label:<LABEL_WIDTH$}{value}");
        }
    }

    let lists = [
        ("tags", PackageMatchField::Tag),
        ("commands", PackageMatchField::Command),
        ("product codes", PackageMatchField::ProductCode),
        ("upgrade codes", PackageMatchField::UpgradeCode),
        ("family names", PackageMatchField::PackageFamilyName),
    ];
    for (label, field) in lists {
        let values = index.get_multi_property(selected, field)?;
        if !values.is_empty() {
            println!("  {label:<LABEL_WIDTH$}{}", values.join(", "));
        }
    }

    let dependencies = optional(index.dependencies_for(selected))?;
    if let Some(dependencies) = dependencies.filter(|d| !d.is_empty()) {
        let listed: Vec<String> = dependencies
            .iter()
            .map(|d| match &d.minimum_version {
                Some(min) => format!("{} >= {min}", d.package_identifier),
                None => d.package_identifier.clone(),
            })
            .collect();
        println!("  {:<LABEL_WIDTH$}{}", "requires", listed.join(", "));
    }

    if let Some(installers) = optional(index.installers_for(selected))? {
        for installer in installers {
            let mut parts = vec![installer.architecture, installer.installer_type];
            parts.extend(
                [installer.scope, installer.locale]
                    .into_iter()
                    .filter(|v| !v.is_empty()),
            );
            println!("  {:<LABEL_WIDTH$}{}", "installer", parts.join(" "));
        }
    }

    let mut rows = Vec::with_capacity(versions.len());
    for key in &versions {
        let name = index
            .get_property(key.manifest, ManifestProperty::Name)?
            .unwrap_or_default();
        rows.push((key.version.clone(), key.channel.clone(), name));
    }
    println!();
    println!("{}", version_table(&rows));
    Ok(())
}
