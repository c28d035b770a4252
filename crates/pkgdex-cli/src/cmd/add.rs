//! Add and update commands

use std::path::Path;

use anyhow::{Context as _, Result, bail};
use crossterm::style::Stylize;
use pkgdex_core::OpenDisposition;
use pkgdex_core::loader::{load_manifest, relative_path};
use pkgdex_core::validate_manifest;
use pkgdex_schema::Manifest;

use super::{Context, manifest_root};
use crate::ui::Theme;

/// Load and validate a manifest, and work out its path inside the tree.
fn prepare(manifest: &Path, root: Option<&Path>) -> Result<(Manifest, Option<String>)> {
    let loaded = load_manifest(manifest)?;
    let report = validate_manifest(&loaded);
    if report.has_errors() {
        bail!(
            "Manifest {} failed validation:\n{}",
            manifest.display(),
            report.to_string().trim_end()
        );
    }

    let root = manifest_root(root)?;
    let absolute = std::path::absolute(manifest)
        .with_context(|| format!("Failed to resolve {}", manifest.display()))?;
    let root = std::path::absolute(&root).unwrap_or(root);
    Ok((loaded, relative_path(&root, &absolute)))
}

/// Add one manifest to the index.
pub fn add(ctx: &Context, manifest: &Path, root: Option<&Path>) -> Result<()> {
    let (loaded, relative) = prepare(manifest, root)?;
    let mut index = ctx.open_index(OpenDisposition::Create)?;
    index
        .add_manifest(&loaded, relative.as_deref())
        .with_context(|| format!("Failed to add {}", manifest.display()))?;

    if !ctx.quiet {
        let theme = Theme::default();
        println!(
            "  {} {} {} added",
            theme.icons.success.with(theme.colors.success),
            loaded.id.as_str().with(theme.colors.package_name),
            loaded.version.as_str().with(theme.colors.version),
        );
    }
    Ok(())
}

/// Replace the indexed copy of one manifest.
pub fn update(ctx: &Context, manifest: &Path, root: Option<&Path>) -> Result<()> {
    let (loaded, relative) = prepare(manifest, root)?;
    let mut index = ctx.open_index(OpenDisposition::ReadWrite)?;
    let changed = index
        .update_manifest(&loaded, relative.as_deref())
        .with_context(|| format!("Failed to update {}", manifest.display()))?;

    if !ctx.quiet {
        let theme = Theme::default();
        let status = if changed { "updated" } else { "unchanged" };
        println!(
            "  {} {} {} {status}",
            theme.icons.success.with(theme.colors.success),
            loaded.id.as_str().with(theme.colors.package_name),
            loaded.version.as_str().with(theme.colors.version),
        );
    }
    Ok(())
}
