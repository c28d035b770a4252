//! Build command

use std::path::Path;

use anyhow::{Context as _, Result, bail};
use pkgdex_core::builder::{BuildOptions, build_index};
use pkgdex_core::{OpenDisposition, PackageIndex, Reporter, SchemaVersion};
use tracing::info;

use super::{Context, manifest_root};

/// Create the index if needed and index every manifest under the root.
pub fn build(
    ctx: &Context,
    root: Option<&Path>,
    schema: Option<SchemaVersion>,
    prune: bool,
) -> Result<()> {
    let root = manifest_root(root)?;
    if !root.is_dir() {
        bail!("Manifest root {} is not a directory", root.display());
    }

    let index_path = ctx.index_path()?;
    let mut index = if index_path.exists() {
        let index = ctx.open_index(OpenDisposition::ReadWrite)?;
        if let Some(requested) = schema.filter(|v| *v != index.schema_version()) {
            ctx.reporter().warning(&format!(
                "Index is at schema {}, ignoring --schema {requested}. \
                 Use 'pkgdex migrate' to upgrade.",
                index.schema_version()
            ));
        }
        index
    } else {
        let version = schema.unwrap_or(SchemaVersion::DEFAULT);
        info!(path = %index_path.display(), %version, "Creating index");
        PackageIndex::create_new(&index_path, version, ctx.registry())
            .with_context(|| format!("Failed to create index {}", index_path.display()))?
    };

    let reporter = ctx.reporter();
    let report = build_index(&mut index, &root, BuildOptions { prune }, &reporter)
        .context("Index build failed")?;

    if report.removed > 0 {
        reporter.info(&format!("Pruned {} manifest(s)", report.removed));
    }
    if !report.skipped.is_empty() {
        reporter.warning(&format!("Skipped {} manifest file(s)", report.skipped.len()));
    }
    Ok(())
}
