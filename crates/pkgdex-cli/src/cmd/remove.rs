//! Remove command

use anyhow::{Context as _, Result};
use crossterm::style::Stylize;
use pkgdex_core::OpenDisposition;

use super::Context;
use crate::ui::Theme;

/// Remove one manifest from the index.
pub fn remove(ctx: &Context, id: &str, version: &str, channel: &str) -> Result<()> {
    let mut index = ctx.open_index(OpenDisposition::ReadWrite)?;
    index
        .remove_manifest(id, version, channel)
        .with_context(|| format!("Failed to remove {id} {version}"))?;

    if !ctx.quiet {
        let theme = Theme::default();
        println!(
            "  {} {} {} removed",
            theme.icons.success.with(theme.colors.success),
            id.with(theme.colors.package_name),
            version.with(theme.colors.version),
        );
    }
    Ok(())
}
