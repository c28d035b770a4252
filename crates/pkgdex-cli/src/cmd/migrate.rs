//! Migrate command

use anyhow::{Context as _, Result};
use crossterm::style::Stylize;
use pkgdex_core::{OpenDisposition, SchemaVersion};

use super::Context;
use crate::ui::Theme;

/// Upgrade the index in place to `target`.
pub fn migrate(ctx: &Context, target: SchemaVersion) -> Result<()> {
    let mut index = ctx.open_index(OpenDisposition::ReadWrite)?;
    let from = index.schema_version();
    index
        .migrate_to(target, ctx.registry())
        .with_context(|| format!("Failed to migrate {}", index.path().display()))?;

    if !ctx.quiet {
        let theme = Theme::default();
        let action = if from == target { "already at" } else { "migrated to" };
        println!(
            "  {} {} {action} schema {target}",
            theme.icons.success.with(theme.colors.success),
            index.path().display(),
        );
    }
    Ok(())
}
