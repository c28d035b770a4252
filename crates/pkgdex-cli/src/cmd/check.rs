//! Check command

use anyhow::{Result, bail};
use crossterm::style::Stylize;
use pkgdex_core::OpenDisposition;

use super::Context;
use crate::ui::Theme;

/// Print what the index is and verify its referential integrity.
pub fn check(ctx: &Context) -> Result<()> {
    let index = ctx.open_index(OpenDisposition::ReadOnly)?;
    let theme = Theme::default();
    let lw = 12;

    if !ctx.quiet {
        let written = index.last_write_time()?.map_or_else(
            || "unknown".to_string(),
            |t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        );
        println!();
        println!("  {:<lw$}{}", "index", index.path().display());
        println!("  {:<lw$}{}", "schema", index.schema_version());
        if index.schema().version() != index.schema_version() {
            println!("  {:<lw$}{}", "read as", index.schema().version());
        }
        println!("  {:<lw$}{}", "packaged", if index.is_packaged() { "yes" } else { "no" });
        println!("  {:<lw$}{written}", "written");
        println!();
    }

    if !index.check_consistency(true)? {
        println!(
            "  {} Index is inconsistent",
            theme.icons.error.with(theme.colors.error)
        );
        bail!("Consistency check failed for {}", index.path().display());
    }

    println!(
        "  {} Index is consistent",
        theme.icons.success.with(theme.colors.success)
    );
    Ok(())
}
