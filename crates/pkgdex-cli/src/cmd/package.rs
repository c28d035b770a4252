//! Package command

use anyhow::{Context as _, Result, bail};
use crossterm::style::Stylize;
use pkgdex_core::OpenDisposition;

use super::Context;
use crate::ui::Theme;

/// Strip build-only data and freeze the index for distribution.
pub fn package(ctx: &Context, vacuum: bool) -> Result<()> {
    let mut index = ctx.open_index(OpenDisposition::ReadWrite)?;
    if !index.check_consistency(true)? {
        bail!("Refusing to package an inconsistent index");
    }
    index
        .prepare_for_packaging(vacuum)
        .context("Failed to prepare index for packaging")?;

    if !ctx.quiet {
        let theme = Theme::default();
        println!(
            "  {} {} packaged at schema {}",
            theme.icons.success.with(theme.colors.success),
            index.path().display(),
            index.schema_version()
        );
    }
    Ok(())
}
