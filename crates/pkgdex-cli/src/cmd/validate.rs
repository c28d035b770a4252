//! Validate command

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Result, bail};
use crossterm::style::Stylize;
use pkgdex_core::loader::{find_manifest_files, load_manifest};
use pkgdex_core::validate_manifest;
use pkgdex_schema::Severity;

use super::Context;
use crate::ui::Theme;

fn expand(paths: &[PathBuf]) -> Vec<PathBuf> {
    paths
        .iter()
        .flat_map(|p| {
            if p.is_dir() {
                find_manifest_files(p)
            } else {
                vec![p.clone()]
            }
        })
        .collect()
}

/// Validate manifest files. Fails when any file has an Error-severity
/// problem or cannot be parsed.
pub fn validate(ctx: &Context, paths: &[PathBuf]) -> Result<()> {
    let start = Instant::now();
    let theme = Theme::default();
    let files = expand(paths);
    let mut failed = 0usize;

    for path in &files {
        if !check_file(ctx, &theme, path) {
            failed += 1;
        }
    }

    println!();
    println!(
        "VALIDATED {}, {failed} failed, elapsed {:.2}s",
        files.len(),
        start.elapsed().as_secs_f64()
    );

    if failed > 0 {
        bail!("{failed} manifest(s) failed validation");
    }
    Ok(())
}

fn check_file(ctx: &Context, theme: &Theme, path: &Path) -> bool {
    let manifest = match load_manifest(path) {
        Ok(manifest) => manifest,
        Err(e) => {
            println!("  {} {e}", theme.icons.error.with(theme.colors.error));
            return false;
        }
    };

    let report = validate_manifest(&manifest);
    let ok = !report.has_errors();
    if ok && report.is_empty() {
        if !ctx.quiet {
            println!(
                "  {} {}",
                theme.icons.success.with(theme.colors.success),
                path.display()
            );
        }
        return true;
    }

    let icon = if ok {
        theme.icons.warning.with(theme.colors.warning)
    } else {
        theme.icons.error.with(theme.colors.error)
    };
    println!("  {icon} {}", path.display());
    for problem in report.errors() {
        let severity = match problem.severity {
            Severity::Error => problem.severity.to_string().with(theme.colors.error),
            Severity::Warning => problem.severity.to_string().with(theme.colors.warning),
        };
        println!("      {severity} {problem}");
    }
    ok
}
