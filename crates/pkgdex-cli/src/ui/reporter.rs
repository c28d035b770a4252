//! Console implementation of the core [`Reporter`].

use std::path::Path;

use crossterm::style::Stylize;
use pkgdex_core::Reporter;

use super::theme::Theme;

/// Writes build progress to the terminal. In quiet mode only warnings,
/// errors and the final summary are shown.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter {
    theme: Theme,
    quiet: bool,
}

impl ConsoleReporter {
    pub fn new(quiet: bool) -> Self {
        Self {
            theme: Theme::default(),
            quiet,
        }
    }
}

impl Reporter for ConsoleReporter {
    fn section(&self, title: &str) {
        if !self.quiet {
            println!();
            println!("{}", title.to_uppercase().with(self.theme.colors.header).bold());
        }
    }

    fn indexed(&self, id: &str, version: &str, updated: bool) {
        if self.quiet {
            return;
        }
        let action = if updated { "updated" } else { "added" };
        let id_part = format!("{id:<width$}", width = self.theme.id_width);
        println!(
            "  {} {} {} {}",
            self.theme.icons.success.with(self.theme.colors.success),
            id_part.with(self.theme.colors.package_name),
            version.with(self.theme.colors.version),
            action.with(self.theme.colors.secondary),
        );
    }

    fn skipped(&self, path: &Path, reason: &str) {
        eprintln!(
            "  {} {}",
            self.theme.icons.skipped.with(self.theme.colors.warning),
            path.display().to_string().with(self.theme.colors.secondary),
        );
        for line in reason.lines() {
            eprintln!("      {line}");
        }
    }

    fn info(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", self.theme.icons.info.with(self.theme.colors.header));
        }
    }

    fn warning(&self, msg: &str) {
        eprintln!("  {} {msg}", self.theme.icons.warning.with(self.theme.colors.warning));
    }

    fn error(&self, msg: &str) {
        eprintln!("  {} {msg}", self.theme.icons.error.with(self.theme.colors.error));
    }

    fn summary(&self, count: usize, action: &str, elapsed_secs: f64) {
        println!();
        println!(
            "{} {count} {action}, elapsed {elapsed_secs:.2}s",
            "DONE".with(self.theme.colors.success).bold()
        );
    }
}
