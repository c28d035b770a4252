//! Ranking checks between two applicable installers.

use pkgdex_schema::{Architecture, InstallerType, ManifestInstaller, Scope};

use super::Options;
use super::locale;

/// Verdict of one comparison of `first` against `second`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preference {
    /// `first` is not better.
    Negative,
    /// `first` is better, but only as a tie-break.
    WeakPositive,
    /// `first` is better and this should dominate weak verdicts.
    StrongPositive,
}

pub trait InstallerComparison: std::fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn is_first_better(&self, first: &ManifestInstaller, second: &ManifestInstaller) -> Preference;
}

pub(crate) fn from_options(
    options: &Options,
    architectures: &[Architecture],
) -> Vec<Box<dyn InstallerComparison>> {
    let mut comparisons: Vec<Box<dyn InstallerComparison>> = vec![Box::new(ArchitectureComparison {
        preference: architectures.to_vec(),
    })];

    if let Some(installed) = options.currently_installed_type {
        comparisons.push(Box::new(InstalledTypeComparison { installed }));
    }
    if let Some(preferred) = options.requested_scope().or(options.installed_scope()) {
        comparisons.push(Box::new(ScopeComparison { preferred }));
    }
    comparisons.push(Box::new(LocaleComparison {
        requested: options.requested_installer_locale.clone(),
        previous_intent: options.previous_user_intent_locale.clone(),
    }));
    if let Some(market) = &options.current_market {
        comparisons.push(Box::new(MarketComparison {
            market: market.clone(),
        }));
    }
    comparisons
}

/// Earlier entries of the allowed list win.
#[derive(Debug)]
pub struct ArchitectureComparison {
    preference: Vec<Architecture>,
}

impl ArchitectureComparison {
    fn position(&self, arch: Architecture) -> usize {
        self.preference
            .iter()
            .position(|&a| a == arch)
            .unwrap_or(usize::MAX)
    }
}

impl InstallerComparison for ArchitectureComparison {
    fn name(&self) -> &'static str {
        "architecture"
    }

    fn is_first_better(&self, first: &ManifestInstaller, second: &ManifestInstaller) -> Preference {
        if self.position(first.architecture) < self.position(second.architecture) {
            Preference::StrongPositive
        } else {
            Preference::Negative
        }
    }
}

/// Same technology as the existing installation.
#[derive(Debug)]
pub struct InstalledTypeComparison {
    installed: InstallerType,
}

impl InstallerComparison for InstalledTypeComparison {
    fn name(&self) -> &'static str {
        "installed type"
    }

    fn is_first_better(&self, first: &ManifestInstaller, second: &ManifestInstaller) -> Preference {
        if first.installer_type == self.installed && second.installer_type != self.installed {
            Preference::WeakPositive
        } else {
            Preference::Negative
        }
    }
}

#[derive(Debug)]
pub struct ScopeComparison {
    preferred: Scope,
}

impl InstallerComparison for ScopeComparison {
    fn name(&self) -> &'static str {
        "scope"
    }

    fn is_first_better(&self, first: &ManifestInstaller, second: &ManifestInstaller) -> Preference {
        if first.scope == self.preferred && second.scope != self.preferred {
            Preference::StrongPositive
        } else {
            Preference::Negative
        }
    }
}

#[derive(Debug)]
pub struct LocaleComparison {
    requested: Vec<String>,
    previous_intent: Option<String>,
}

impl LocaleComparison {
    fn rank(&self, installer: &ManifestInstaller) -> u8 {
        locale::rank(
            &self.requested,
            self.previous_intent.as_deref(),
            &installer.locale,
        )
    }
}

impl InstallerComparison for LocaleComparison {
    fn name(&self) -> &'static str {
        "locale"
    }

    fn is_first_better(&self, first: &ManifestInstaller, second: &ManifestInstaller) -> Preference {
        if self.rank(first) > self.rank(second) {
            Preference::WeakPositive
        } else {
            Preference::Negative
        }
    }
}

/// An installer explicitly offered in the current market beats one that
/// merely isn't excluded.
#[derive(Debug)]
pub struct MarketComparison {
    market: String,
}

impl MarketComparison {
    fn explicitly_allowed(&self, installer: &ManifestInstaller) -> bool {
        installer
            .markets
            .allowed_markets
            .iter()
            .any(|m| m.eq_ignore_ascii_case(&self.market))
    }
}

impl InstallerComparison for MarketComparison {
    fn name(&self) -> &'static str {
        "market"
    }

    fn is_first_better(&self, first: &ManifestInstaller, second: &ManifestInstaller) -> Preference {
        if self.explicitly_allowed(first) && !self.explicitly_allowed(second) {
            Preference::WeakPositive
        } else {
            Preference::Negative
        }
    }
}
