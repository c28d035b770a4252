//! Applicability checks. Each one either accepts an installer or names the
//! reasons it cannot be used.

use pkgdex_schema::{
    Architecture, InstallerType, ManifestInstaller, Scope, is_installer_type_compatible,
};

use super::flags::{Inapplicability, InapplicabilityFlags};
use super::locale;
use super::Options;

pub trait InstallerFilter: std::fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn is_applicable(&self, installer: &ManifestInstaller) -> InapplicabilityFlags;

    /// Human readable reason for a rejection by this filter.
    fn explain_inapplicable(&self, installer: &ManifestInstaller) -> String;
}

/// Build the filters the options ask for, in evaluation order.
pub(crate) fn from_options(
    options: &Options,
    architectures: &[Architecture],
) -> Vec<Box<dyn InstallerFilter>> {
    let mut filters: Vec<Box<dyn InstallerFilter>> = vec![Box::new(ArchitectureFilter {
        allowed: architectures.to_vec(),
    })];

    if options.requested_installer_type.is_some() || options.currently_installed_type.is_some() {
        filters.push(Box::new(InstallerTypeFilter {
            requested: options.requested_installer_type,
            installed: options.currently_installed_type,
        }));
    }
    if options.requested_scope().is_some() || options.installed_scope().is_some() {
        filters.push(Box::new(ScopeFilter {
            requested: options.requested_scope(),
            allow_unknown: options.allow_unknown_scope,
            installed: options.installed_scope(),
        }));
    }
    if !options.requested_installer_locale.is_empty()
        || options.currently_installed_locale.is_some()
    {
        filters.push(Box::new(LocaleFilter {
            requested: options.requested_installer_locale.clone(),
            installed: options.currently_installed_locale.clone(),
        }));
    }
    if let Some(market) = &options.current_market {
        filters.push(Box::new(MarketFilter {
            market: market.clone(),
        }));
    }
    filters
}

#[derive(Debug)]
pub struct ArchitectureFilter {
    allowed: Vec<Architecture>,
}

impl InstallerFilter for ArchitectureFilter {
    fn name(&self) -> &'static str {
        "architecture"
    }

    fn is_applicable(&self, installer: &ManifestInstaller) -> InapplicabilityFlags {
        if self.allowed.contains(&installer.architecture) {
            InapplicabilityFlags::none()
        } else {
            Inapplicability::MachineArchitecture.into()
        }
    }

    fn explain_inapplicable(&self, installer: &ManifestInstaller) -> String {
        let allowed: Vec<&str> = self.allowed.iter().map(Architecture::as_str).collect();
        format!(
            "Architecture {} is not one of [{}]",
            installer.architecture,
            allowed.join(", ")
        )
    }
}

#[derive(Debug)]
pub struct InstallerTypeFilter {
    requested: Option<InstallerType>,
    installed: Option<InstallerType>,
}

impl InstallerFilter for InstallerTypeFilter {
    fn name(&self) -> &'static str {
        "installer type"
    }

    fn is_applicable(&self, installer: &ManifestInstaller) -> InapplicabilityFlags {
        let mut flags = InapplicabilityFlags::none();
        if self
            .requested
            .is_some_and(|requested| requested != installer.installer_type)
        {
            flags.insert(Inapplicability::InstallerType);
        }
        if self.installed.is_some_and(|installed| {
            !is_installer_type_compatible(installed, installer.installer_type)
        }) {
            flags.insert(Inapplicability::InstalledType);
        }
        flags
    }

    fn explain_inapplicable(&self, installer: &ManifestInstaller) -> String {
        match (self.requested, self.installed) {
            (Some(requested), _) if requested != installer.installer_type => format!(
                "Installer type {} does not match requested type {requested}",
                installer.installer_type
            ),
            (_, Some(installed)) => format!(
                "Installer type {} cannot upgrade an installation made by {installed}",
                installer.installer_type
            ),
            _ => format!("Installer type {} is not applicable", installer.installer_type),
        }
    }
}

/// A requested scope takes priority; the installed scope only constrains
/// when nothing was requested, and then tolerates undeclared scopes.
#[derive(Debug)]
pub struct ScopeFilter {
    requested: Option<Scope>,
    allow_unknown: bool,
    installed: Option<Scope>,
}

impl InstallerFilter for ScopeFilter {
    fn name(&self) -> &'static str {
        "scope"
    }

    fn is_applicable(&self, installer: &ManifestInstaller) -> InapplicabilityFlags {
        match (self.requested, self.installed) {
            (Some(requested), _) => {
                let ok = installer.scope == requested
                    || (installer.scope == Scope::Unknown && self.allow_unknown);
                if ok {
                    InapplicabilityFlags::none()
                } else {
                    Inapplicability::Scope.into()
                }
            }
            (None, Some(installed)) => {
                if installer.scope == installed || installer.scope == Scope::Unknown {
                    InapplicabilityFlags::none()
                } else {
                    Inapplicability::InstalledScope.into()
                }
            }
            (None, None) => InapplicabilityFlags::none(),
        }
    }

    fn explain_inapplicable(&self, installer: &ManifestInstaller) -> String {
        match (self.requested, self.installed) {
            (Some(requested), _) => format!(
                "Installer scope {} does not match requested scope {requested}",
                installer.scope
            ),
            (None, Some(installed)) => format!(
                "Installer scope {} does not match installed scope {installed}",
                installer.scope
            ),
            (None, None) => format!("Installer scope {} is not applicable", installer.scope),
        }
    }
}

/// Installers without a locale serve every locale.
#[derive(Debug)]
pub struct LocaleFilter {
    requested: Vec<String>,
    installed: Option<String>,
}

impl InstallerFilter for LocaleFilter {
    fn name(&self) -> &'static str {
        "locale"
    }

    fn is_applicable(&self, installer: &ManifestInstaller) -> InapplicabilityFlags {
        if installer.locale.is_empty() {
            return InapplicabilityFlags::none();
        }
        if !self.requested.is_empty() {
            if self
                .requested
                .iter()
                .any(|r| locale::is_compatible(r, &installer.locale))
            {
                return InapplicabilityFlags::none();
            }
            return Inapplicability::Locale.into();
        }
        match &self.installed {
            Some(installed) if !locale::is_compatible(installed, &installer.locale) => {
                Inapplicability::InstalledLocale.into()
            }
            _ => InapplicabilityFlags::none(),
        }
    }

    fn explain_inapplicable(&self, installer: &ManifestInstaller) -> String {
        if self.requested.is_empty() {
            format!(
                "Installer locale {} does not match installed locale {}",
                installer.locale,
                self.installed.as_deref().unwrap_or_default()
            )
        } else {
            format!(
                "Installer locale {} does not match any of [{}]",
                installer.locale,
                self.requested.join(", ")
            )
        }
    }
}

#[derive(Debug)]
pub struct MarketFilter {
    market: String,
}

impl MarketFilter {
    fn listed(markets: &[String], market: &str) -> bool {
        markets.iter().any(|m| m.eq_ignore_ascii_case(market))
    }
}

impl InstallerFilter for MarketFilter {
    fn name(&self) -> &'static str {
        "market"
    }

    fn is_applicable(&self, installer: &ManifestInstaller) -> InapplicabilityFlags {
        let markets = &installer.markets;
        let excluded = Self::listed(&markets.excluded_markets, &self.market);
        let not_allowed = !markets.allowed_markets.is_empty()
            && !Self::listed(&markets.allowed_markets, &self.market);
        if excluded || not_allowed {
            Inapplicability::Market.into()
        } else {
            InapplicabilityFlags::none()
        }
    }

    fn explain_inapplicable(&self, _installer: &ManifestInstaller) -> String {
        format!("Installer is not offered in market {}", self.market)
    }
}

#[cfg(test)]
mod tests {
    use pkgdex_schema::Markets;

    use super::*;

    fn installer(scope: Scope, locale: &str) -> ManifestInstaller {
        ManifestInstaller {
            architecture: Architecture::X64,
            installer_type: InstallerType::Msi,
            scope,
            locale: locale.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_scope_filter_priorities() {
        let requested = ScopeFilter {
            requested: Some(Scope::Machine),
            allow_unknown: false,
            installed: Some(Scope::User),
        };
        assert!(requested.is_applicable(&installer(Scope::Machine, "")).is_empty());
        assert!(requested
            .is_applicable(&installer(Scope::User, ""))
            .contains(Inapplicability::Scope));
        assert!(requested
            .is_applicable(&installer(Scope::Unknown, ""))
            .contains(Inapplicability::Scope));

        let installed = ScopeFilter {
            requested: None,
            allow_unknown: false,
            installed: Some(Scope::User),
        };
        assert!(installed.is_applicable(&installer(Scope::User, "")).is_empty());
        assert!(installed.is_applicable(&installer(Scope::Unknown, "")).is_empty());
        assert!(installed
            .is_applicable(&installer(Scope::Machine, ""))
            .contains(Inapplicability::InstalledScope));
    }

    #[test]
    fn test_installer_type_filter_uses_compatibility_sets() {
        let filter = InstallerTypeFilter {
            requested: None,
            installed: Some(InstallerType::Wix),
        };
        assert!(filter.is_applicable(&installer(Scope::User, "")).is_empty());

        let mut exe = installer(Scope::User, "");
        exe.installer_type = InstallerType::Exe;
        let flags = filter.is_applicable(&exe);
        assert!(flags.contains(Inapplicability::InstalledType));
        assert!(filter.explain_inapplicable(&exe).contains("wix"));
    }

    #[test]
    fn test_locale_filter() {
        let filter = LocaleFilter {
            requested: vec!["en-US".to_string()],
            installed: None,
        };
        assert!(filter.is_applicable(&installer(Scope::User, "en-GB")).is_empty());
        assert!(filter.is_applicable(&installer(Scope::User, "")).is_empty());
        assert!(filter
            .is_applicable(&installer(Scope::User, "fr-FR"))
            .contains(Inapplicability::Locale));

        let filter = LocaleFilter {
            requested: Vec::new(),
            installed: Some("fr-FR".to_string()),
        };
        assert!(filter
            .is_applicable(&installer(Scope::User, "en-US"))
            .contains(Inapplicability::InstalledLocale));
    }

    #[test]
    fn test_market_filter() {
        let filter = MarketFilter {
            market: "US".to_string(),
        };
        let mut excluded = installer(Scope::User, "");
        excluded.markets = Markets {
            allowed_markets: Vec::new(),
            excluded_markets: vec!["us".to_string()],
        };
        assert!(filter
            .is_applicable(&excluded)
            .contains(Inapplicability::Market));

        let mut elsewhere = installer(Scope::User, "");
        elsewhere.markets.allowed_markets = vec!["CA".to_string()];
        assert!(!filter.is_applicable(&elsewhere).is_empty());

        assert!(filter.is_applicable(&installer(Scope::User, "")).is_empty());
    }
}
