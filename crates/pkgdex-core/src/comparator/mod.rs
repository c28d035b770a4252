//! Installer selection.
//!
//! A [`ManifestComparator`] is built once from [`Options`]. It holds an
//! ordered list of filters, which decide whether an installer can be used at
//! all, and an ordered list of comparisons, which rank the survivors.
//!
//! Ranking folds the applicable installers into a running best. A candidate
//! replaces the best only when some comparison strongly prefers it and none
//! strongly prefers the best. Comparisons run in priority order, so when
//! both sides get a strong verdict the earlier comparison decides. Without
//! any strong verdict the first weak one decides.

mod comparisons;
mod filters;
mod flags;
mod locale;

use std::collections::BTreeMap;

use pkgdex_schema::{Architecture, InstallerType, Manifest, ManifestInstaller, Scope};
use tracing::debug;

pub use comparisons::{InstallerComparison, Preference};
pub use filters::InstallerFilter;
pub use flags::{Inapplicability, InapplicabilityFlags};

/// Selection criteria.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Acceptable architectures, most preferred first. Empty means
    /// whatever the current machine can run.
    pub allowed_architectures: Vec<Architecture>,
    /// Treat every installer as applicable and only rank.
    pub skip_applicability_check: bool,
    pub requested_installer_type: Option<InstallerType>,
    pub currently_installed_type: Option<InstallerType>,
    pub requested_installer_scope: Option<Scope>,
    /// Accept installers that don't declare a scope when one is requested.
    pub allow_unknown_scope: bool,
    pub currently_installed_scope: Option<Scope>,
    /// Locale preference list, most preferred first.
    pub requested_installer_locale: Vec<String>,
    pub previous_user_intent_locale: Option<String>,
    pub currently_installed_locale: Option<String>,
    pub current_market: Option<String>,
}

impl Options {
    pub(crate) fn requested_scope(&self) -> Option<Scope> {
        self.requested_installer_scope.filter(|s| *s != Scope::Unknown)
    }

    pub(crate) fn installed_scope(&self) -> Option<Scope> {
        self.currently_installed_scope.filter(|s| *s != Scope::Unknown)
    }

    fn architectures(&self) -> Vec<Architecture> {
        if self.allowed_architectures.is_empty() {
            Architecture::applicable_for_current_machine()
        } else {
            self.allowed_architectures.clone()
        }
    }
}

/// Outcome of [`ManifestComparator::get_preferred_installer`].
#[derive(Debug, Clone)]
pub struct InstallerSelection<'m> {
    pub installer: Option<&'m ManifestInstaller>,
    /// Position of `installer` in the manifest.
    pub index: Option<usize>,
    /// Every installer that was not chosen. Filter rejections carry their
    /// reasons; out-ranked installers carry no flags.
    pub inapplicabilities: BTreeMap<usize, InapplicabilityFlags>,
}

impl InstallerSelection<'_> {
    pub fn is_empty(&self) -> bool {
        self.installer.is_none()
    }
}

#[derive(Debug)]
pub struct ManifestComparator {
    skip_applicability_check: bool,
    filters: Vec<Box<dyn InstallerFilter>>,
    comparisons: Vec<Box<dyn InstallerComparison>>,
}

impl ManifestComparator {
    pub fn new(options: &Options) -> Self {
        let architectures = options.architectures();
        Self {
            skip_applicability_check: options.skip_applicability_check,
            filters: filters::from_options(options, &architectures),
            comparisons: comparisons::from_options(options, &architectures),
        }
    }

    /// Union of the flags every filter raises against `installer`.
    pub fn inapplicability(&self, installer: &ManifestInstaller) -> InapplicabilityFlags {
        self.filters
            .iter()
            .fold(InapplicabilityFlags::none(), |flags, filter| {
                flags | filter.is_applicable(installer)
            })
    }

    /// One line per filter that rejects `installer`.
    pub fn explain_inapplicable(&self, installer: &ManifestInstaller) -> Vec<String> {
        self.filters
            .iter()
            .filter(|filter| !filter.is_applicable(installer).is_empty())
            .map(|filter| filter.explain_inapplicable(installer))
            .collect()
    }

    fn is_better(&self, candidate: &ManifestInstaller, best: &ManifestInstaller) -> bool {
        let mut weak: Option<bool> = None;

        for comparison in &self.comparisons {
            let forward = comparison.is_first_better(candidate, best);
            let backward = comparison.is_first_better(best, candidate);
            match (forward, backward) {
                (Preference::StrongPositive, Preference::StrongPositive) => {}
                (Preference::StrongPositive, _) => return true,
                (_, Preference::StrongPositive) => return false,
                (Preference::WeakPositive, _) => {
                    weak.get_or_insert(true);
                }
                (_, Preference::WeakPositive) => {
                    weak.get_or_insert(false);
                }
                (Preference::Negative, Preference::Negative) => {}
            }
        }

        weak == Some(true)
    }

    pub fn get_preferred_installer<'m>(&self, manifest: &'m Manifest) -> InstallerSelection<'m> {
        let mut inapplicabilities = BTreeMap::new();
        let mut applicable = Vec::new();

        for (index, installer) in manifest.installers.iter().enumerate() {
            let flags = if self.skip_applicability_check {
                InapplicabilityFlags::none()
            } else {
                self.inapplicability(installer)
            };
            if flags.is_empty() {
                applicable.push((index, installer));
            } else {
                debug!(index, %flags, "Installer not applicable");
                inapplicabilities.insert(index, flags);
            }
        }

        let mut best: Option<(usize, &ManifestInstaller)> = None;
        for (index, installer) in applicable {
            let Some((best_index, current)) = best else {
                best = Some((index, installer));
                continue;
            };
            if self.is_better(installer, current) {
                inapplicabilities.insert(best_index, InapplicabilityFlags::none());
                best = Some((index, installer));
            } else {
                inapplicabilities.insert(index, InapplicabilityFlags::none());
            }
        }

        if let Some((index, installer)) = best {
            debug!(
                id = %manifest.id,
                index,
                architecture = %installer.architecture,
                installer_type = %installer.installer_type,
                scope = %installer.scope,
                "Selected installer"
            );
        } else {
            debug!(id = %manifest.id, "No applicable installer");
        }

        InstallerSelection {
            installer: best.map(|(_, installer)| installer),
            index: best.map(|(index, _)| index),
            inapplicabilities,
        }
    }
}

#[cfg(test)]
mod tests {
    use pkgdex_schema::Markets;

    use super::*;

    fn installer(
        architecture: Architecture,
        installer_type: InstallerType,
        scope: Scope,
        locale: &str,
    ) -> ManifestInstaller {
        ManifestInstaller {
            architecture,
            installer_type,
            scope,
            locale: locale.to_string(),
            url: "https://example.com/setup".to_string(),
            sha256: "ab".repeat(32),
            ..Default::default()
        }
    }

    fn manifest(installers: Vec<ManifestInstaller>) -> Manifest {
        Manifest {
            id: "Contoso.Editor".to_string(),
            version: "1.0".to_string(),
            installers,
            ..Default::default()
        }
    }

    fn select(
        options: &Options,
        manifest: &Manifest,
    ) -> (Option<usize>, BTreeMap<usize, InapplicabilityFlags>) {
        let selection = ManifestComparator::new(options).get_preferred_installer(manifest);
        (selection.index, selection.inapplicabilities)
    }

    #[test]
    fn test_architecture_filter_scenario() {
        let manifest = manifest(vec![
            installer(Architecture::X86, InstallerType::Zip, Scope::Unknown, ""),
            installer(Architecture::X64, InstallerType::Zip, Scope::Unknown, ""),
        ]);
        let options = Options {
            allowed_architectures: vec![Architecture::X64],
            ..Default::default()
        };

        let selection = ManifestComparator::new(&options).get_preferred_installer(&manifest);
        assert_eq!(selection.index, Some(1));
        assert_eq!(
            selection.installer.map(|i| i.architecture),
            Some(Architecture::X64)
        );
        assert_eq!(selection.inapplicabilities.len(), 1);
        assert!(selection.inapplicabilities[&0].contains(Inapplicability::MachineArchitecture));
    }

    #[test]
    fn test_requested_scope_rejects_unknown_scope() {
        let manifest = manifest(vec![
            installer(Architecture::X64, InstallerType::Msi, Scope::Unknown, ""),
            installer(Architecture::X86, InstallerType::Msi, Scope::Unknown, ""),
        ]);
        let options = Options {
            allowed_architectures: vec![Architecture::X64, Architecture::X86],
            requested_installer_scope: Some(Scope::Machine),
            allow_unknown_scope: false,
            ..Default::default()
        };

        let selection = ManifestComparator::new(&options).get_preferred_installer(&manifest);
        assert!(selection.is_empty());
        assert_eq!(selection.index, None);
        assert_eq!(selection.inapplicabilities.len(), 2);
        for flags in selection.inapplicabilities.values() {
            assert!(flags.contains(Inapplicability::Scope));
        }

        let tolerant = Options {
            allow_unknown_scope: true,
            ..options
        };
        assert_eq!(select(&tolerant, &manifest).0, Some(0));
    }

    #[test]
    fn test_requested_scope_wins_over_installed_scope() {
        let manifest = manifest(vec![
            installer(Architecture::X64, InstallerType::Msi, Scope::User, ""),
            installer(Architecture::X64, InstallerType::Msi, Scope::Machine, ""),
        ]);
        let options = Options {
            allowed_architectures: vec![Architecture::X64],
            requested_installer_scope: Some(Scope::Machine),
            currently_installed_scope: Some(Scope::User),
            ..Default::default()
        };

        let (index, rejected) = select(&options, &manifest);
        assert_eq!(index, Some(1));
        assert!(rejected[&0].contains(Inapplicability::Scope));
        assert!(!rejected[&0].contains(Inapplicability::InstalledScope));
    }

    #[test]
    fn test_installed_scope_tolerates_unknown() {
        let manifest = manifest(vec![
            installer(Architecture::X64, InstallerType::Msi, Scope::Machine, ""),
            installer(Architecture::X64, InstallerType::Msi, Scope::Unknown, ""),
            installer(Architecture::X64, InstallerType::Msi, Scope::User, ""),
        ]);
        let options = Options {
            allowed_architectures: vec![Architecture::X64],
            currently_installed_scope: Some(Scope::User),
            ..Default::default()
        };

        let (index, rejected) = select(&options, &manifest);
        assert_eq!(index, Some(2));
        assert!(rejected[&0].contains(Inapplicability::InstalledScope));
        assert!(rejected[&1].is_empty());
    }

    #[test]
    fn test_out_ranked_installers_carry_no_flags() {
        let manifest = manifest(vec![
            installer(Architecture::X86, InstallerType::Exe, Scope::User, ""),
            installer(Architecture::X64, InstallerType::Exe, Scope::User, ""),
            installer(Architecture::Neutral, InstallerType::Exe, Scope::User, ""),
        ]);
        let options = Options {
            allowed_architectures: vec![
                Architecture::X64,
                Architecture::X86,
                Architecture::Neutral,
            ],
            ..Default::default()
        };

        let (index, rejected) = select(&options, &manifest);
        assert_eq!(index, Some(1));
        assert_eq!(rejected.len(), 2);
        assert!(rejected.values().all(InapplicabilityFlags::is_empty));
    }

    #[test]
    fn test_architecture_outranks_scope_in_any_order() {
        let machine_x86 = installer(Architecture::X86, InstallerType::Msi, Scope::Machine, "");
        let unscoped_x64 = installer(Architecture::X64, InstallerType::Msi, Scope::Unknown, "");
        let options = Options {
            allowed_architectures: vec![Architecture::X64, Architecture::X86],
            currently_installed_scope: Some(Scope::Machine),
            ..Default::default()
        };

        let forward = manifest(vec![machine_x86.clone(), unscoped_x64.clone()]);
        let selection = ManifestComparator::new(&options).get_preferred_installer(&forward);
        assert_eq!(selection.index, Some(1));
        assert_eq!(
            selection.installer.map(|i| i.architecture),
            Some(Architecture::X64)
        );

        let reversed = manifest(vec![unscoped_x64, machine_x86]);
        let selection = ManifestComparator::new(&options).get_preferred_installer(&reversed);
        assert_eq!(selection.index, Some(0));
        assert_eq!(
            selection.installer.map(|i| i.architecture),
            Some(Architecture::X64)
        );
    }

    #[test]
    fn test_locale_breaks_ties_only() {
        let manifest = manifest(vec![
            installer(Architecture::X64, InstallerType::Msi, Scope::User, "en-GB"),
            installer(Architecture::X64, InstallerType::Msi, Scope::User, "en-US"),
            installer(Architecture::X64, InstallerType::Msi, Scope::User, "fr-FR"),
        ]);
        let options = Options {
            allowed_architectures: vec![Architecture::X64, Architecture::X86],
            requested_installer_locale: vec!["en-US".to_string()],
            ..Default::default()
        };

        let (index, rejected) = select(&options, &manifest);
        assert_eq!(index, Some(1));
        assert!(rejected[&0].is_empty());
        assert!(rejected[&2].contains(Inapplicability::Locale));

        let manifest = self::manifest(vec![
            installer(Architecture::X86, InstallerType::Msi, Scope::User, "en-US"),
            installer(Architecture::X64, InstallerType::Msi, Scope::User, "en-GB"),
        ]);
        assert_eq!(select(&options, &manifest).0, Some(1));
    }

    #[test]
    fn test_previous_intent_locale() {
        let manifest = manifest(vec![
            installer(Architecture::X64, InstallerType::Msi, Scope::User, ""),
            installer(Architecture::X64, InstallerType::Msi, Scope::User, "de-DE"),
        ]);
        let options = Options {
            allowed_architectures: vec![Architecture::X64],
            previous_user_intent_locale: Some("de-AT".to_string()),
            ..Default::default()
        };
        assert_eq!(select(&options, &manifest).0, Some(1));
    }

    #[test]
    fn test_installed_type() {
        let manifest = manifest(vec![
            installer(Architecture::X64, InstallerType::Exe, Scope::User, ""),
            installer(Architecture::X64, InstallerType::Wix, Scope::User, ""),
            installer(Architecture::X64, InstallerType::Msi, Scope::User, ""),
        ]);
        let options = Options {
            allowed_architectures: vec![Architecture::X64],
            currently_installed_type: Some(InstallerType::Msi),
            ..Default::default()
        };

        let (index, rejected) = select(&options, &manifest);
        assert_eq!(index, Some(2));
        assert!(rejected[&0].contains(Inapplicability::InstalledType));
        assert!(rejected[&1].is_empty());

        let requested = Options {
            allowed_architectures: vec![Architecture::X64],
            requested_installer_type: Some(InstallerType::Exe),
            ..Default::default()
        };
        let (index, rejected) = select(&requested, &manifest);
        assert_eq!(index, Some(0));
        assert!(rejected[&1].contains(Inapplicability::InstallerType));
    }

    #[test]
    fn test_market() {
        let mut excluded = installer(Architecture::X64, InstallerType::Msi, Scope::User, "");
        excluded.markets = Markets {
            allowed_markets: Vec::new(),
            excluded_markets: vec!["US".to_string()],
        };
        let open = installer(Architecture::X64, InstallerType::Msi, Scope::User, "");
        let mut targeted = installer(Architecture::X64, InstallerType::Msi, Scope::User, "");
        targeted.markets.allowed_markets = vec!["US".to_string()];

        let manifest = manifest(vec![excluded, open, targeted]);
        let options = Options {
            allowed_architectures: vec![Architecture::X64],
            current_market: Some("US".to_string()),
            ..Default::default()
        };

        let (index, rejected) = select(&options, &manifest);
        assert_eq!(index, Some(2));
        assert!(rejected[&0].contains(Inapplicability::Market));
    }

    #[test]
    fn test_skip_applicability_check() {
        let manifest = manifest(vec![
            installer(Architecture::Arm, InstallerType::Msi, Scope::User, ""),
            installer(Architecture::X64, InstallerType::Msi, Scope::User, ""),
        ]);
        let options = Options {
            allowed_architectures: vec![Architecture::X64],
            requested_installer_scope: Some(Scope::Machine),
            skip_applicability_check: true,
            ..Default::default()
        };

        let (index, rejected) = select(&options, &manifest);
        assert_eq!(index, Some(1));
        assert!(rejected[&0].is_empty());
    }

    #[test]
    fn test_default_architectures_follow_machine() {
        let manifest = manifest(vec![
            installer(Architecture::Neutral, InstallerType::Zip, Scope::Unknown, ""),
            installer(Architecture::current(), InstallerType::Zip, Scope::Unknown, ""),
        ]);
        let (index, _) = select(&Options::default(), &manifest);
        assert_eq!(index, Some(1));
    }

    #[test]
    fn test_explanations() {
        let options = Options {
            allowed_architectures: vec![Architecture::X64],
            requested_installer_scope: Some(Scope::Machine),
            ..Default::default()
        };
        let comparator = ManifestComparator::new(&options);
        let rejected = installer(Architecture::Arm64, InstallerType::Msi, Scope::User, "");

        let flags = comparator.inapplicability(&rejected);
        assert_eq!(flags.to_string(), "MachineArchitecture|Scope");
        let reasons = comparator.explain_inapplicable(&rejected);
        assert_eq!(reasons.len(), 2);
        assert!(reasons[0].contains("arm64"));
        assert!(reasons[1].contains("machine"));
    }
}
