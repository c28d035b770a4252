//! Select command

use std::path::Path;

use anyhow::{Context as _, Result, anyhow, bail};
use crossterm::style::Stylize;
use pkgdex_core::comparator::InapplicabilityFlags;
use pkgdex_core::loader::load_manifest;
use pkgdex_core::settings::Settings;
use pkgdex_core::{LocalSource, ManifestComparator, ManifestSource, Options, settings_path};
use pkgdex_schema::{Architecture, InstallerType, Manifest, Scope};

use super::{Context, manifest_root};
use crate::SelectArgs;
use crate::ui::Theme;
use crate::ui::table::{InstallerRow, InstallerStatus, installer_table};

fn parse_installer_type(value: &str) -> Result<InstallerType> {
    match InstallerType::from(value) {
        InstallerType::Unknown => bail!("Unknown installer type: {value}"),
        t => Ok(t),
    }
}

fn parse_scope(value: &str) -> Result<Scope> {
    match Scope::from(value) {
        Scope::Unknown => bail!("Unknown scope: {value} (expected user or machine)"),
        s => Ok(s),
    }
}

/// Layer command-line preferences over the ones from settings.toml.
fn apply_args(mut options: Options, args: &SelectArgs) -> Result<Options> {
    if !args.architectures.is_empty() {
        options.allowed_architectures = args
            .architectures
            .iter()
            .map(|a| a.parse::<Architecture>().map_err(|e| anyhow!(e)))
            .collect::<Result<_>>()?;
    }
    if let Some(t) = &args.installer_type {
        options.requested_installer_type = Some(parse_installer_type(t)?);
    }
    if let Some(t) = &args.installed_type {
        options.currently_installed_type = Some(parse_installer_type(t)?);
    }
    if let Some(s) = &args.scope {
        options.requested_installer_scope = Some(parse_scope(s)?);
    }
    if let Some(s) = &args.installed_scope {
        options.currently_installed_scope = Some(parse_scope(s)?);
    }
    if !args.locales.is_empty() {
        options.requested_installer_locale.clone_from(&args.locales);
    }
    if args.previous_locale.is_some() {
        options.previous_user_intent_locale.clone_from(&args.previous_locale);
    }
    if args.installed_locale.is_some() {
        options.currently_installed_locale.clone_from(&args.installed_locale);
    }
    if args.market.is_some() {
        options.current_market.clone_from(&args.market);
    }
    options.allow_unknown_scope |= args.allow_unknown_scope;
    options.skip_applicability_check |= args.skip_applicability;
    Ok(options)
}

fn load_options(args: &SelectArgs) -> Result<Options> {
    let settings = match settings_path() {
        Some(path) => Settings::load(&path)?,
        None => Settings::default(),
    };
    apply_args(settings.comparator_options()?, args)
}

/// A manifest file on disk, or a package looked up through the index.
fn resolve_manifest(
    ctx: &Context,
    target: &str,
    version: Option<&str>,
    root: Option<&Path>,
) -> Result<Manifest> {
    let path = Path::new(target);
    if path.is_file() {
        return Ok(load_manifest(path)?);
    }

    let root = manifest_root(root)?;
    let source = LocalSource::open(&ctx.index_path()?, &root, ctx.registry())
        .context("Failed to open package source")?;
    let manifest = match version {
        Some(v) => source.get_manifest_by_version(target, v, "")?,
        None => source.get_manifests(target)?.into_iter().next(),
    };
    manifest.ok_or_else(|| match version {
        Some(v) => anyhow!("Package '{target}' has no version {v}"),
        None => anyhow!("Package '{target}' not found"),
    })
}

fn status(
    index: usize,
    selected: Option<usize>,
    flags: Option<&InapplicabilityFlags>,
) -> InstallerStatus {
    if selected == Some(index) {
        return InstallerStatus::Selected;
    }
    match flags {
        Some(flags) if !flags.is_empty() => InstallerStatus::Rejected(flags.to_string()),
        _ => InstallerStatus::Applicable,
    }
}

/// Pick the installer of a manifest that best fits this machine.
pub fn select(
    ctx: &Context,
    target: &str,
    version: Option<&str>,
    root: Option<&Path>,
    args: &SelectArgs,
) -> Result<()> {
    let options = load_options(args)?;
    let manifest = resolve_manifest(ctx, target, version, root)?;
    let comparator = ManifestComparator::new(&options);
    let selection = comparator.get_preferred_installer(&manifest);

    let rows: Vec<InstallerRow> = manifest
        .installers
        .iter()
        .enumerate()
        .map(|(i, installer)| InstallerRow {
            index: i,
            architecture: installer.architecture.to_string(),
            installer_type: installer.installer_type.to_string(),
            scope: match installer.scope {
                Scope::Unknown => String::new(),
                s => s.to_string(),
            },
            locale: installer.locale.clone(),
            status: status(i, selection.index, selection.inapplicabilities.get(&i)),
        })
        .collect();

    let theme = Theme::default();
    println!();
    println!(
        "  {} {}",
        manifest.id.as_str().white().bold(),
        manifest.version.as_str().dark_grey()
    );
    println!();
    println!("{}", installer_table(&rows));

    if !ctx.quiet {
        for (i, installer) in manifest.installers.iter().enumerate() {
            if selection.index == Some(i) {
                continue;
            }
            for reason in comparator.explain_inapplicable(installer) {
                println!("  {} #{i}: {reason}", theme.icons.skipped.with(theme.colors.secondary));
            }
        }
    }

    let (Some(i), Some(installer)) = (selection.index, selection.installer) else {
        bail!(
            "No applicable installer for {} {}",
            manifest.id,
            manifest.version
        );
    };

    println!();
    println!(
        "  {} installer #{i} {} {}",
        theme.icons.success.with(theme.colors.success),
        installer.architecture.to_string().with(theme.colors.version),
        installer.installer_type.to_string().with(theme.colors.version),
    );
    if !installer.url.is_empty() {
        println!("    {}", installer.url.as_str().with(theme.colors.secondary));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkgdex_core::comparator::Inapplicability;

    #[test]
    fn test_args_override_settings() {
        let base = Options {
            allowed_architectures: vec![Architecture::X86],
            current_market: Some("US".into()),
            ..Options::default()
        };
        let args = SelectArgs {
            architectures: vec!["arm64".into(), "x64".into()],
            scope: Some("user".into()),
            installer_type: Some("msix".into()),
            locales: vec!["fr-FR".into()],
            ..SelectArgs::default()
        };

        let options = apply_args(base, &args).unwrap();
        assert_eq!(
            options.allowed_architectures,
            [Architecture::Arm64, Architecture::X64]
        );
        assert_eq!(options.requested_installer_scope, Some(Scope::User));
        assert_eq!(options.requested_installer_type, Some(InstallerType::Msix));
        assert_eq!(options.requested_installer_locale, ["fr-FR"]);
        assert_eq!(options.current_market.as_deref(), Some("US"));
    }

    #[test]
    fn test_unknown_values_are_rejected() {
        let bad_arch = SelectArgs {
            architectures: vec!["mips".into()],
            ..SelectArgs::default()
        };
        assert!(apply_args(Options::default(), &bad_arch).is_err());

        let bad_scope = SelectArgs {
            scope: Some("everyone".into()),
            ..SelectArgs::default()
        };
        assert!(apply_args(Options::default(), &bad_scope).is_err());

        let bad_type = SelectArgs {
            installer_type: Some("deb".into()),
            ..SelectArgs::default()
        };
        assert!(apply_args(Options::default(), &bad_type).is_err());
    }

    #[test]
    fn test_status() {
        let rejected = InapplicabilityFlags::from(Inapplicability::MachineArchitecture);
        assert_eq!(status(0, Some(0), None), InstallerStatus::Selected);
        assert_eq!(
            status(1, Some(0), Some(&rejected)),
            InstallerStatus::Rejected(rejected.to_string())
        );
        assert_eq!(
            status(2, Some(0), Some(&InapplicabilityFlags::none())),
            InstallerStatus::Applicable
        );
    }
}
