//! Build or refresh an index from a tree of manifest files.
//!
//! Every `.yaml`/`.yml` file under the root is loaded and validated. Files
//! with Error-severity problems are skipped; warnings are reported but do
//! not block indexing. Manifests already in the index are updated in place,
//! new ones are added. Two files in one tree claiming the same
//! (id, version, channel) keep the first and skip the second.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use pkgdex_schema::Severity;
use tracing::{debug, info, warn};

use crate::index::{IndexError, ManifestProperty, PackageIndex, SearchRequest};
use crate::loader::{find_manifest_files, load_manifest, relative_path};
use crate::reporter::Reporter;
use crate::validation::validate_manifest;

#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    /// Remove indexed manifests whose file no longer exists under the root.
    pub prune: bool,
}

#[derive(Debug, Default)]
pub struct BuildReport {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub removed: usize,
    pub skipped: Vec<(PathBuf, String)>,
}

impl BuildReport {
    pub fn total(&self) -> usize {
        self.added + self.updated + self.unchanged
    }
}

/// Index every manifest under `root`.
///
/// # Errors
///
/// Fails on index errors only. Unreadable or invalid manifests are recorded
/// in [`BuildReport::skipped`].
pub fn build_index(
    index: &mut PackageIndex,
    root: &Path,
    options: BuildOptions,
    reporter: &dyn Reporter,
) -> Result<BuildReport, IndexError> {
    let start = Instant::now();
    let mut report = BuildReport::default();
    let mut seen: HashSet<(String, String, String)> = HashSet::new();

    reporter.section("Indexing manifests");
    for path in find_manifest_files(root) {
        let mut skip = |reason: String| {
            warn!(path = %path.display(), %reason, "Skipping manifest");
            reporter.skipped(&path, &reason);
            report.skipped.push((path.clone(), reason));
        };

        let manifest = match load_manifest(&path) {
            Ok(manifest) => manifest,
            Err(e) => {
                skip(e.to_string());
                continue;
            }
        };

        let validation = validate_manifest(&manifest);
        if validation.has_errors() {
            skip(validation.to_string().trim_end().to_string());
            continue;
        }
        for problem in validation.errors() {
            if problem.severity == Severity::Warning {
                reporter.warning(&format!("{}: {problem}", path.display()));
            }
        }

        let key = (
            manifest.id.clone(),
            manifest.version.clone(),
            manifest.channel.clone(),
        );
        if !seen.insert(key) {
            skip(format!(
                "Duplicate of an earlier manifest for {} {}",
                manifest.id, manifest.version
            ));
            continue;
        }

        let relative = relative_path(root, &path);
        let existing =
            index.get_manifest_id_by_version(&manifest.id, &manifest.version, &manifest.channel)?;
        if existing.is_some() {
            if index.update_manifest(&manifest, relative.as_deref())? {
                report.updated += 1;
                reporter.indexed(&manifest.id, &manifest.version, true);
            } else {
                report.unchanged += 1;
                debug!(id = %manifest.id, version = %manifest.version, "Unchanged");
            }
        } else {
            index.add_manifest(&manifest, relative.as_deref())?;
            report.added += 1;
            reporter.indexed(&manifest.id, &manifest.version, false);
        }
    }

    if options.prune {
        report.removed = prune(index, root, &seen)?;
    }

    info!(
        added = report.added,
        updated = report.updated,
        unchanged = report.unchanged,
        removed = report.removed,
        skipped = report.skipped.len(),
        "Index build finished"
    );
    reporter.summary(report.total(), "indexed", start.elapsed().as_secs_f64());
    Ok(report)
}

/// Remove manifests that were not seen in this build. Schemas that record
/// relative paths keep entries whose file still exists.
fn prune(
    index: &mut PackageIndex,
    root: &Path,
    seen: &HashSet<(String, String, String)>,
) -> Result<usize, IndexError> {
    let mut stale = Vec::new();
    for package in index.search(&SearchRequest::default())?.matches {
        for version in index.get_versions(&package.id)? {
            let key = (package.id.clone(), version.version.clone(), version.channel.clone());
            if seen.contains(&key) {
                continue;
            }
            let on_disk = index
                .get_property(version.manifest, ManifestProperty::RelativePath)?
                .is_some_and(|p| root.join(p).is_file());
            if !on_disk {
                stale.push(key);
            }
        }
    }

    for (id, version, channel) in &stale {
        debug!(%id, %version, "Pruning manifest");
        index.remove_manifest(id, version, channel)?;
    }
    Ok(stale.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{MatchType, SchemaRegistry, SchemaVersion};
    use crate::reporter::NullReporter;
    use tempfile::TempDir;

    fn write_manifest(root: &Path, id: &str, version: &str) -> PathBuf {
        let dir = root.join(id.replace('.', "/")).join(version);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{id}.yaml"));
        std::fs::write(
            &path,
            format!(
                r#"
PackageIdentifier: {id}
PackageVersion: "{version}"
PackageLocale: en-US
Publisher: Contoso Ltd.
PackageName: {id}
License: MIT
ManifestVersion: 1.6.0
Installers:
  - Architecture: x64
    InstallerType: msi
    InstallerUrl: https://example.com/{id}/{version}.msi
    InstallerSha256: "{sha}"
"#,
                sha = "ab".repeat(32)
            ),
        )
        .unwrap();
        path
    }

    fn index(dir: &TempDir) -> PackageIndex {
        PackageIndex::create_new(
            &dir.path().join("index.db"),
            SchemaVersion::DEFAULT,
            &SchemaRegistry::standard(),
        )
        .unwrap()
    }

    #[test]
    fn test_build_skips_invalid_and_duplicates() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("manifests");
        write_manifest(&root, "Contoso.Editor", "1.0");
        write_manifest(&root, "Fabrikam.Tool", "2.0");
        std::fs::write(
            root.join("copy.yaml"),
            std::fs::read_to_string(root.join("Contoso/Editor/1.0/Contoso.Editor.yaml")).unwrap(),
        )
        .unwrap();
        std::fs::write(root.join("broken.yaml"), "PackageIdentifier: [").unwrap();
        std::fs::write(
            root.join("unlicensed.yaml"),
            "PackageIdentifier: Contoso.Free\nPackageVersion: \"1.0\"\n",
        )
        .unwrap();

        let mut index = index(&dir);
        let report =
            build_index(&mut index, &root, BuildOptions::default(), &NullReporter).unwrap();
        assert_eq!(report.added, 2);
        assert_eq!(report.skipped.len(), 3);
        assert!(index.check_consistency(true).unwrap());

        let rowid = index
            .get_manifest_id_by_version("Contoso.Editor", "1.0", "")
            .unwrap()
            .unwrap();
        let path = index
            .get_property(rowid, ManifestProperty::RelativePath)
            .unwrap()
            .unwrap();
        // Uppercase directories sort first, so copy.yaml is the duplicate.
        assert_eq!(path, "Contoso/Editor/1.0/Contoso.Editor.yaml");
    }

    #[test]
    fn test_rebuild_updates_and_prunes() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("manifests");
        write_manifest(&root, "Contoso.Editor", "1.0");
        let tool = write_manifest(&root, "Fabrikam.Tool", "2.0");

        let mut index = index(&dir);
        build_index(&mut index, &root, BuildOptions::default(), &NullReporter).unwrap();

        let report =
            build_index(&mut index, &root, BuildOptions::default(), &NullReporter).unwrap();
        assert_eq!(report.unchanged, 2);
        assert_eq!(report.added, 0);

        std::fs::remove_file(tool).unwrap();
        let report =
            build_index(&mut index, &root, BuildOptions { prune: true }, &NullReporter).unwrap();
        assert_eq!(report.removed, 1);
        let result = index
            .search(&crate::index::SearchRequest::query(MatchType::Substring, "Fabrikam"))
            .unwrap();
        assert!(result.matches.is_empty());
    }
}
