//! YAML manifest loading.

use std::path::{Path, PathBuf};

use pkgdex_schema::Manifest;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ManifestLoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid manifest {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Parse a manifest document.
pub fn parse_manifest(content: &str) -> Result<Manifest, serde_yaml::Error> {
    serde_yaml::from_str(content)
}

pub fn load_manifest(path: &Path) -> Result<Manifest, ManifestLoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| ManifestLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_manifest(&content).map_err(|source| ManifestLoadError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

fn is_manifest_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
}

/// Every `.yaml`/`.yml` file under `root`, sorted by path.
pub fn find_manifest_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && is_manifest_file(e.path()))
        .map(walkdir::DirEntry::into_path)
        .collect();
    files.sort();
    files
}

/// `path` relative to `root` with forward slashes, as stored in the index.
pub fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkgdex_schema::{Architecture, InstallerType};
    use tempfile::TempDir;

    const EDITOR: &str = r#"
PackageIdentifier: Contoso.Editor
PackageVersion: 1.2.0
PackageLocale: en-US
Publisher: Contoso Ltd.
PackageName: Contoso Editor
License: MIT
ManifestVersion: 1.6.0
Installers:
  - Architecture: x64
    InstallerType: msi
    InstallerUrl: https://example.com/editor.msi
    InstallerSha256: "ABABABABABABABABABABABABABABABABABABABABABABABABABABABABABABABAB"
"#;

    #[test]
    fn test_parse() {
        let manifest = parse_manifest(EDITOR).unwrap();
        assert_eq!(manifest.id, "Contoso.Editor");
        assert_eq!(manifest.installers[0].architecture, Architecture::X64);
        assert_eq!(manifest.installers[0].installer_type, InstallerType::Msi);
    }

    #[test]
    fn test_unquoted_numeric_versions() {
        let doc = EDITOR
            .replace("PackageVersion: 1.2.0", "PackageVersion: 1.0")
            .replace("ManifestVersion: 1.6.0", "ManifestVersion: 1.6");
        let manifest = parse_manifest(&doc).unwrap();
        assert_eq!(manifest.version, "1.0");
        assert_eq!(manifest.manifest_version.minor(), 6);
        assert!(!crate::validate_manifest(&manifest).has_errors());
    }

    #[test]
    fn test_load_and_find() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("c").join("Contoso");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("Contoso.Editor.yaml"), EDITOR).unwrap();
        std::fs::write(nested.join("notes.txt"), "ignored").unwrap();
        std::fs::write(dir.path().join("broken.yml"), "PackageIdentifier: [").unwrap();

        let files = find_manifest_files(dir.path());
        assert_eq!(files.len(), 2);
        assert_eq!(
            relative_path(dir.path(), &files[1]).as_deref(),
            Some("c/Contoso/Contoso.Editor.yaml")
        );

        assert!(load_manifest(&files[1]).is_ok());
        assert!(matches!(
            load_manifest(&files[0]),
            Err(ManifestLoadError::Yaml { .. })
        ));
        assert!(matches!(
            load_manifest(&dir.path().join("missing.yaml")),
            Err(ManifestLoadError::Io { .. })
        ));
    }
}
