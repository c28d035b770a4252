//! Package sources.
//!
//! [`ManifestSource`] is the seam between consumers (search, show, select)
//! and wherever manifests come from. [`LocalSource`] pairs an index with the
//! manifest tree its relative paths point into.

use std::path::{Path, PathBuf};

use pkgdex_schema::Manifest;
use thiserror::Error;
use tracing::debug;

use crate::index::{
    IndexError, ManifestProperty, OpenDisposition, PackageIndex, RowId, SchemaRegistry,
    SearchRequest, SearchResult,
};
use crate::loader::{ManifestLoadError, load_manifest};

#[derive(Error, Debug)]
pub enum SourceError {
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    Load(#[from] ManifestLoadError),
    #[error("Index does not record where {id} {version} lives")]
    ManifestUnavailable { id: String, version: String },
}

pub trait ManifestSource {
    /// Short name for display.
    fn identifier(&self) -> &str;

    fn search(&self, request: &SearchRequest) -> Result<SearchResult, SourceError>;

    fn get_manifest_by_version(
        &self,
        id: &str,
        version: &str,
        channel: &str,
    ) -> Result<Option<Manifest>, SourceError>;

    /// Every available manifest of `id`, newest first.
    fn get_manifests(&self, id: &str) -> Result<Vec<Manifest>, SourceError>;
}

#[derive(Debug)]
pub struct LocalSource {
    index: PackageIndex,
    root: PathBuf,
    name: String,
}

impl LocalSource {
    /// Open `index_path` read-only over the manifest tree at `root`.
    pub fn open(
        index_path: &Path,
        root: &Path,
        registry: &SchemaRegistry,
    ) -> Result<Self, SourceError> {
        let index = PackageIndex::open(index_path, OpenDisposition::ReadOnly, registry)?;
        Ok(Self::new(index, root))
    }

    pub fn new(index: PackageIndex, root: &Path) -> Self {
        let name = root
            .file_name()
            .map_or_else(|| "local".to_string(), |n| n.to_string_lossy().into_owned());
        Self {
            index,
            root: root.to_path_buf(),
            name,
        }
    }

    pub fn index(&self) -> &PackageIndex {
        &self.index
    }

    fn load(&self, manifest: RowId, id: &str, version: &str) -> Result<Manifest, SourceError> {
        let relative = self
            .index
            .get_property(manifest, ManifestProperty::RelativePath)?
            .ok_or_else(|| SourceError::ManifestUnavailable {
                id: id.to_string(),
                version: version.to_string(),
            })?;
        let path = self.root.join(relative);
        debug!(path = %path.display(), "Loading manifest");
        Ok(load_manifest(&path)?)
    }
}

impl ManifestSource for LocalSource {
    fn identifier(&self) -> &str {
        &self.name
    }

    fn search(&self, request: &SearchRequest) -> Result<SearchResult, SourceError> {
        Ok(self.index.search(request)?)
    }

    fn get_manifest_by_version(
        &self,
        id: &str,
        version: &str,
        channel: &str,
    ) -> Result<Option<Manifest>, SourceError> {
        match self.index.get_manifest_id_by_version(id, version, channel)? {
            Some(rowid) => self.load(rowid, id, version).map(Some),
            None => Ok(None),
        }
    }

    fn get_manifests(&self, id: &str) -> Result<Vec<Manifest>, SourceError> {
        self.index
            .get_versions(id)?
            .into_iter()
            .map(|key| self.load(key.manifest, id, &key.version))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{BuildOptions, build_index};
    use crate::index::{MatchType, SchemaVersion};
    use crate::reporter::NullReporter;
    use tempfile::TempDir;

    fn write(root: &Path, version: &str) {
        let dir = root.join("Contoso").join(version);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("Contoso.Editor.yaml"),
            format!(
                r#"PackageIdentifier: Contoso.Editor
PackageVersion: "{version}"
PackageName: Contoso Editor
License: MIT
Installers:
  - Architecture: x64
    InstallerType: zip
    InstallerUrl: https://example.com/editor.zip
    InstallerSha256: "{}"
"#,
                "cd".repeat(32)
            ),
        )
        .unwrap();
    }

    #[test]
    fn test_local_source_reads_manifest_tree() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("tree");
        write(&root, "1.0");
        write(&root, "1.10");
        write(&root, "1.9");

        let registry = SchemaRegistry::standard();
        let index_path = dir.path().join("index.db");
        let mut index =
            PackageIndex::create_new(&index_path, SchemaVersion::DEFAULT, &registry).unwrap();
        build_index(&mut index, &root, BuildOptions::default(), &NullReporter).unwrap();
        drop(index);

        let source = LocalSource::open(&index_path, &root, &registry).unwrap();
        assert_eq!(source.identifier(), "tree");

        let result = source
            .search(&SearchRequest::query(MatchType::CaseInsensitive, "contoso.editor"))
            .unwrap();
        assert_eq!(result.matches.len(), 1);

        let manifest = source
            .get_manifest_by_version("Contoso.Editor", "1.9", "")
            .unwrap()
            .unwrap();
        assert_eq!(manifest.version, "1.9");
        assert!(source
            .get_manifest_by_version("Contoso.Editor", "2.0", "")
            .unwrap()
            .is_none());

        let versions: Vec<String> = source
            .get_manifests("Contoso.Editor")
            .unwrap()
            .into_iter()
            .map(|m| m.version)
            .collect();
        assert_eq!(versions, ["1.10", "1.9", "1.0"]);
    }

    #[test]
    fn test_v2_index_has_no_paths() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("tree");
        write(&root, "1.0");

        let registry = SchemaRegistry::standard();
        let mut index = PackageIndex::create_new(
            &dir.path().join("index.db"),
            SchemaVersion::new(2, 0),
            &registry,
        )
        .unwrap();
        build_index(&mut index, &root, BuildOptions::default(), &NullReporter).unwrap();

        let source = LocalSource::new(index, &root);
        let err = source
            .get_manifest_by_version("Contoso.Editor", "1.0", "")
            .unwrap_err();
        assert!(matches!(err, SourceError::ManifestUnavailable { .. }));
    }
}
