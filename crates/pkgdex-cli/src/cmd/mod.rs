//! Subcommand implementations.

pub mod add;
pub mod build;
pub mod check;
pub mod completions;
pub mod migrate;
pub mod package;
pub mod remove;
pub mod search;
pub mod select;
pub mod show;
pub mod validate;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use pkgdex_core::{OpenDisposition, PackageIndex, SchemaRegistry, manifests_dir};

use crate::ui::ConsoleReporter;

/// State shared by every command: where the index lives, the schema
/// implementations available to open it, and how chatty to be.
#[derive(Debug)]
pub struct Context {
    index: Option<PathBuf>,
    registry: SchemaRegistry,
    pub quiet: bool,
}

impl Context {
    pub fn new(index: Option<PathBuf>, quiet: bool) -> Self {
        Self {
            index,
            registry: SchemaRegistry::standard(),
            quiet,
        }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn reporter(&self) -> ConsoleReporter {
        ConsoleReporter::new(self.quiet)
    }

    pub fn index_path(&self) -> Result<PathBuf> {
        self.index
            .clone()
            .or_else(pkgdex_core::index_path)
            .context("Could not determine index path. Set PKGDEX_HOME or pass --index.")
    }

    pub fn open_index(&self, disposition: OpenDisposition) -> Result<PackageIndex> {
        let path = self.index_path()?;
        PackageIndex::open(&path, disposition, &self.registry)
            .with_context(|| format!("Failed to open index {}", path.display()))
    }
}

/// Manifest tree root: the explicit one or `~/.pkgdex/manifests`.
pub(crate) fn manifest_root(root: Option<&Path>) -> Result<PathBuf> {
    root.map(Path::to_path_buf)
        .or_else(manifests_dir)
        .context("Could not determine manifest root. Set PKGDEX_HOME or pass --root.")
}
