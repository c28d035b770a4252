//! pkgdex - package manifest index and installer selection
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Builds and queries schema-versioned SQLite indexes over a tree of YAML
//! package manifests, and picks the installer of a manifest that best fits
//! the machine and the user's preferences.
//!
//! # Directory Layout
//!
//! ```text
//! ~/.pkgdex/
//! ├── index.db       # Package index
//! ├── manifests/     # Manifest tree the index points into
//! └── settings.toml  # Installer preferences
//! ```

pub mod cmd;
pub mod ui;

use clap::{Args, Parser, Subcommand};
use pkgdex_core::SchemaVersion;
use pkgdex_core::index::MatchType;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "pkgdex")]
#[command(author, version, about = "pkgdex - package manifest index and installer selection")]
pub struct Cli {
    /// Index database to operate on [default: ~/.pkgdex/index.db]
    #[arg(long, global = true, env = "PKGDEX_INDEX")]
    pub index: Option<PathBuf>,

    /// Show debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Validate manifest files or directories of manifests
    Validate {
        /// Manifest files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Create or refresh the index from a manifest tree
    Build {
        #[command(flatten)]
        root: RootArg,
        /// Schema version for a newly created index
        #[arg(long)]
        schema: Option<SchemaVersion>,
        /// Remove indexed manifests whose file is gone
        #[arg(long)]
        prune: bool,
    },
    /// Add a single manifest to the index
    Add {
        /// Manifest file
        manifest: PathBuf,
        #[command(flatten)]
        root: RootArg,
    },
    /// Replace the indexed copy of a manifest
    Update {
        /// Manifest file
        manifest: PathBuf,
        #[command(flatten)]
        root: RootArg,
    },
    /// Remove a manifest from the index
    Remove {
        /// Package identifier
        id: String,
        /// Package version
        version: String,
        /// Release channel
        #[arg(long, default_value = "")]
        channel: String,
    },
    /// Search the index
    Search {
        /// Free-text query over id, name, moniker, command and tag
        query: Option<String>,
        /// How values are compared: exact, caseinsensitive, startswith, substring
        #[arg(long = "match", default_value = "substring")]
        match_type: MatchType,
        /// Extra field that may match on its own, e.g. productcode={GUID}
        #[arg(long = "include", value_name = "FIELD=VALUE")]
        inclusions: Vec<String>,
        /// Field every result must match, e.g. tag=editor
        #[arg(long = "filter", value_name = "FIELD=VALUE")]
        filters: Vec<String>,
        /// Maximum number of results
        #[arg(short = 'n', long)]
        count: Option<usize>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show what the index knows about a package
    Show {
        /// Package identifier
        id: String,
        /// Version to describe [default: latest]
        #[arg(long)]
        version: Option<String>,
        /// Release channel
        #[arg(long, default_value = "")]
        channel: String,
    },
    /// Pick the best installer of a manifest for this machine
    Select {
        /// Manifest file, or package identifier looked up through the index
        target: String,
        /// Version to select from when looking up an identifier [default: latest]
        #[arg(long)]
        version: Option<String>,
        #[command(flatten)]
        root: RootArg,
        #[command(flatten)]
        prefs: SelectArgs,
    },
    /// Verify the referential integrity of the index
    Check,
    /// Strip build-only data and mark the index read-only for distribution
    Package {
        /// Skip compacting the database file
        #[arg(long)]
        no_vacuum: bool,
    },
    /// Upgrade the index to a newer schema minor version
    Migrate {
        /// Target schema version, e.g. 1.7
        version: SchemaVersion,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Debug, Args)]
pub struct RootArg {
    /// Manifest tree root [default: ~/.pkgdex/manifests]
    #[arg(long, env = "PKGDEX_MANIFESTS")]
    pub root: Option<PathBuf>,
}

/// Installer preferences; each one overrides settings.toml.
#[derive(Debug, Default, Args)]
pub struct SelectArgs {
    /// Allowed architectures, most preferred first
    #[arg(long = "arch", value_delimiter = ',')]
    pub architectures: Vec<String>,
    /// Required installer type
    #[arg(long = "type")]
    pub installer_type: Option<String>,
    /// Required install scope (user or machine)
    #[arg(long)]
    pub scope: Option<String>,
    /// Accept installers that declare no scope when a scope is required
    #[arg(long)]
    pub allow_unknown_scope: bool,
    /// Acceptable locales, most preferred first
    #[arg(long = "locale", value_delimiter = ',')]
    pub locales: Vec<String>,
    /// Locale the user picked last time
    #[arg(long)]
    pub previous_locale: Option<String>,
    /// Installer type of the existing installation
    #[arg(long)]
    pub installed_type: Option<String>,
    /// Scope of the existing installation
    #[arg(long)]
    pub installed_scope: Option<String>,
    /// Locale of the existing installation
    #[arg(long)]
    pub installed_locale: Option<String>,
    /// Market (country code) of this machine
    #[arg(long)]
    pub market: Option<String>,
    /// Only rank installers, never reject them
    #[arg(long)]
    pub skip_applicability: bool,
}
