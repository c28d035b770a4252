//! User settings loaded from `settings.toml`.
//!
//! ```toml
//! [installer]
//! architectures = ["x64", "x86"]
//! scope = "user"
//! locale = ["en-US"]
//! market = "US"
//! allow_unknown_scope = true
//! ```

use std::path::{Path, PathBuf};

use pkgdex_schema::{Architecture, Scope};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::comparator::Options;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Unknown architecture in settings: {0}")]
    Architecture(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub installer: InstallerPreferences,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerPreferences {
    /// Most preferred first. Empty means the current machine's list.
    pub architectures: Vec<String>,
    pub scope: Option<String>,
    pub locale: Vec<String>,
    pub market: Option<String>,
    pub allow_unknown_scope: bool,
}

impl Settings {
    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(SettingsError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        toml::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Comparator options seeded from the preferences.
    pub fn comparator_options(&self) -> Result<Options, SettingsError> {
        let prefs = &self.installer;
        let allowed_architectures = prefs
            .architectures
            .iter()
            .map(|a| {
                a.parse::<Architecture>()
                    .ok()
                    .filter(|a| *a != Architecture::Unknown)
                    .ok_or_else(|| SettingsError::Architecture(a.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Options {
            allowed_architectures,
            requested_installer_scope: prefs.scope.as_deref().map(Scope::from),
            allow_unknown_scope: prefs.allow_unknown_scope,
            requested_installer_locale: prefs.locale.clone(),
            current_market: prefs.market.clone(),
            ..Options::default()
        })
    }
}
