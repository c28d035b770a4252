use dirs::home_dir;
use std::path::PathBuf;

/// Returns the primary configuration directory, or None if the user's home cannot be resolved.
pub fn try_pkgdex_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("PKGDEX_HOME") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".pkgdex"))
}

/// Default index path: ~/.pkgdex/index.db
pub fn index_path() -> Option<PathBuf> {
    try_pkgdex_home().map(|h| h.join("index.db"))
}

/// Installer preferences: ~/.pkgdex/settings.toml
pub fn settings_path() -> Option<PathBuf> {
    try_pkgdex_home().map(|h| h.join("settings.toml"))
}

/// Default manifest tree: ~/.pkgdex/manifests
pub fn manifests_dir() -> Option<PathBuf> {
    try_pkgdex_home().map(|h| h.join("manifests"))
}
