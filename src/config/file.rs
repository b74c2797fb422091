//! Configuration file discovery

use std::path::{Path, PathBuf};

/// Configuration file locations (in order of precedence)
pub const CONFIG_LOCATIONS: &[&str] = &[
    "./httpbench.yaml",
    "./httpbench.yml",
    "./.httpbench.yaml",
    "~/.config/httpbench/config.yaml",
];

/// Locate the configuration file to load.
///
/// An explicit path wins, then the path from the environment, then the first
/// standard location that exists. Explicit paths are returned even if missing
/// so that loading reports the error.
pub fn find_config(explicit: Option<&Path>, from_env: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = from_env.filter(|p| !p.trim().is_empty()) {
        return Some(expand_path(path));
    }
    CONFIG_LOCATIONS
        .iter()
        .map(|location| expand_path(location))
        .find(|path| path.exists())
}

/// Expand a leading `~/` to the home directory
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
