//! Resolved configuration for the lifecycle manager.
//!
//! Everything environment-derived is gathered here once at startup and
//! passed in explicitly; nothing downstream reads process state. An
//! optional preferences file (YAML) can override the scaffold layout,
//! the vendor denylist and the descriptor search-path entries.

use crate::repo::RepoRoots;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming the shared store root (pip installs land
/// under `$STORE/Resources/PythonPackages`).
pub const STORE_ENV: &str = "STORE";

/// Environment variable naming the per-show tree root.
pub const SHOWS_ENV: &str = "SHOWS";

/// Environment variable pointing at an optional preferences file.
pub const PREFERENCES_ENV: &str = "PK_PREFERENCES";

/// Packages versioned by an external product; never auto-incremented.
const VENDOR_PACKAGES: &[&str] = &[
    "aces",
    "cmake",
    "houdini",
    "maya",
    "mongocompass",
    "mongodb",
    "mongoshell",
    "neatvideo",
    "nodejs",
    "nuke",
    "painter",
    "photoshop",
    "pyblish",
    "pyblish_qml",
    "sidefxlabs",
];

/// Subdirectories scaffolded for every new package version.
const SCAFFOLD_DIRS: &[&str] = &["bin", "docs", "python", "tests"];

/// Errors that can occur when loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read preferences file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse preferences file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Resolved configuration passed into [`crate::PackageManager`].
#[derive(Debug, Clone)]
pub struct PkConfig {
    /// Repository root table.
    pub roots: RepoRoots,

    /// Shared third-party install location, if `$STORE` is set.
    pub pip_target: Option<PathBuf>,

    /// Root of the per-show trees, if `$SHOWS` is set.
    pub shows_root: Option<PathBuf>,

    /// Packages excluded from automatic version increments.
    pub vendor_packages: Vec<String>,

    /// Subdirectories created for every new package version.
    pub scaffold_dirs: Vec<String>,

    /// PATH entry written into new descriptors.
    pub bin_path: String,

    /// Import-search-path entry written into new descriptors.
    pub python_path: String,

    /// Current operator, recorded as the author of new descriptors.
    pub operator: String,
}

impl Default for PkConfig {
    fn default() -> Self {
        Self {
            roots: RepoRoots::default(),
            pip_target: None,
            shows_root: None,
            vendor_packages: VENDOR_PACKAGES.iter().map(ToString::to_string).collect(),
            scaffold_dirs: SCAFFOLD_DIRS.iter().map(ToString::to_string).collect(),
            bin_path: String::from("{root}/bin"),
            python_path: String::from("{root}/python"),
            operator: current_operator(),
        }
    }
}

impl PkConfig {
    /// Build configuration from the environment: repository roots from the
    /// `<KIND>_PACKAGES_PATH` variables, the shared store from `$STORE`,
    /// the show tree from `$SHOWS`, and preference overrides from the file
    /// named by `$PK_PREFERENCES` when set.
    ///
    /// # Errors
    ///
    /// Returns an error only if a preferences file is named but cannot be
    /// read or parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self {
            roots: RepoRoots::from_env(),
            pip_target: env::var(STORE_ENV)
                .ok()
                .map(|store| Path::new(&store).join("Resources").join("PythonPackages")),
            shows_root: env::var(SHOWS_ENV).ok().map(PathBuf::from),
            ..Self::default()
        };

        if let Ok(path) = env::var(PREFERENCES_ENV) {
            config.apply(&Preferences::load(path)?);
        }

        Ok(config)
    }

    /// Overlay preferences onto this configuration.
    pub fn apply(&mut self, preferences: &Preferences) {
        if let Some(vendors) = &preferences.vendor_packages {
            self.vendor_packages.clone_from(vendors);
        }
        if let Some(dirs) = &preferences.scaffold_dirs {
            self.scaffold_dirs.clone_from(dirs);
        }
        if let Some(bin) = &preferences.bin_path {
            self.bin_path.clone_from(bin);
        }
        if let Some(python) = &preferences.python_path {
            self.python_path.clone_from(python);
        }
    }

    /// Whether a package is on the vendor denylist.
    #[must_use]
    pub fn is_vendor(&self, name: &str) -> bool {
        self.vendor_packages.iter().any(|v| v == name)
    }
}

/// Operator preferences loaded from a YAML file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Preferences {
    /// Override the vendor denylist.
    #[serde(default)]
    pub vendor_packages: Option<Vec<String>>,

    /// Override the scaffold subdirectories.
    #[serde(default)]
    pub scaffold_dirs: Option<Vec<String>>,

    /// Override the descriptor PATH entry.
    #[serde(default)]
    pub bin_path: Option<String>,

    /// Override the descriptor import-search-path entry.
    #[serde(default)]
    pub python_path: Option<String>,
}

impl Preferences {
    /// Load preferences from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }
}

/// The operator's login name, used as the initial descriptor author.
#[must_use]
pub fn current_operator() -> String {
    env::var("USER")
        .or_else(|_| env::var("USERNAME"))
        .unwrap_or_else(|_| String::from("unknown"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_vendor_denylist_includes_nuke() {
        let config = PkConfig::default();
        assert!(config.is_vendor("nuke"));
        assert!(!config.is_vendor("logger"));
    }

    #[test]
    fn preferences_overlay() {
        let yaml = "vendor_packages: [nuke]\nscaffold_dirs: [bin, python]\nbin_path: '{root}/scripts'\n";
        let preferences: Preferences = serde_yaml::from_str(yaml).unwrap();

        let mut config = PkConfig::default();
        config.apply(&preferences);

        assert_eq!(config.vendor_packages, vec!["nuke"]);
        assert_eq!(config.scaffold_dirs, vec!["bin", "python"]);
        assert_eq!(config.bin_path, "{root}/scripts");
        // Untouched fields keep their defaults.
        assert_eq!(config.python_path, "{root}/python");
    }

    #[test]
    fn unknown_preference_keys_are_rejected() {
        let yaml = "vendor_packages: []\nextra_key: true\n";
        assert!(serde_yaml::from_str::<Preferences>(yaml).is_err());
    }
}
