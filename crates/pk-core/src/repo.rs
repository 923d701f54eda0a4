//! Repository kinds and the mapping from `(package, kind)` to a path.
//!
//! Each repository kind has exactly one root directory, supplied by the
//! calling environment as `<KIND>_PACKAGES_PATH` (e.g. `DEV_PACKAGES_PATH`).
//! Resolution never checks existence; each operation decides for itself
//! whether a missing directory is acceptable.

use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when resolving repository paths.
#[derive(Error, Debug)]
pub enum RepoError {
    #[error("unknown repository '{0}', expected one of: dev, local, release, stage, show, show_dev, show_stage")]
    UnknownRepository(String),

    /// The kind is valid but the environment supplied no root for it.
    #[error("no root configured for the {0} repository (set {var})", var = .0.env_var())]
    MissingRoot(RepoKind),
}

/// One of the seven named package repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RepoKind {
    Dev,
    Local,
    Release,
    Stage,
    Show,
    ShowDev,
    ShowStage,
}

impl RepoKind {
    /// All repository kinds, in scan order.
    pub const ALL: [Self; 7] = [
        Self::Dev,
        Self::Local,
        Self::Release,
        Self::Stage,
        Self::Show,
        Self::ShowDev,
        Self::ShowStage,
    ];

    /// Returns the kind as its repository name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Local => "local",
            Self::Release => "release",
            Self::Stage => "stage",
            Self::Show => "show",
            Self::ShowDev => "show_dev",
            Self::ShowStage => "show_stage",
        }
    }

    /// The environment variable holding this kind's root path.
    #[must_use]
    pub fn env_var(self) -> String {
        format!("{}_PACKAGES_PATH", self.as_str().to_uppercase())
    }
}

impl fmt::Display for RepoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RepoKind {
    type Err = RepoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dev" => Ok(Self::Dev),
            "local" => Ok(Self::Local),
            "release" => Ok(Self::Release),
            "stage" => Ok(Self::Stage),
            "show" => Ok(Self::Show),
            "show_dev" => Ok(Self::ShowDev),
            "show_stage" => Ok(Self::ShowStage),
            other => Err(RepoError::UnknownRepository(other.to_string())),
        }
    }
}

/// The resolved table of repository roots.
///
/// Built once at startup and passed into the lifecycle manager, so nothing
/// downstream reads the process environment.
#[derive(Debug, Clone, Default)]
pub struct RepoRoots {
    roots: BTreeMap<RepoKind, PathBuf>,
}

impl RepoRoots {
    /// Build the table from whichever `<KIND>_PACKAGES_PATH` variables are
    /// set. Kinds with no variable are simply absent; requesting one later
    /// is a configuration error.
    #[must_use]
    pub fn from_env() -> Self {
        let mut roots = BTreeMap::new();
        for kind in RepoKind::ALL {
            if let Ok(path) = env::var(kind.env_var()) {
                roots.insert(kind, PathBuf::from(path));
            }
        }
        Self { roots }
    }

    /// Set the root for a repository kind.
    pub fn insert(&mut self, kind: RepoKind, root: impl Into<PathBuf>) {
        self.roots.insert(kind, root.into());
    }

    /// The root directory for a repository kind.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::MissingRoot`] if the environment supplied no
    /// root for this kind.
    pub fn root(&self, kind: RepoKind) -> Result<&Path, RepoError> {
        self.roots
            .get(&kind)
            .map(PathBuf::as_path)
            .ok_or(RepoError::MissingRoot(kind))
    }

    /// The directory holding all versions of a package: `<root>/<name>`.
    ///
    /// Performs no existence check.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::MissingRoot`] if the kind has no configured root.
    pub fn package_dir(&self, name: &str, kind: RepoKind) -> Result<PathBuf, RepoError> {
        Ok(self.root(kind)?.join(name))
    }

    /// Whether a root is configured for this kind.
    #[must_use]
    pub fn is_configured(&self, kind: RepoKind) -> bool {
        self.roots.contains_key(&kind)
    }
}
