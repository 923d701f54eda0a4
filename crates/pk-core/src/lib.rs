//! Package version lifecycle management for Otherside VFX rez repositories.
//!
//! This crate provides:
//! - Parsing and incrementing of `major.minor.patch` package versions
//! - Resolution of `(package, repository kind)` pairs to filesystem paths
//! - Reading and writing of `package.py` descriptors
//! - The lifecycle operations: create, upgrade, delete, read, install, build
//!
//! Build invocation and third-party installs are delegated to injected
//! collaborators; the core only decides which directories to hand them.

mod build;
mod config;
mod confirm;
mod descriptor;
mod manager;
mod repo;
mod version;

pub use build::{
    BuildContext, BuildError, BuildReport, BuildRunner, IndexInstaller, PipInstaller,
    RezBuildRunner,
};
pub use config::{
    current_operator, ConfigError, PkConfig, Preferences, PREFERENCES_ENV, SHOWS_ENV, STORE_ENV,
};
pub use confirm::{Confirmer, ConsoleConfirmer, Reply};
pub use descriptor::{replace_version, Descriptor, DescriptorError, DESCRIPTOR_FILE};
pub use manager::{DeleteOutcome, PackageManager, PkError, RepoSummary, UpgradeTarget};
pub use repo::{RepoError, RepoKind, RepoRoots};
pub use version::{Granularity, Version, VersionError};
