//! The package version lifecycle manager.
//!
//! Orchestrates repository resolution, version arithmetic, descriptor IO
//! and directory mutation for the `create`, `upgrade`, `delete`, `read`,
//! `install` and `build` operations. The actual build and third-party
//! install are delegated to injected collaborators; confirmation prompts
//! go through an injected [`Confirmer`] so destructive operations stay
//! deterministic under test.

use crate::build::{BuildContext, BuildError, BuildReport, BuildRunner, IndexInstaller};
use crate::config::PkConfig;
use crate::confirm::{Confirmer, Reply};
use crate::descriptor::{self, Descriptor, DescriptorError, DESCRIPTOR_FILE};
use crate::repo::{RepoError, RepoKind};
use crate::version::{Granularity, Version, VersionError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during lifecycle operations.
#[derive(Error, Debug)]
pub enum PkError {
    #[error("package name cannot be empty")]
    EmptyName,

    #[error("{name}-{version} already exists in the {repo} repository, consider upgrading or creating a new version")]
    PackageVersionExists {
        name: String,
        version: String,
        repo: RepoKind,
    },

    #[error("package '{name}' does not exist in the {repo} repository")]
    PackageNotFound { name: String, repo: RepoKind },

    #[error("package source directory not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("upgrade of '{0}' aborted: no target version supplied")]
    UpgradeAborted(String),

    #[error("invalid input '{0}', expected yes or no; aborting")]
    InvalidAnswer(String),

    #[error("shared store is not configured (set STORE)")]
    MissingStore,

    #[error("show tree is not configured (set SHOWS)")]
    MissingShows,

    #[error("external {command} invocation failed:\n{output}")]
    ExternalBuildFailure { command: String, output: String },

    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// How `upgrade` picks the target version.
#[derive(Debug, Clone)]
pub enum UpgradeTarget {
    /// Increment the latest version at the given granularity.
    Bump(Granularity),
    /// Use this exact version string.
    Explicit(String),
}

/// Result of a `delete`: either a path was removed, or the operator
/// declined at one of the confirmation gates and nothing changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted(PathBuf),
    Declined,
}

/// Per-repository entry produced by `read`.
#[derive(Debug, Clone)]
pub struct RepoSummary {
    pub repo: RepoKind,
    /// All version directory names, sorted.
    pub versions: Vec<String>,
    /// Description of the latest version, when its descriptor has one.
    pub description: Option<String>,
    /// Dependency specifiers of the latest version.
    pub requires: Vec<String>,
}

/// The lifecycle orchestrator.
pub struct PackageManager {
    config: PkConfig,
    confirmer: Box<dyn Confirmer>,
    builder: Box<dyn BuildRunner>,
    installer: Box<dyn IndexInstaller>,
}

impl PackageManager {
    /// Assemble a manager from resolved configuration and collaborators.
    #[must_use]
    pub fn new(
        config: PkConfig,
        confirmer: Box<dyn Confirmer>,
        builder: Box<dyn BuildRunner>,
        installer: Box<dyn IndexInstaller>,
    ) -> Self {
        Self {
            config,
            confirmer,
            builder,
            installer,
        }
    }

    /// Create a new package version directory.
    ///
    /// Scaffolds `<root>/<name>/<version>/{bin,docs,python/<name>/,tests}`
    /// with empty package markers under `python/<name>` and `tests`, and
    /// writes the initial descriptor. Partial scaffolds are not rolled
    /// back; a later retry reports the occupied path.
    ///
    /// # Errors
    ///
    /// Returns [`PkError::PackageVersionExists`] if the version directory
    /// is already present.
    pub fn create(&self, name: &str, version: &str, repo: RepoKind) -> Result<PathBuf, PkError> {
        if name.is_empty() {
            return Err(PkError::EmptyName);
        }

        let version_dir = self.config.roots.package_dir(name, repo)?.join(version);
        if version_dir.exists() {
            return Err(PkError::PackageVersionExists {
                name: name.to_string(),
                version: version.to_string(),
                repo,
            });
        }

        fs::create_dir_all(&version_dir)?;
        for sub_dir in &self.config.scaffold_dirs {
            let path = version_dir.join(sub_dir);
            fs::create_dir_all(&path)?;

            // Package markers so the consuming runtime can import these.
            if sub_dir == "python" {
                let module_dir = path.join(name);
                fs::create_dir_all(&module_dir)?;
                fs::write(module_dir.join("__init__.py"), "")?;
            }
            if sub_dir == "tests" {
                fs::write(path.join("__init__.py"), "")?;
            }
        }

        let descriptor = Descriptor::new(
            name,
            version,
            &self.config.operator,
            &self.config.bin_path,
            &self.config.python_path,
        );
        descriptor.write(version_dir.join(DESCRIPTOR_FILE))?;

        Ok(version_dir)
    }

    /// Version up a package.
    ///
    /// Copies the latest version tree (symbolic links preserved) to the new
    /// version path, then rewrites the copied descriptor's `version='...'`
    /// assignment. Vendor packages and packages whose latest version is not
    /// `major.minor.patch` are never auto-incremented; the operator is
    /// asked for an explicit version instead.
    ///
    /// # Errors
    ///
    /// Returns [`PkError::PackageNotFound`] if the package has no existing
    /// versions, [`PkError::UpgradeAborted`] if the operator declines to
    /// supply a required version, and [`PkError::PackageVersionExists`] if
    /// the computed target is already occupied.
    pub fn upgrade(
        &mut self,
        name: &str,
        target: &UpgradeTarget,
        repo: RepoKind,
    ) -> Result<PathBuf, PkError> {
        let package_dir = self.config.roots.package_dir(name, repo)?;
        if !package_dir.is_dir() {
            return Err(PkError::PackageNotFound {
                name: name.to_string(),
                repo,
            });
        }

        let versions = list_versions(&package_dir)?;
        let Some(latest) = latest_version(&versions).map(ToString::to_string) else {
            return Err(PkError::PackageNotFound {
                name: name.to_string(),
                repo,
            });
        };

        let new_version = match target {
            UpgradeTarget::Explicit(version) => version.clone(),
            UpgradeTarget::Bump(granularity) => self.next_version(name, &latest, *granularity)?,
        };

        let new_dir = package_dir.join(&new_version);
        if new_dir.exists() {
            return Err(PkError::PackageVersionExists {
                name: name.to_string(),
                version: new_version,
                repo,
            });
        }

        copy_tree(&package_dir.join(&latest), &new_dir)?;
        descriptor::replace_version(&new_dir.join(DESCRIPTOR_FILE), &latest, &new_version)?;

        Ok(new_dir)
    }

    /// Compute the next version for an automatic upgrade, falling back to
    /// an operator-supplied version for vendor or non-incrementable
    /// packages.
    fn next_version(
        &mut self,
        name: &str,
        latest: &str,
        granularity: Granularity,
    ) -> Result<String, PkError> {
        if !self.config.is_vendor(name) {
            if let Ok(parsed) = Version::parse(latest) {
                return Ok(parsed.bump(granularity).to_string());
            }
        }

        let prompt =
            format!("{name} ({latest}) is not auto-upgradable. Upgrade to a custom version? (y/n):");
        match self.confirmer.confirm(&prompt)? {
            Reply::Yes => {
                let version = self.confirmer.ask("Enter the version to upgrade to:")?;
                let version = version.trim().to_string();
                if version.is_empty() {
                    Err(PkError::UpgradeAborted(name.to_string()))
                } else {
                    Ok(version)
                }
            }
            Reply::No => Err(PkError::UpgradeAborted(name.to_string())),
            Reply::Unrecognized(input) => Err(PkError::InvalidAnswer(input)),
        }
    }

    /// Delete one version of a package, or the entire package when no
    /// version is given.
    ///
    /// Gated by interactive confirmation; whole-package deletion asks a
    /// second, stronger confirmation. Declining at either gate leaves the
    /// filesystem untouched.
    ///
    /// # Errors
    ///
    /// Returns [`PkError::InvalidAnswer`] on an unrecognized reply (nothing
    /// is deleted), and [`PkError::PackageNotFound`] if the confirmed
    /// target does not exist.
    pub fn delete(
        &mut self,
        name: &str,
        repo: RepoKind,
        version: Option<&str>,
    ) -> Result<DeleteOutcome, PkError> {
        let package_dir = self.config.roots.package_dir(name, repo)?;
        let label = version.map_or_else(|| name.to_string(), |v| format!("{name}-{v}"));

        let prompt = format!(
            "[WARNING] You are about to delete {label} from the {repo} repository. Are you sure? (y/n):"
        );
        match self.confirmer.confirm(&prompt)? {
            Reply::Yes => {}
            Reply::No => return Ok(DeleteOutcome::Declined),
            Reply::Unrecognized(input) => return Err(PkError::InvalidAnswer(input)),
        }

        let target = match version {
            Some(v) => package_dir.join(v),
            None => {
                let prompt = format!(
                    "[WARNING] No version given; this removes every version of {name}. Continue? (y/n):"
                );
                match self.confirmer.confirm(&prompt)? {
                    Reply::Yes => package_dir,
                    Reply::No => return Ok(DeleteOutcome::Declined),
                    Reply::Unrecognized(input) => return Err(PkError::InvalidAnswer(input)),
                }
            }
        };

        if !target.exists() {
            return Err(PkError::PackageNotFound { name: label, repo });
        }

        fs::remove_dir_all(&target)?;
        Ok(DeleteOutcome::Deleted(target))
    }

    /// Summarize a package across all repository kinds.
    ///
    /// Kinds without a configured root or where the package is absent are
    /// simply skipped; absence is normal, never an error. For each kind
    /// where the package exists, the summary lists every version and the
    /// latest version's description and dependency specifiers.
    ///
    /// # Errors
    ///
    /// Returns an error only on filesystem failure or an unparseable
    /// descriptor.
    pub fn read(&self, name: &str) -> Result<Vec<RepoSummary>, PkError> {
        let mut summaries = Vec::new();

        for kind in RepoKind::ALL {
            if !self.config.roots.is_configured(kind) {
                continue;
            }

            let package_dir = self.config.roots.package_dir(name, kind)?;
            if !package_dir.is_dir() {
                continue;
            }

            let versions = list_versions(&package_dir)?;
            let Some(latest) = latest_version(&versions) else {
                continue;
            };

            let descriptor_path = package_dir.join(latest).join(DESCRIPTOR_FILE);
            let (description, requires) = if descriptor_path.is_file() {
                let descriptor = Descriptor::read(&descriptor_path)?;
                let description =
                    (!descriptor.description.is_empty()).then_some(descriptor.description);
                (description, descriptor.requires)
            } else {
                (None, Vec::new())
            };

            summaries.push(RepoSummary {
                repo: kind,
                versions,
                description,
                requires,
            });
        }

        Ok(summaries)
    }

    /// Install a third-party package from the external index into the
    /// shared store location.
    ///
    /// Bypasses the version scaffolding entirely; the installer materializes
    /// the files itself. Failure is reported, never retried.
    ///
    /// # Errors
    ///
    /// Returns [`PkError::MissingStore`] if no store is configured and
    /// [`PkError::ExternalBuildFailure`] if the installer reports failure.
    pub fn install(&self, name: &str, version: &str) -> Result<PathBuf, PkError> {
        let target = self.config.pip_target.clone().ok_or(PkError::MissingStore)?;

        let report = self.installer.install(name, version, &target)?;
        if !report.success {
            return Err(PkError::ExternalBuildFailure {
                command: String::from("pip install"),
                output: report.output,
            });
        }

        Ok(target)
    }

    /// Run the external build for a package version.
    ///
    /// Resolves the source directory and install prefix for the context
    /// (`stage`: dev source into the stage repository; `show`: inside the
    /// show's own package tree) and delegates to the build collaborator.
    /// Diagnostic output is surfaced, never interpreted.
    ///
    /// # Errors
    ///
    /// Returns [`PkError::SourceNotFound`] if the resolved source directory
    /// does not exist and [`PkError::ExternalBuildFailure`] on a failing
    /// build.
    pub fn build(
        &self,
        name: &str,
        version: &str,
        context: BuildContext,
    ) -> Result<BuildReport, PkError> {
        let (source, prefix) = match context {
            BuildContext::Stage => (
                self.config.roots.package_dir(name, RepoKind::Dev)?.join(version),
                self.config.roots.root(RepoKind::Stage)?.to_path_buf(),
            ),
            BuildContext::Show => {
                let shows = self.config.shows_root.clone().ok_or(PkError::MissingShows)?;
                let tree = shows.join(name).join("package");
                (tree.join("dev").join(name).join(version), tree.join("stage"))
            }
        };

        if !source.is_dir() {
            return Err(PkError::SourceNotFound(source));
        }

        let report = self.builder.build(&source, &prefix)?;
        if !report.success {
            return Err(PkError::ExternalBuildFailure {
                command: String::from("rez-build"),
                output: report.output,
            });
        }

        Ok(report)
    }
}

/// List version directory names under a package directory, sorted.
fn list_versions(package_dir: &Path) -> io::Result<Vec<String>> {
    let mut versions = Vec::new();

    for entry in fs::read_dir(package_dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            if let Ok(name) = entry.file_name().into_string() {
                versions.push(name);
            }
        }
    }

    versions.sort();
    Ok(versions)
}

/// Pick the latest version: the semantic-version maximum when any entry
/// parses, otherwise the lexicographically greatest name. This replaces the
/// unsorted directory-listing-last behavior of earlier tooling, which was
/// filesystem-dependent.
fn latest_version(versions: &[String]) -> Option<&str> {
    let semantic = versions
        .iter()
        .filter_map(|v| Version::parse(v).ok().map(|parsed| (parsed, v.as_str())))
        .max_by_key(|(parsed, _)| *parsed);

    match semantic {
        Some((_, version)) => Some(version),
        None => versions.last().map(String::as_str),
    }
}

/// Recursively copy a directory tree, preserving symbolic links.
fn copy_tree(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let to = dst.join(entry.file_name());

        if file_type.is_dir() {
            copy_tree(&entry.path(), &to)?;
        } else if file_type.is_symlink() {
            copy_symlink(&entry.path(), &to)?;
        } else {
            fs::copy(entry.path(), &to)?;
        }
    }

    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    let target = fs::read_link(src)?;
    std::os::unix::fs::symlink(target, dst)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    // Without unix symlink support, fall back to copying the link target.
    fs::copy(src, dst).map(|_| ())
}
