//! External collaborators: the build system and the package index.
//!
//! The core never compiles anything itself. It resolves a source directory
//! and an install prefix and hands them to a [`BuildRunner`]; the runner's
//! diagnostic output is surfaced verbatim, never interpreted. Third-party
//! installs go through an [`IndexInstaller`] the same way.

use std::fmt;
use std::path::Path;
use std::process::Command;
use std::str::FromStr;
use thiserror::Error;

/// Errors from launching an external collaborator.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("failed to launch {command}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("unknown build context '{0}', expected one of: stage, show")]
    UnknownContext(String),
}

/// Outcome of one external invocation: a success flag plus the captured
/// diagnostic output (stdout and stderr combined).
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub success: bool,
    pub output: String,
}

/// Where a build installs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildContext {
    /// Build the dev package into the stage repository.
    Stage,
    /// Build inside a show's own package tree.
    Show,
}

impl BuildContext {
    /// Returns the context as a string.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stage => "stage",
            Self::Show => "show",
        }
    }
}

impl fmt::Display for BuildContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BuildContext {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stage" => Ok(Self::Stage),
            "show" => Ok(Self::Show),
            other => Err(BuildError::UnknownContext(other.to_string())),
        }
    }
}

/// External build invocation: compile and install a package given its
/// source directory and an install prefix.
pub trait BuildRunner {
    /// Run the build.
    ///
    /// # Errors
    ///
    /// Returns an error only if the collaborator cannot be launched; a
    /// failing build is reported through [`BuildReport::success`].
    fn build(&self, source_dir: &Path, prefix: &Path) -> Result<BuildReport, BuildError>;
}

/// The `rez-build` command-line build system.
#[derive(Debug, Default)]
pub struct RezBuildRunner;

impl BuildRunner for RezBuildRunner {
    fn build(&self, source_dir: &Path, prefix: &Path) -> Result<BuildReport, BuildError> {
        let output = Command::new("rez-build")
            .args(["--install", "--clean", "--prefix"])
            .arg(prefix)
            .current_dir(source_dir)
            .output()
            .map_err(|source| BuildError::Spawn {
                command: String::from("rez-build"),
                source,
            })?;

        Ok(BuildReport {
            success: output.status.success(),
            output: combine_output(&output.stdout, &output.stderr),
        })
    }
}

/// External package-index installer: place a third-party package and its
/// dependencies into a target directory.
pub trait IndexInstaller {
    /// Install `name==version` into `target`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the installer cannot be launched; a failed
    /// install is reported through [`BuildReport::success`].
    fn install(&self, name: &str, version: &str, target: &Path)
        -> Result<BuildReport, BuildError>;
}

/// The pip command-line installer.
#[derive(Debug, Default)]
pub struct PipInstaller;

impl IndexInstaller for PipInstaller {
    fn install(
        &self,
        name: &str,
        version: &str,
        target: &Path,
    ) -> Result<BuildReport, BuildError> {
        let output = Command::new("pip")
            .arg("install")
            .arg(format!("{name}=={version}"))
            .arg("--target")
            .arg(target)
            .output()
            .map_err(|source| BuildError::Spawn {
                command: String::from("pip"),
                source,
            })?;

        Ok(BuildReport {
            success: output.status.success(),
            output: combine_output(&output.stdout, &output.stderr),
        })
    }
}

fn combine_output(stdout: &[u8], stderr: &[u8]) -> String {
    let mut text = String::from_utf8_lossy(stdout).into_owned();
    let err = String::from_utf8_lossy(stderr);
    if !err.is_empty() {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&err);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_from_str() {
        assert_eq!("stage".parse::<BuildContext>().unwrap(), BuildContext::Stage);
        assert_eq!("show".parse::<BuildContext>().unwrap(), BuildContext::Show);
        assert!(matches!(
            "release".parse::<BuildContext>(),
            Err(BuildError::UnknownContext(_))
        ));
    }

    #[test]
    fn combine_output_joins_streams() {
        assert_eq!(combine_output(b"out", b"err"), "out\nerr");
        assert_eq!(combine_output(b"", b"err"), "err");
        assert_eq!(combine_output(b"out\n", b""), "out\n");
    }
}
