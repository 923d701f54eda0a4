//! Version parsing and incrementing for package directories.
//!
//! Package versions are plain `major.minor.patch` triples. Anything else
//! (vendor packages that follow an external product's numbering, e.g.
//! `13.2v5`) is treated as non-incrementable: the automatic upgrade path
//! refuses it and the operator must supply an explicit target version.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when working with versions.
#[derive(Error, Debug)]
pub enum VersionError {
    /// The version string is not a plain `major.minor.patch` triple, so the
    /// next version cannot be computed automatically. Carries the original
    /// text unchanged.
    #[error("version '{0}' is not in major.minor.patch form and cannot be auto-incremented")]
    NotIncrementable(String),

    #[error("unknown upgrade granularity '{0}', expected one of: major, minor, patch")]
    InvalidGranularity(String),
}

/// A strict `major.minor.patch` version.
///
/// Field order gives the derived `Ord` true semantic-version ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

/// The version component targeted by an upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Major,
    Minor,
    Patch,
}

impl Version {
    /// Parse a strict `major.minor.patch` string.
    ///
    /// Pre-release and build suffixes are rejected: a directory named
    /// `1.2.3-rc1` is not something the upgrade path knows how to bump.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::NotIncrementable`] carrying the original text
    /// for any string that is not three dot-separated integers.
    pub fn parse(text: &str) -> Result<Self, VersionError> {
        let parsed = semver::Version::parse(text)
            .map_err(|_| VersionError::NotIncrementable(text.to_string()))?;

        if !parsed.pre.is_empty() || !parsed.build.is_empty() {
            return Err(VersionError::NotIncrementable(text.to_string()));
        }

        Ok(Self {
            major: parsed.major,
            minor: parsed.minor,
            patch: parsed.patch,
        })
    }

    /// Compute the next version for the given granularity.
    ///
    /// A `major` bump zeroes minor and patch, a `minor` bump zeroes patch,
    /// a `patch` bump leaves major and minor untouched.
    #[must_use]
    pub fn bump(self, granularity: Granularity) -> Self {
        match granularity {
            Granularity::Major => Self {
                major: self.major + 1,
                minor: 0,
                patch: 0,
            },
            Granularity::Minor => Self {
                minor: self.minor + 1,
                patch: 0,
                ..self
            },
            Granularity::Patch => Self {
                patch: self.patch + 1,
                ..self
            },
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Granularity {
    /// Returns the granularity as a string.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Patch => "patch",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "major" => Ok(Self::Major),
            "minor" => Ok(Self::Minor),
            "patch" => Ok(Self::Patch),
            other => Err(VersionError::InvalidGranularity(other.to_string())),
        }
    }
}
