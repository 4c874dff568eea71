use std::fmt::{Display, Formatter};

use pep440_rs::Version;
use pep508_rs::PackageName;
use wheelhouse_configuration::ConfigurationError;
use wheelhouse_interpreter::InterpreterError;
use wheelhouse_platform_tags::{IncompatibleTag, TagsError};

/// An error that aborts the download entirely.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Client(#[from] wheelhouse_client::Error),

    #[error("Failed to fetch `{0}`")]
    Fetch(String, #[source] wheelhouse_client::Error),

    #[error("`{0}` is not a valid wheel or source distribution filename")]
    InvalidArchive(String),

    #[error("`{filename}` is a distribution of `{actual}`, not `{expected}`")]
    ArchiveNameMismatch {
        filename: String,
        expected: PackageName,
        actual: PackageName,
    },

    #[error("Failed to determine the compatibility tags of the target environment")]
    Tags(#[from] TagsError),

    #[error("Failed to determine the marker environment of the target environment")]
    Markers(#[from] InterpreterError),

    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),
}

/// A request that could not be satisfied. Failures are collected rather than aborting the
/// download, so every unsatisfiable requirement is reported.
#[derive(Debug, thiserror::Error)]
pub enum Failure {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    NoCompatibleCandidate(#[from] NoCompatibleCandidate),

    #[error(
        "You must give at least one requirement to download (maybe you meant \"wheelhouse download <requirement>\"?)"
    )]
    EmptyRequirementSet,
}

/// No candidate survived selection for a requirement.
#[derive(Debug, Clone, thiserror::Error)]
#[error("No matching distribution found for {requirement}")]
pub struct NoCompatibleCandidate {
    /// The requirement as written.
    pub requirement: String,
    /// The dominant reason the last candidates were discarded.
    #[source]
    pub reason: IncompatibleReason,
    pub hint: Option<Hint>,
}

/// Why every candidate for a requirement was discarded.
///
/// When several reasons apply, a version mismatch wins, then a tag mismatch of any wheel that
/// satisfied the requirement, then the binary policy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IncompatibleReason {
    #[error("No distributions were found for `{0}`")]
    NoDistributions(PackageName),

    #[error("None of the available versions satisfy the requirement (available: {})", AvailableVersions(.0))]
    NoMatchingVersion(Vec<Version>),

    #[error(
        "Only source distributions are available, but source distributions are disallowed by `--only-binary`"
    )]
    OnlyBinary,

    #[error("Only wheels are available, but wheels are disallowed by `--no-binary`")]
    NoBinary,

    #[error("{}", IncompatibleWheel(.0))]
    IncompatibleTag(IncompatibleTag),
}

/// A suggestion for a failure in a cross-environment download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hint {
    /// Only source distributions were excluded, but they can't be used for a foreign
    /// environment anyway.
    SourceUnusableForTarget,
    /// Wheels exist, but none matches the requested target environment.
    TargetTags,
}

impl Display for Hint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SourceUnusableForTarget => f.write_str(
                "Source distributions can't be used for an environment selected with `--platform`, `--python-version`, `--implementation`, or `--abi`: download a wheel for the target with `--only-binary=:all:`, and skip its dependencies with `--no-deps` if they are only available as source distributions",
            ),
            Self::TargetTags => f.write_str(
                "Wheels are available, but none is compatible with the environment requested by `--platform`, `--python-version`, `--implementation`, or `--abi`",
            ),
        }
    }
}

struct AvailableVersions<'a>(&'a [Version]);

impl Display for AvailableVersions<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return f.write_str("none");
        }
        for (index, version) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{version}")?;
        }
        Ok(())
    }
}

struct IncompatibleWheel<'a>(&'a IncompatibleTag);

impl Display for IncompatibleWheel<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            IncompatibleTag::Invalid => f.write_str("No wheel has valid compatibility tags"),
            IncompatibleTag::Python => f.write_str(
                "No wheel is compatible with the target Python implementation or version",
            ),
            IncompatibleTag::Abi => f.write_str("No wheel is compatible with the target ABI"),
            IncompatibleTag::Platform => {
                f.write_str("No wheel is compatible with the target platform")
            }
        }
    }
}
