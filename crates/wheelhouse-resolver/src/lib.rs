pub use candidate_selector::CandidateSelector;
pub use error::{Failure, Hint, IncompatibleReason, NoCompatibleCandidate, ResolveError};
pub use finder::{DistFinder, Download, DownloadRequest, Reporter, Resolution};
pub use target::TargetEnvironment;

use wheelhouse_configuration::{SelectionPolicy, TargetOverrides};

mod candidate_selector;
mod error;
mod finder;
mod target;

/// Check a download request before any candidate search.
///
/// `has_sources` is `false` if no requirement and no requirements file was given at all. An
/// empty requirements file is not an error.
pub fn validate(
    policy: &SelectionPolicy,
    overrides: &TargetOverrides,
    has_sources: bool,
) -> Result<(), Failure> {
    policy.validate(overrides)?;
    if !has_sources {
        return Err(Failure::EmptyRequirementSet);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use wheelhouse_configuration::{ConfigurationError, SelectionPolicy, TargetOverrides};

    use super::*;

    #[test]
    fn empty_requirement_set() {
        let err = validate(&SelectionPolicy::default(), &TargetOverrides::default(), false)
            .unwrap_err();
        assert!(matches!(err, Failure::EmptyRequirementSet));
        assert!(
            err.to_string()
                .starts_with("You must give at least one requirement to download")
        );
    }

    #[test]
    fn configuration_is_checked_first() {
        let overrides = TargetOverrides {
            platform: Some("linux_x86_64".to_string()),
            ..TargetOverrides::default()
        };
        let err = validate(&SelectionPolicy::default(), &overrides, false).unwrap_err();
        assert!(matches!(
            err,
            Failure::Configuration(ConfigurationError::CrossEnvironmentWithDependencies)
        ));
    }

    #[test]
    fn valid() {
        assert!(validate(&SelectionPolicy::default(), &TargetOverrides::default(), true).is_ok());
    }
}
