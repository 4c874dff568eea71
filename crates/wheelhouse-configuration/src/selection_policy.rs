use crate::{BinaryPolicy, NoBinary, TargetOverrides};

/// An invalid combination of options, detected before any candidate search.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error(
        "When restricting platform and interpreter constraints using --python-version, --platform, --abi, or --implementation, either --no-deps must be set, or --only-binary=:all: must be set and --no-binary must not be set (or must be set to :none:)"
    )]
    CrossEnvironmentWithDependencies,
    #[error(
        "--only-binary=:all: conflicts with --no-binary={0} when restricting platform and interpreter constraints: source distributions cannot be used for a foreign environment"
    )]
    ContradictoryBinaryPolicy(NoBinary),
}

/// The policy flags that govern candidate selection.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SelectionPolicy {
    /// The `--only-binary` and `--no-binary` sets.
    pub binary: BinaryPolicy,
    /// Prefer any compatible wheel over a newer source distribution.
    pub prefer_binary: bool,
    /// Don't walk dependencies.
    pub no_deps: bool,
    /// Consider pre-releases even when a final release satisfies the requirement.
    pub prereleases: bool,
}

impl SelectionPolicy {
    /// Check that the policy is usable for the requested target environment.
    ///
    /// A source distribution is built by the running interpreter, not the target one, so a
    /// request for a foreign environment must either skip dependencies or exclude every source
    /// distribution.
    pub fn validate(&self, overrides: &TargetOverrides) -> Result<(), ConfigurationError> {
        if !overrides.is_cross() {
            return Ok(());
        }

        let only_binary_all = self.binary.only_binary().is_all();
        let no_binary = self.binary.no_binary();

        if only_binary_all && !no_binary.is_none() {
            return Err(ConfigurationError::ContradictoryBinaryPolicy(
                no_binary.clone(),
            ));
        }

        if !self.no_deps && !only_binary_all {
            return Err(ConfigurationError::CrossEnvironmentWithDependencies);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use pep508_rs::PackageName;

    use crate::{OnlyBinary, PythonVersion};

    use super::*;

    fn platform(platform: &str) -> TargetOverrides {
        TargetOverrides {
            platform: Some(platform.to_string()),
            ..TargetOverrides::default()
        }
    }

    #[test]
    fn host_environment_is_always_valid() {
        assert_eq!(
            SelectionPolicy::default().validate(&TargetOverrides::default()),
            Ok(())
        );
    }

    #[test]
    fn platform_alone_is_rejected() {
        let err = SelectionPolicy::default()
            .validate(&platform("linux_x86_64"))
            .unwrap_err();
        assert_eq!(err, ConfigurationError::CrossEnvironmentWithDependencies);
        assert!(err.to_string().contains("--only-binary=:all:"));
        assert!(err.to_string().contains("--no-deps"));
    }

    #[test]
    fn python_version_alone_is_rejected() {
        let overrides = TargetOverrides {
            python_version: Some(PythonVersion::from_str("2").unwrap()),
            ..TargetOverrides::default()
        };
        assert!(SelectionPolicy::default().validate(&overrides).is_err());
    }

    #[test]
    fn only_binary_all_is_accepted() {
        let policy = SelectionPolicy {
            binary: BinaryPolicy::new(OnlyBinary::All, NoBinary::None),
            ..SelectionPolicy::default()
        };
        assert_eq!(policy.validate(&platform("linux_x86_64")), Ok(()));
    }

    #[test]
    fn no_deps_is_accepted() {
        let policy = SelectionPolicy {
            no_deps: true,
            ..SelectionPolicy::default()
        };
        assert_eq!(policy.validate(&platform("linux_x86_64")), Ok(()));
    }

    #[test]
    fn only_binary_packages_is_rejected() {
        let policy = SelectionPolicy {
            binary: BinaryPolicy::new(
                OnlyBinary::Packages(vec![PackageName::from_str("fake").unwrap()]),
                NoBinary::None,
            ),
            ..SelectionPolicy::default()
        };
        assert!(policy.validate(&platform("linux_x86_64")).is_err());
    }

    #[test]
    fn contradictory_binary_policy() {
        let policy = SelectionPolicy {
            binary: BinaryPolicy::new(
                OnlyBinary::All,
                NoBinary::Packages(vec![PackageName::from_str("fake").unwrap()]),
            ),
            no_deps: true,
            ..SelectionPolicy::default()
        };
        let err = policy.validate(&platform("linux_x86_64")).unwrap_err();
        insta::assert_snapshot!(err, @"--only-binary=:all: conflicts with --no-binary=fake when restricting platform and interpreter constraints: source distributions cannot be used for a foreign environment");
    }
}
