use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// A Python version requested with `--python-version`.
///
/// Accepts a major version (`3`), a major and minor version without a separator (`27`, `310`),
/// or a dotted version (`3.7`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PythonVersion {
    major: u8,
    minor: Option<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum PythonVersionError {
    #[error("Python version must not be empty")]
    Empty,
    #[error("Invalid Python version `{0}`: expected a major version (e.g., `3`), or a major and minor version (e.g., `37` or `3.7`)")]
    Invalid(String),
}

impl FromStr for PythonVersion {
    type Err = PythonVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PythonVersionError::Empty);
        }
        let invalid = || PythonVersionError::Invalid(s.to_string());

        if let Some((major, minor)) = s.split_once('.') {
            // Ex) `3.7`
            let major = major.parse::<u8>().map_err(|_| invalid())?;
            let minor = minor.parse::<u8>().map_err(|_| invalid())?;
            return Ok(Self {
                major,
                minor: Some(minor),
            });
        }

        if !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        // Ex) `3`, `27`, or `310`
        let (major, minor) = s.split_at(1);
        let major = major.parse::<u8>().map_err(|_| invalid())?;
        let minor = if minor.is_empty() {
            None
        } else {
            Some(minor.parse::<u8>().map_err(|_| invalid())?)
        };
        Ok(Self { major, minor })
    }
}

impl Display for PythonVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.minor {
            Some(minor) => write!(f, "{}.{minor}", self.major),
            None => write!(f, "{}", self.major),
        }
    }
}

impl PythonVersion {
    pub fn new(major: u8, minor: Option<u8>) -> Self {
        Self { major, minor }
    }

    pub fn major(&self) -> u8 {
        self.major
    }

    pub fn minor(&self) -> Option<u8> {
        self.minor
    }

    /// The version as used in compatibility tags, e.g., `37` or `3`.
    pub fn tag(&self) -> String {
        match self.minor {
            Some(minor) => format!("{}{minor}", self.major),
            None => self.major.to_string(),
        }
    }
}

/// The target environment overrides given on the command line.
///
/// Every field that is `None` defaults to the identity of the running interpreter.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TargetOverrides {
    pub python_version: Option<PythonVersion>,
    pub implementation: Option<String>,
    pub abi: Option<String>,
    pub platform: Option<String>,
}

impl TargetOverrides {
    /// Returns `true` if any override was supplied, in which case the download targets an
    /// environment other than the running one.
    pub fn is_cross(&self) -> bool {
        self.python_version.is_some()
            || self.implementation.is_some()
            || self.abi.is_some()
            || self.platform.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse() {
        let version = PythonVersion::from_str("2").unwrap();
        assert_eq!((version.major(), version.minor()), (2, None));
        assert_eq!(version.tag(), "2");

        let version = PythonVersion::from_str("27").unwrap();
        assert_eq!((version.major(), version.minor()), (2, Some(7)));
        assert_eq!(version.tag(), "27");

        let version = PythonVersion::from_str("310").unwrap();
        assert_eq!((version.major(), version.minor()), (3, Some(10)));

        let version = PythonVersion::from_str("3.10").unwrap();
        assert_eq!(version.tag(), "310");
        assert_eq!(version.to_string(), "3.10");
    }

    #[test]
    fn invalid() {
        insta::assert_snapshot!(PythonVersion::from_str("").unwrap_err(), @"Python version must not be empty");
        insta::assert_snapshot!(
            PythonVersion::from_str("three").unwrap_err(),
            @"Invalid Python version `three`: expected a major version (e.g., `3`), or a major and minor version (e.g., `37` or `3.7`)"
        );
        assert!(PythonVersion::from_str("3.7.1").is_err());
    }

    #[test]
    fn cross() {
        assert!(!TargetOverrides::default().is_cross());
        let overrides = TargetOverrides {
            abi: Some("none".to_string()),
            ..TargetOverrides::default()
        };
        assert!(overrides.is_cross());
    }
}
