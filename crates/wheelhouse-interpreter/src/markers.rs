use pep508_rs::{MarkerEnvironment, MarkerEnvironmentBuilder};
use serde::Deserialize;

use crate::InterpreterError;

/// The raw PEP 508 marker values reported by an interpreter.
///
/// Kept as plain strings so that individual values can be overridden before the
/// [`MarkerEnvironment`] is built.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MarkerValues {
    pub implementation_name: String,
    pub implementation_version: String,
    pub os_name: String,
    pub platform_machine: String,
    pub platform_python_implementation: String,
    pub platform_release: String,
    pub platform_system: String,
    pub platform_version: String,
    pub python_full_version: String,
    pub python_version: String,
    pub sys_platform: String,
}

impl MarkerValues {
    /// Override the Python version markers, preserving the platform markers.
    #[must_use]
    pub fn with_python_version(mut self, major: u8, minor: Option<u8>) -> Self {
        // Ex) `python_version == "3.12"`
        self.python_version = match minor {
            Some(minor) => format!("{major}.{minor}"),
            None => major.to_string(),
        };
        // Ex) `python_full_version == "3.12.0"`
        self.python_full_version = format!("{major}.{}.0", minor.unwrap_or(0));
        // Ex) `implementation_version == "3.12.0"`
        if self.implementation_name == "cpython" {
            self.implementation_version = self.python_full_version.clone();
        }
        self
    }

    /// Override the implementation markers for a known implementation abbreviation.
    ///
    /// Unknown abbreviations leave the markers untouched.
    #[must_use]
    pub fn with_implementation(mut self, abbreviation: &str) -> Self {
        let (implementation_name, platform_python_implementation) = match abbreviation {
            "cp" => ("cpython", "CPython"),
            "pp" => ("pypy", "PyPy"),
            "ip" => ("ironpython", "IronPython"),
            "jy" => ("jython", "Jython"),
            "graalpy" => ("graalpy", "GraalVM"),
            _ => return self,
        };
        self.implementation_name = implementation_name.to_string();
        self.platform_python_implementation = platform_python_implementation.to_string();
        self
    }

    /// Build the [`MarkerEnvironment`] used to evaluate requirement markers.
    pub fn to_environment(&self) -> Result<MarkerEnvironment, InterpreterError> {
        Ok(MarkerEnvironment::try_from(MarkerEnvironmentBuilder {
            implementation_name: &self.implementation_name,
            implementation_version: &self.implementation_version,
            os_name: &self.os_name,
            platform_machine: &self.platform_machine,
            platform_python_implementation: &self.platform_python_implementation,
            platform_release: &self.platform_release,
            platform_system: &self.platform_system,
            platform_version: &self.platform_version,
            python_full_version: &self.python_full_version,
            python_version: &self.python_version,
            sys_platform: &self.sys_platform,
        })?)
    }
}
