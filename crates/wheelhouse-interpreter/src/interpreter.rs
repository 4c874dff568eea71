use std::path::Path;
use std::process::Command;

use pep508_rs::MarkerEnvironment;
use serde::Deserialize;
use tracing::debug;

use crate::host::HostPlatform;
use crate::{InterpreterError, MarkerValues};

/// The Python version assumed when no interpreter is available.
const FALLBACK_VERSION: (u8, u8) = (3, 12);

/// The identity of the running Python interpreter: everything needed to derive compatibility
/// tags and evaluate requirement markers for it.
#[derive(Debug, Clone)]
pub struct Interpreter {
    implementation: String,
    python_version: (u8, u8),
    abi: Option<String>,
    platform: String,
    glibc: Option<(u16, u16)>,
    marker_values: MarkerValues,
    markers: MarkerEnvironment,
}

impl Interpreter {
    /// Detect the interpreter info for the given Python executable.
    pub fn query(executable: &Path) -> Result<Self, InterpreterError> {
        debug!("Querying interpreter at: {}", executable.display());
        let info = InterpreterQueryResult::query(executable)?;
        Self::from_query(executable, info)
    }

    /// Find the interpreter used to determine the host identity.
    ///
    /// An explicitly requested executable must be queryable. Otherwise, the first of `python3` or
    /// `python` on the `PATH` is used, falling back to [`Interpreter::fallback`] if neither exists
    /// or can be queried.
    pub fn find(python: Option<&Path>) -> Result<Self, InterpreterError> {
        if let Some(python) = python {
            let executable = if python.components().count() > 1 {
                python.to_path_buf()
            } else {
                which::which(python)?
            };
            return Self::query(&executable);
        }

        for name in ["python3", "python"] {
            let Ok(executable) = which::which(name) else {
                continue;
            };
            match Self::query(&executable) {
                Ok(interpreter) => return Ok(interpreter),
                Err(err) => debug!("Ignoring `{}`: {err}", executable.display()),
            }
        }

        debug!("No usable Python interpreter found, using the build host identity");
        Self::fallback()
    }

    /// Build an interpreter identity from the host platform alone, assuming CPython 3.12.
    pub fn fallback() -> Result<Self, InterpreterError> {
        let host = HostPlatform::detect();
        let (major, minor) = FALLBACK_VERSION;
        let marker_values = host.markers(major, minor);
        Self::artificial(
            "cp",
            FALLBACK_VERSION,
            Some(format!("cp{major}{minor}")),
            host.platform,
            host.glibc,
            marker_values,
        )
    }

    /// Create an interpreter identity from its parts, e.g., for tests.
    pub fn artificial(
        implementation: impl Into<String>,
        python_version: (u8, u8),
        abi: Option<String>,
        platform: impl Into<String>,
        glibc: Option<(u16, u16)>,
        marker_values: MarkerValues,
    ) -> Result<Self, InterpreterError> {
        let markers = marker_values.to_environment()?;
        Ok(Self {
            implementation: implementation.into(),
            python_version,
            abi,
            platform: platform.into(),
            glibc,
            marker_values,
            markers,
        })
    }

    fn from_query(executable: &Path, info: InterpreterQueryResult) -> Result<Self, InterpreterError> {
        let InterpreterQueryResult::Success {
            implementation,
            python_version,
            abi,
            platform,
            glibc,
            markers,
        } = info
        else {
            return Err(InterpreterError::Unsupported {
                interpreter: executable.to_path_buf(),
                reason: "Python 3 is required to determine the target environment".to_string(),
            });
        };
        Self::artificial(implementation, python_version, abi, platform, glibc, markers)
    }

    /// The implementation abbreviation, e.g., `cp` or `pp`.
    pub fn implementation(&self) -> &str {
        &self.implementation
    }

    /// The Python version as a `(major, minor)` tuple.
    pub fn python_version(&self) -> (u8, u8) {
        self.python_version
    }

    /// The ABI tag, e.g., `cp312`, if the interpreter has one.
    pub fn abi(&self) -> Option<&str> {
        self.abi.as_deref()
    }

    /// The platform tag, e.g., `linux_x86_64` or `macosx_14_0_arm64`.
    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// The glibc version of a Linux host.
    pub fn glibc(&self) -> Option<(u16, u16)> {
        self.glibc
    }

    /// The raw marker values, for callers that need to override some of them.
    pub fn marker_values(&self) -> &MarkerValues {
        &self.marker_values
    }

    /// Returns the [`MarkerEnvironment`] for this Python executable.
    pub fn markers(&self) -> &MarkerEnvironment {
        &self.markers
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "result", rename_all = "lowercase")]
enum InterpreterQueryResult {
    Success {
        implementation: String,
        python_version: (u8, u8),
        abi: Option<String>,
        platform: String,
        glibc: Option<(u16, u16)>,
        markers: MarkerValues,
    },
    Error {
        kind: String,
    },
}

impl InterpreterQueryResult {
    /// Return the resolved [`InterpreterQueryResult`] for the given Python executable.
    fn query(interpreter: &Path) -> Result<Self, InterpreterError> {
        let output = Command::new(interpreter)
            .args(["-c", include_str!("get_interpreter_info.py")])
            .output()
            .map_err(|err| InterpreterError::PythonSubcommandLaunch {
                interpreter: interpreter.to_path_buf(),
                err,
            })?;

        // stderr isn't technically a criterion for success, but there should be no stderr output
        // and if there is, we want to know
        if !output.status.success() || !output.stderr.is_empty() {
            return Err(InterpreterError::PythonSubcommandOutput {
                message: format!(
                    "Querying Python at `{}` failed with status {}",
                    interpreter.display(),
                    output.status,
                ),
                stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let result = serde_json::from_slice::<Self>(&output.stdout).map_err(|err| {
            InterpreterError::PythonSubcommandOutput {
                message: format!(
                    "Querying Python at `{}` did not return the expected data: {err}",
                    interpreter.display(),
                ),
                stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
        })?;

        if let Self::Error { kind } = &result {
            debug!("Interpreter at `{}` reported: {kind}", interpreter.display());
        }

        Ok(result)
    }
}
