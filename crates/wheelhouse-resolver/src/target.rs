use pep508_rs::MarkerEnvironment;
use wheelhouse_configuration::TargetOverrides;
use wheelhouse_interpreter::{Interpreter, InterpreterError};
use wheelhouse_platform_tags::{TagSpec, Tags, TagsError, compatible_platforms};

/// The environment distributions are selected for: the running interpreter, with any of its
/// Python version, implementation, ABI or platform replaced by an explicit override.
#[derive(Debug, Clone)]
pub struct TargetEnvironment {
    interpreter: Interpreter,
    overrides: TargetOverrides,
}

impl TargetEnvironment {
    pub fn new(interpreter: Interpreter, overrides: TargetOverrides) -> Self {
        Self {
            interpreter,
            overrides,
        }
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn overrides(&self) -> &TargetOverrides {
        &self.overrides
    }

    /// Returns `true` if any override was given, i.e., distributions are selected for an
    /// environment other than the running one.
    pub fn is_cross(&self) -> bool {
        self.overrides.is_cross()
    }

    /// The inputs to tag generation. Each override narrows its own slot; every other slot keeps
    /// the running interpreter's value.
    pub fn tag_spec(&self) -> TagSpec {
        let implementation = self
            .overrides
            .implementation
            .clone()
            .unwrap_or_else(|| self.interpreter.implementation().to_string());

        let (major, versions) = if let Some(python_version) = &self.overrides.python_version {
            (python_version.major(), vec![python_version.tag()])
        } else {
            // Ex) `["37", "36", ..., "30"]`
            let (major, minor) = self.interpreter.python_version();
            (
                major,
                (0..=minor)
                    .rev()
                    .map(|minor| format!("{major}{minor}"))
                    .collect(),
            )
        };

        let abi = self
            .overrides
            .abi
            .clone()
            .or_else(|| self.interpreter.abi().map(ToString::to_string));

        // An explicit platform never widens to the `manylinux` family.
        let platforms = if let Some(platform) = &self.overrides.platform {
            compatible_platforms(platform, None)
        } else {
            compatible_platforms(self.interpreter.platform(), self.interpreter.glibc())
        };

        TagSpec {
            abi3: implementation == "cp" && major == 3,
            implementation,
            versions,
            abi,
            platforms,
        }
    }

    /// Build the ordered set of compatibility tags the target environment accepts.
    pub fn tags(&self) -> Result<Tags, TagsError> {
        Tags::from_spec(&self.tag_spec())
    }

    /// The marker environment used to evaluate dependency markers.
    ///
    /// The running interpreter's markers, with the Python version and implementation markers
    /// replaced by their overrides.
    pub fn markers(&self) -> Result<MarkerEnvironment, InterpreterError> {
        let mut markers = self.interpreter.marker_values().clone();
        if let Some(python_version) = &self.overrides.python_version {
            markers = markers.with_python_version(python_version.major(), python_version.minor());
        }
        if let Some(implementation) = &self.overrides.implementation {
            markers = markers.with_implementation(implementation);
        }
        markers.to_environment()
    }
}
