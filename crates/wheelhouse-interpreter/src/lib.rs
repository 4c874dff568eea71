use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use crate::interpreter::Interpreter;
pub use crate::markers::MarkerValues;

mod host;
mod interpreter;
mod markers;

#[derive(Debug, Error)]
pub enum InterpreterError {
    #[error("Failed to run the Python interpreter at `{}`", interpreter.display())]
    PythonSubcommandLaunch {
        interpreter: PathBuf,
        #[source]
        err: io::Error,
    },
    #[error("{message}:\n--- stdout:\n{stdout}\n--- stderr:\n{stderr}\n---")]
    PythonSubcommandOutput {
        message: String,
        stdout: String,
        stderr: String,
    },
    #[error("Python interpreter at `{}` is not supported: {reason}", interpreter.display())]
    Unsupported { interpreter: PathBuf, reason: String },
    #[error("Invalid marker environment value")]
    InvalidMarkers(#[from] pep440_rs::VersionParseError),
    #[error("Failed to locate a Python interpreter")]
    Which(#[from] which::Error),
}
