use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use url::Url;

use crate::html;

#[derive(Debug)]
pub struct Error {
    kind: Box<ErrorKind>,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.kind, f)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.kind.source()
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self {
            kind: Box::new(kind),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    #[error("Invalid index URL: `{0}`")]
    InvalidUrl(String, #[source] url::ParseError),

    #[error("Expected a file URL, but received: {0}")]
    NonFileUrl(Url),

    #[error("Failed to read `--find-links` directory: {}", _0.display())]
    FindLinksDirectory(PathBuf, #[source] std::io::Error),

    #[error("Failed to read `--find-links` URL: {0}")]
    FindLinksUrl(Url, #[source] Box<Error>),

    #[error("Failed to fetch: `{0}`")]
    WrappedReqwestError(Url, #[source] reqwest::Error),

    #[error("Failed to parse the HTML page at: `{0}`")]
    BadHtml(Url, #[source] html::Error),

    #[error("Index URL cannot be used as a base: `{0}`")]
    CannotBeABase(Url),

    #[error("Failed to build the HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to persist the download at `{}`", _0.display())]
    Persist(PathBuf, #[source] tempfile::PathPersistError),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::from(ErrorKind::Io(err))
    }
}
