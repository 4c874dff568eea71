use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use url::Url;

use crate::ErrorKind;

/// The default PEP 503 simple index.
static DEFAULT_INDEX_URL: LazyLock<Url> =
    LazyLock::new(|| Url::parse("https://pypi.org/simple").unwrap());

/// A `--find-links` location: a local directory, or a URL of an HTML page listing files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlatIndexLocation {
    Path(PathBuf),
    Url(Url),
}

impl FlatIndexLocation {
    /// Parse a location, resolving relative paths against the given directory.
    ///
    /// `file://` URLs are treated as paths.
    pub fn parse(location: &str, relative_to: &Path) -> Result<Self, ErrorKind> {
        match Url::parse(location) {
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map(Self::Path)
                .map_err(|()| ErrorKind::NonFileUrl(url)),
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(Self::Url(url)),
            _ => Ok(Self::Path(relative_to.join(location))),
        }
    }
}

impl FromStr for FlatIndexLocation {
    type Err = ErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, Path::new(""))
    }
}

impl Display for FlatIndexLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Url(url) => write!(f, "{url}"),
        }
    }
}

/// The index URLs to use for fetching packages, along with the `--find-links` locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexLocations {
    index: Option<Url>,
    extra_index: Vec<Url>,
    flat_index: Vec<FlatIndexLocation>,
    no_index: bool,
}

impl Default for IndexLocations {
    /// Just PyPI.
    fn default() -> Self {
        Self {
            index: Some(DEFAULT_INDEX_URL.clone()),
            extra_index: Vec::new(),
            flat_index: Vec::new(),
            no_index: false,
        }
    }
}

impl IndexLocations {
    /// Determine the index URLs to use for fetching packages.
    ///
    /// A missing `index` falls back to PyPI.
    pub fn new(
        index: Option<Url>,
        extra_index: Vec<Url>,
        flat_index: Vec<FlatIndexLocation>,
        no_index: bool,
    ) -> Self {
        Self {
            index: index.or_else(|| Some(DEFAULT_INDEX_URL.clone())),
            extra_index,
            flat_index,
            no_index,
        }
    }

    /// Return the simple indexes to query, primary first. Empty with `--no-index`.
    pub fn indexes(&self) -> impl Iterator<Item = &Url> {
        self.index
            .iter()
            .chain(self.extra_index.iter())
            .filter(|_| !self.no_index)
    }

    /// Return the `--find-links` locations.
    pub fn flat_indexes(&self) -> impl Iterator<Item = &FlatIndexLocation> {
        self.flat_index.iter()
    }

    pub fn no_index(&self) -> bool {
        self.no_index
    }
}

/// Parse an index URL given on the command line or in a requirements file.
pub fn parse_index_url(url: &str) -> Result<Url, ErrorKind> {
    Url::parse(url).map_err(|err| ErrorKind::InvalidUrl(url.to_string(), err))
}
