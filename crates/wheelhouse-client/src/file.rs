use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

use url::Url;

use pep508_rs::PackageName;
use wheelhouse_distribution_filename::DistFilename;

/// Where a distribution file can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileLocation {
    /// A file on the local filesystem, from a `--find-links` directory or a direct path.
    Path(PathBuf),
    /// A remote file.
    Url(Url),
}

impl FileLocation {
    /// Return the location as a URL, as reported in the download report.
    pub fn to_url(&self) -> Option<Url> {
        match self {
            Self::Path(path) => Url::from_file_path(path).ok(),
            Self::Url(url) => Some(url.clone()),
        }
    }
}

impl Display for FileLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Url(url) => write!(f, "{url}"),
        }
    }
}

/// A distribution file, as listed by an index or a `--find-links` location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    /// The filename exactly as listed, which is also the name it is saved under.
    pub filename: String,
    pub location: FileLocation,
}

impl File {
    /// Create a [`File`] for a local archive.
    pub fn from_path(path: PathBuf) -> Option<Self> {
        let filename = path.file_name()?.to_str()?.to_string();
        Some(Self {
            filename,
            location: FileLocation::Path(path),
        })
    }

    /// Create a [`File`] for a remote archive. `file://` URLs are treated as local paths.
    pub fn from_url(url: Url) -> Option<Self> {
        if url.scheme() == "file" {
            return Self::from_path(url.to_file_path().ok()?);
        }
        let filename = url
            .path_segments()
            .and_then(Iterator::last)
            .filter(|filename| !filename.is_empty())?;
        let filename = percent_encoding::percent_decode_str(filename)
            .decode_utf8()
            .ok()?
            .into_owned();
        Some(Self {
            filename,
            location: FileLocation::Url(url),
        })
    }

    /// The path the file is saved under in the given destination directory.
    pub fn destination(&self, dest: &Path) -> PathBuf {
        dest.join(&self.filename)
    }
}

/// A [`File`] whose filename parsed as a distribution of a specific package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub filename: DistFilename,
    pub file: File,
}

impl IndexEntry {
    /// Parse the filename of a [`File`] as a distribution of the given package.
    ///
    /// Returns `None` for files that aren't wheels or source archives of the package.
    pub fn try_from_file(file: File, package_name: &PackageName) -> Option<Self> {
        let filename = DistFilename::try_from_filename(&file.filename, package_name)?;
        Some(Self { filename, file })
    }

    /// Parse the filename of a [`File`] without knowing the package name.
    pub fn try_from_normalized_file(file: File) -> Option<Self> {
        let filename = DistFilename::try_from_normalized_filename(&file.filename)?;
        Some(Self { filename, file })
    }
}

impl Display for IndexEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.file.filename)
    }
}
