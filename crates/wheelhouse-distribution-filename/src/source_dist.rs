use std::fmt::{Display, Formatter};
use std::str::FromStr;

use thiserror::Error;

use pep440_rs::{Version, VersionParseError};
use pep508_rs::{InvalidNameError, PackageName};

/// The archive format of a source distribution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceDistExtension {
    Zip,
    TarGz,
    TarBz2,
    TarXz,
    TarZst,
    Tar,
}

impl SourceDistExtension {
    /// Split a filename into its stem and source distribution extension.
    ///
    /// Returns `None` if the filename doesn't end with a known source archive extension.
    pub fn from_filename(filename: &str) -> Option<(&str, Self)> {
        const SUFFIXES: &[(&str, SourceDistExtension)] = &[
            (".zip", SourceDistExtension::Zip),
            (".tar.gz", SourceDistExtension::TarGz),
            (".tgz", SourceDistExtension::TarGz),
            (".tar.bz2", SourceDistExtension::TarBz2),
            (".tbz", SourceDistExtension::TarBz2),
            (".tar.xz", SourceDistExtension::TarXz),
            (".txz", SourceDistExtension::TarXz),
            (".tar.zst", SourceDistExtension::TarZst),
            (".tar", SourceDistExtension::Tar),
        ];
        SUFFIXES.iter().find_map(|(suffix, extension)| {
            filename
                .strip_suffix(suffix)
                .filter(|stem| !stem.is_empty())
                .map(|stem| (stem, *extension))
        })
    }
}

impl Display for SourceDistExtension {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Zip => f.write_str("zip"),
            Self::TarGz => f.write_str("tar.gz"),
            Self::TarBz2 => f.write_str("tar.bz2"),
            Self::TarXz => f.write_str("tar.xz"),
            Self::TarZst => f.write_str("tar.zst"),
            Self::Tar => f.write_str("tar"),
        }
    }
}

/// A parsed `<name>-<version>.<extension>` source archive filename.
///
/// The name and version are normalized, so `to_string` doesn't always give back the original
/// filename.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceDistFilename {
    pub name: PackageName,
    pub version: Version,
    pub extension: SourceDistExtension,
}

impl SourceDistFilename {
    /// Parse a source archive filename of a known package.
    ///
    /// Both the name and the version may contain `-` (e.g., `a-1-1.zip`), so the package name
    /// decides where the version starts.
    pub fn parse(
        filename: &str,
        package_name: &PackageName,
    ) -> Result<Self, SourceDistFilenameError> {
        let error = |kind| SourceDistFilenameError {
            filename: filename.to_string(),
            kind,
        };
        let (stem, extension) = split_extension(filename).map_err(error)?;

        let name_len = package_name.as_ref().len();
        let version = stem
            .get(..name_len)
            .zip(stem.get(name_len..))
            .and_then(|(name, rest)| {
                let name = PackageName::from_str(name).ok()?;
                (&name == package_name).then_some(rest)
            })
            .and_then(|rest| rest.strip_prefix('-'))
            .filter(|version| !version.is_empty())
            .ok_or_else(|| error(ErrorKind::Filename(package_name.clone())))?;

        Ok(Self {
            name: package_name.clone(),
            version: Version::from_str(version).map_err(|err| error(ErrorKind::Version(err)))?,
            extension,
        })
    }

    /// Parse a source archive filename without knowing the package name.
    ///
    /// The version is taken to be everything after the last `-`, which holds for normalized
    /// filenames.
    pub fn parsed_normalized_filename(filename: &str) -> Result<Self, SourceDistFilenameError> {
        let error = |kind| SourceDistFilenameError {
            filename: filename.to_string(),
            kind,
        };
        let (stem, extension) = split_extension(filename).map_err(error)?;
        let (name, version) = stem.rsplit_once('-').ok_or_else(|| error(ErrorKind::Minus))?;

        Ok(Self {
            name: PackageName::from_str(name).map_err(|err| error(ErrorKind::PackageName(err)))?,
            version: Version::from_str(version).map_err(|err| error(ErrorKind::Version(err)))?,
            extension,
        })
    }
}

fn split_extension(filename: &str) -> Result<(&str, SourceDistExtension), ErrorKind> {
    SourceDistExtension::from_filename(filename).ok_or(ErrorKind::Extension)
}

impl Display for SourceDistFilename {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}.{}", self.name, self.version, self.extension)
    }
}

#[derive(Error, Debug, Clone)]
#[error("Failed to parse source distribution filename {filename}: {kind}")]
pub struct SourceDistFilenameError {
    filename: String,
    kind: ErrorKind,
}

#[derive(Error, Debug, Clone)]
enum ErrorKind {
    #[error("Name doesn't start with package name {0}")]
    Filename(PackageName),
    #[error("Source distributions filenames must end with .zip, .tar.gz, .tgz, .tar.bz2, .tbz, .tar.xz, .txz, .tar.zst, or .tar")]
    Extension,
    #[error("Version section is invalid")]
    Version(#[source] VersionParseError),
    #[error(transparent)]
    PackageName(InvalidNameError),
    #[error("Missing name-version separator")]
    Minus,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use pep508_rs::PackageName;

    use crate::{SourceDistExtension, SourceDistFilename};

    #[test]
    fn roundtrip() {
        for normalized in [
            "foo-lib-1.2.3.zip",
            "foo-lib-1.2.3a3.zip",
            "foo-lib-1.2.3.tar.gz",
            "foo-lib-1.2.3.tar.bz2",
            "foo-lib-1.2.3.tar.zst",
        ] {
            assert_eq!(
                SourceDistFilename::parse(normalized, &PackageName::from_str("foo_lib").unwrap())
                    .unwrap()
                    .to_string(),
                normalized
            );
        }
    }

    #[test]
    fn short_extensions() {
        let filename =
            SourceDistFilename::parse("source-1.0.tgz", &PackageName::from_str("source").unwrap())
                .unwrap();
        assert_eq!(filename.extension, SourceDistExtension::TarGz);
        assert_eq!(filename.to_string(), "source-1.0.tar.gz");
    }

    #[test]
    fn errors() {
        for invalid in ["b-1.2.3.zip", "a-1.2.3-gamma.3.zip", "a-1.2.3.tar.zstd", "ab-1.0.zip"] {
            assert!(
                SourceDistFilename::parse(invalid, &PackageName::from_str("a").unwrap()).is_err()
            );
        }
    }

    #[test]
    fn name_too_long() {
        assert!(
            SourceDistFilename::parse("foo.zip", &PackageName::from_str("foo-lib").unwrap())
                .is_err()
        );
    }

    #[test]
    fn error_message() {
        let err = SourceDistFilename::parse("a-1.0.rar", &PackageName::from_str("a").unwrap())
            .unwrap_err();
        insta::assert_snapshot!(err, @"Failed to parse source distribution filename a-1.0.rar: Source distributions filenames must end with .zip, .tar.gz, .tgz, .tar.bz2, .tbz, .tar.xz, .txz, .tar.zst, or .tar");
    }

    #[test]
    fn normalized() {
        let filename = SourceDistFilename::parsed_normalized_filename("INITools-0.1.tar.gz").unwrap();
        assert_eq!(filename.name.as_ref(), "initools");
        assert_eq!(filename.version.to_string(), "0.1");
    }
}
