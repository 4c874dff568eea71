//! Combine the command-line arguments with the `wheelhouse.toml` configuration file.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use tracing::debug;
use url::Url;

use wheelhouse_client::{ErrorKind, FlatIndexLocation, parse_index_url};
use wheelhouse_configuration::{
    PackageNameSpecifier, PythonVersion, PythonVersionError, TargetOverrides,
};

use crate::DownloadArgs;

#[derive(Debug, thiserror::Error)]
pub(crate) enum SettingsError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to parse: `{}`", _0.display())]
    Toml(PathBuf, #[source] Box<toml::de::Error>),

    #[error("Invalid `python-version` in `{}`", _0.display())]
    PythonVersion(PathBuf, #[source] PythonVersionError),

    #[error(transparent)]
    Location(#[from] ErrorKind),
}

/// The options that can be set in a `wheelhouse.toml` file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub(crate) struct Options {
    pub(crate) download: Option<DownloadOptions>,
}

/// The `[download]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub(crate) struct DownloadOptions {
    pub(crate) index_url: Option<String>,
    pub(crate) extra_index_url: Option<Vec<String>>,
    pub(crate) find_links: Option<Vec<String>>,
    pub(crate) no_index: Option<bool>,
    pub(crate) only_binary: Option<Vec<PackageNameSpecifier>>,
    pub(crate) no_binary: Option<Vec<PackageNameSpecifier>>,
    pub(crate) prefer_binary: Option<bool>,
    pub(crate) pre: Option<bool>,
    pub(crate) no_deps: Option<bool>,
    pub(crate) dest: Option<PathBuf>,
    pub(crate) python_version: Option<String>,
    pub(crate) platform: Option<String>,
    pub(crate) implementation: Option<String>,
    pub(crate) abi: Option<String>,
}

/// The [`Options`] as loaded from a configuration file on disk, along with the file's location.
#[derive(Debug, Clone)]
pub(crate) struct FilesystemOptions {
    path: PathBuf,
    options: Options,
}

impl FilesystemOptions {
    /// Load the options from the given file.
    pub(crate) fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let path = std::path::absolute(path)?;
        let content = fs_err::read_to_string(&path)?;
        let options = toml::from_str::<Options>(&content)
            .map_err(|err| SettingsError::Toml(path.clone(), Box::new(err)))?;
        debug!("Read configuration from: `{}`", path.display());
        Ok(Self { path, options })
    }

    /// Load the options from a `wheelhouse.toml` file in the given directory, if it exists.
    pub(crate) fn from_directory(dir: &Path) -> Result<Option<Self>, SettingsError> {
        let path = dir.join("wheelhouse.toml");
        match Self::from_file(&path) {
            Ok(options) => Ok(Some(options)),
            Err(SettingsError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("No configuration found at: `{}`", path.display());
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// The directory that relative paths in the file are resolved against.
    fn root(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new(""))
    }
}

/// The resolved settings for the `download` command.
#[derive(Debug, Clone)]
pub(crate) struct DownloadSettings {
    pub(crate) requirements: Vec<String>,
    pub(crate) requirement_files: Vec<PathBuf>,
    pub(crate) dest: PathBuf,
    pub(crate) index_url: Option<Url>,
    pub(crate) extra_index_urls: Vec<Url>,
    pub(crate) find_links: Vec<FlatIndexLocation>,
    pub(crate) no_index: bool,
    pub(crate) overrides: TargetOverrides,
    pub(crate) only_binary: Vec<PackageNameSpecifier>,
    pub(crate) no_binary: Vec<PackageNameSpecifier>,
    pub(crate) prefer_binary: bool,
    pub(crate) pre: bool,
    pub(crate) no_deps: bool,
    pub(crate) python: Option<PathBuf>,
    pub(crate) json: bool,
}

impl DownloadSettings {
    /// Resolve the settings from the command-line arguments and the configuration file.
    ///
    /// Values given on the command line take precedence. Lists from the file are only used
    /// when the command line gives none, and boolean flags are enabled by either source.
    pub(crate) fn resolve(
        args: DownloadArgs,
        filesystem: Option<FilesystemOptions>,
    ) -> Result<Self, SettingsError> {
        let cwd = std::env::current_dir()?;
        let (root, file) = match &filesystem {
            Some(filesystem) => (
                filesystem.root().to_path_buf(),
                filesystem.options.download.clone().unwrap_or_default(),
            ),
            None => (cwd.clone(), DownloadOptions::default()),
        };

        let index_url = match (args.index_url, file.index_url) {
            (Some(url), _) | (None, Some(url)) => Some(parse_index_url(&url)?),
            (None, None) => None,
        };

        let extra_index_urls = prefer(args.extra_index_url, file.extra_index_url)
            .iter()
            .map(|url| parse_index_url(url))
            .collect::<Result<Vec<_>, _>>()?;

        // Locations from the command line are relative to the working directory, locations from
        // the file are relative to the file.
        let find_links = if args.find_links.is_empty() {
            file.find_links
                .unwrap_or_default()
                .iter()
                .map(|location| FlatIndexLocation::parse(location, &root))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            args.find_links
                .iter()
                .filter(|location| !location.is_empty())
                .map(|location| FlatIndexLocation::parse(location, &cwd))
                .collect::<Result<Vec<_>, _>>()?
        };

        let dest = match (args.dest, file.dest) {
            (Some(dest), _) => cwd.join(dest),
            (None, Some(dest)) => root.join(dest),
            (None, None) => cwd,
        };

        let python_version = match (args.python_version, file.python_version) {
            (Some(version), _) => Some(version),
            (None, Some(version)) => Some(PythonVersion::from_str(&version).map_err(|err| {
                SettingsError::PythonVersion(
                    filesystem
                        .as_ref()
                        .map(|filesystem| filesystem.path.clone())
                        .unwrap_or_default(),
                    err,
                )
            })?),
            (None, None) => None,
        };

        let overrides = TargetOverrides {
            python_version,
            implementation: args.implementation.or(file.implementation),
            abi: args.abi.or(file.abi),
            platform: args.platform.or(file.platform),
        };

        Ok(Self {
            requirements: args.requirements,
            requirement_files: args.requirement,
            dest,
            index_url,
            extra_index_urls,
            find_links,
            no_index: args.no_index || file.no_index.unwrap_or(false),
            overrides,
            only_binary: prefer(args.only_binary, file.only_binary),
            no_binary: prefer(args.no_binary, file.no_binary),
            prefer_binary: args.prefer_binary || file.prefer_binary.unwrap_or(false),
            pre: args.pre || file.pre.unwrap_or(false),
            no_deps: args.no_deps || file.no_deps.unwrap_or(false),
            python: args.python,
            json: args.json,
        })
    }
}

/// Use the command-line list if it is non-empty, otherwise the list from the file.
fn prefer<T>(cli: Vec<T>, file: Option<Vec<T>>) -> Vec<T> {
    if cli.is_empty() {
        file.unwrap_or_default()
    } else {
        cli
    }
}
