//! A standard interface for working with heterogeneous sources of requirements.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use tracing::debug;
use url::Url;

use pep508_rs::{ExtraName, InvalidNameError, Pep508Error, Requirement};
use wheelhouse_client::{File, FlatIndexLocation};
use wheelhouse_configuration::PackageNameSpecifier;
use wheelhouse_distribution_filename::SourceDistExtension;
use wheelhouse_resolver::DownloadRequest;

use crate::requirements_txt::RequirementsTxt;

#[derive(Debug)]
pub(crate) enum RequirementsSource {
    /// A requirement was provided on the command line (e.g., `colander>=0.9`).
    Package(String),
    /// Requirements were provided via a `requirements.txt` file (e.g., `-r requirements.txt`).
    RequirementsTxt(PathBuf),
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum RequirementError {
    #[error("Invalid requirement: `{0}`")]
    Pep508(String, #[source] Box<Pep508Error>),

    #[error("Invalid archive URL: `{0}`")]
    Url(String, #[source] url::ParseError),

    #[error("Expected a distribution archive, but found: `{0}`")]
    Archive(String),

    #[error("Invalid extra in `{0}`")]
    Extra(String, #[source] InvalidNameError),
}

#[derive(Debug, Default)]
pub(crate) struct RequirementsSpecification {
    /// The requirements to download, in the order they were given.
    pub(crate) requests: Vec<DownloadRequest>,
    /// The index URL specified in a requirements file.
    pub(crate) index_url: Option<Url>,
    /// The extra index URLs specified in requirements files.
    pub(crate) extra_index_urls: Vec<Url>,
    /// The `--find-links` locations specified in requirements files.
    pub(crate) find_links: Vec<FlatIndexLocation>,
    /// Whether a requirements file disabled the indexes.
    pub(crate) no_index: bool,
    pub(crate) only_binary: Vec<PackageNameSpecifier>,
    pub(crate) no_binary: Vec<PackageNameSpecifier>,
    pub(crate) prefer_binary: bool,
    pub(crate) pre: bool,
}

impl RequirementsSpecification {
    /// Read the requirements and options from a single source.
    pub(crate) fn from_source(source: &RequirementsSource, working_dir: &Path) -> Result<Self> {
        Ok(match source {
            RequirementsSource::Package(given) => {
                let request = parse_request(given, working_dir)?;
                Self {
                    requests: vec![request],
                    ..Self::default()
                }
            }
            RequirementsSource::RequirementsTxt(path) => {
                let path = working_dir.join(path);
                let requirements_txt = RequirementsTxt::parse(&path)?;
                Self {
                    requests: requirements_txt.requirements,
                    index_url: requirements_txt.index_url,
                    extra_index_urls: requirements_txt.extra_index_urls,
                    find_links: requirements_txt.find_links,
                    no_index: requirements_txt.no_index,
                    only_binary: requirements_txt.only_binary,
                    no_binary: requirements_txt.no_binary,
                    prefer_binary: requirements_txt.prefer_binary,
                    pre: requirements_txt.pre,
                }
            }
        })
    }

    /// Read the combined requirements and options from a set of sources.
    pub(crate) fn from_sources(sources: &[RequirementsSource], working_dir: &Path) -> Result<Self> {
        let mut spec = Self::default();

        for source in sources {
            let source_spec = Self::from_source(source, working_dir)
                .with_context(|| match source {
                    RequirementsSource::Package(given) => {
                        format!("Failed to parse requirement: `{given}`")
                    }
                    RequirementsSource::RequirementsTxt(path) => {
                        format!("Failed to read requirements from: `{}`", path.display())
                    }
                })?;
            spec.requests.extend(source_spec.requests);
            if let Some(index_url) = source_spec.index_url {
                if spec.index_url.as_ref().is_some_and(|existing| existing != &index_url) {
                    debug!("Multiple index URLs in requirements files, using: `{index_url}`");
                }
                spec.index_url = Some(index_url);
            }
            spec.extra_index_urls.extend(source_spec.extra_index_urls);
            spec.find_links.extend(source_spec.find_links);
            spec.no_index |= source_spec.no_index;
            spec.only_binary.extend(source_spec.only_binary);
            spec.no_binary.extend(source_spec.no_binary);
            spec.prefer_binary |= source_spec.prefer_binary;
            spec.pre |= source_spec.pre;
        }

        Ok(spec)
    }
}

/// Parse a requirement as given on the command line or in a requirements file.
///
/// A path or URL ending in a distribution extension (e.g., `./colander-0.9.9-py2.py3-none-any.whl`
/// or `https://example.com/colander-0.9.9.tar.gz`) is an archive, optionally followed by extras
/// (`./colander-0.9.9.tar.gz[docs]`). Anything else is a PEP 508 requirement. Relative paths
/// resolve against `working_dir`.
pub(crate) fn parse_request(
    given: &str,
    working_dir: &Path,
) -> Result<DownloadRequest, RequirementError> {
    let given = given.trim();

    if let Some((location, extras)) = split_archive(given) {
        let extras = extras
            .map(|extras| {
                extras
                    .split(',')
                    .map(str::trim)
                    .filter(|extra| !extra.is_empty())
                    .map(|extra| {
                        ExtraName::from_str(extra)
                            .map_err(|err| RequirementError::Extra(given.to_string(), err))
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();

        let file = if location.starts_with("http://")
            || location.starts_with("https://")
            || location.starts_with("file://")
        {
            let url = Url::parse(location)
                .map_err(|err| RequirementError::Url(location.to_string(), err))?;
            File::from_url(url)
        } else {
            File::from_path(working_dir.join(location))
        }
        .ok_or_else(|| RequirementError::Archive(location.to_string()))?;

        return Ok(DownloadRequest::Archive { file, extras });
    }

    let requirement = Requirement::from_str(given)
        .map_err(|err| RequirementError::Pep508(given.to_string(), Box::new(err)))?;
    Ok(DownloadRequest::Requirement(requirement))
}

/// If the requirement names a distribution archive, split it into the archive location and the
/// requested extras.
fn split_archive(given: &str) -> Option<(&str, Option<&str>)> {
    if given.contains(char::is_whitespace) || given.contains(';') {
        return None;
    }

    let (location, extras) = match given.strip_suffix(']') {
        Some(rest) => {
            let (location, extras) = rest.rsplit_once('[')?;
            (location, Some(extras))
        }
        None => (given, None),
    };

    // Ignore the query and fragment of a URL (e.g., `#sha256=...`).
    let path = location
        .split_once(['#', '?'])
        .map_or(location, |(path, _)| path);
    let filename = path.rsplit(['/', '\\']).next().unwrap_or(path);

    let is_archive = Path::new(filename)
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("whl"))
        || SourceDistExtension::from_filename(filename).is_some();
    is_archive.then_some((location, extras))
}
