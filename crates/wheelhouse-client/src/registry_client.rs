use std::path::{Path, PathBuf};

use futures::StreamExt;
use reqwest::{Client, StatusCode, header};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};
use url::Url;

use pep508_rs::PackageName;

use crate::html::SimpleHtml;
use crate::{Error, ErrorKind, File, FileLocation, IndexEntry, IndexLocations};

/// A client for fetching packages from a PEP 503 simple index and from `--find-links` locations.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    index_locations: IndexLocations,
    client: Client,
}

/// The outcome of fetching a distribution file into a destination directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    /// The path of the file in the destination directory.
    pub path: PathBuf,
    /// Whether the file already existed, in which case it was left untouched.
    pub already_downloaded: bool,
}

impl RegistryClient {
    pub fn new(index_locations: IndexLocations) -> Result<Self, Error> {
        let client = Client::builder()
            .user_agent(format!("wheelhouse/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ErrorKind::ClientBuild)?;
        Ok(Self {
            index_locations,
            client,
        })
    }

    pub fn index_locations(&self) -> &IndexLocations {
        &self.index_locations
    }

    /// Fetch the distributions of a package from every configured simple index, primary first.
    ///
    /// An index that doesn't know the package contributes no distributions.
    #[instrument(skip(self))]
    pub async fn simple(&self, package_name: &PackageName) -> Result<Vec<IndexEntry>, Error> {
        let mut entries = Vec::new();
        for index in self.index_locations.indexes() {
            let url = simple_url(index, package_name)?;
            let Some(html) = self.fetch_html(&url).await? else {
                debug!("Package `{package_name}` was not found on: {index}");
                continue;
            };
            entries.extend(html.files.into_iter().filter_map(|file| {
                let file = File {
                    filename: file.filename,
                    location: FileLocation::Url(file.url),
                };
                let entry = IndexEntry::try_from_file(file, package_name);
                if entry.is_none() {
                    debug!("Ignoring non-distribution link for `{package_name}` on: {url}");
                }
                entry
            }));
        }
        Ok(entries)
    }

    /// Fetch an HTML page, returning `None` on a 404.
    pub(crate) async fn fetch_html(&self, url: &Url) -> Result<Option<SimpleHtml>, Error> {
        debug!("Fetching: {url}");
        let response = self
            .client
            .get(url.clone())
            .header(header::ACCEPT, "text/html")
            .send()
            .await
            .map_err(|err| ErrorKind::WrappedReqwestError(url.clone(), err))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response
            .error_for_status()
            .map_err(|err| ErrorKind::WrappedReqwestError(url.clone(), err))?;

        // Relative links resolve against the final URL, after redirects.
        let base = response.url().clone();
        let text = response
            .text()
            .await
            .map_err(|err| ErrorKind::WrappedReqwestError(url.clone(), err))?;
        let html = SimpleHtml::parse(&text, &base)
            .map_err(|err| ErrorKind::BadHtml(base.clone(), err))?;
        Ok(Some(html))
    }

    /// Fetch a file into the destination directory, under its listed filename.
    ///
    /// A file that already exists in the destination is not fetched again.
    #[instrument(skip_all, fields(file = %file.filename))]
    pub async fn fetch(&self, file: &File, dest: &Path) -> Result<Fetched, Error> {
        let target = file.destination(dest);
        if target.is_file() {
            debug!("File already exists: {}", target.display());
            return Ok(Fetched {
                path: target,
                already_downloaded: true,
            });
        }

        fs_err::tokio::create_dir_all(dest).await?;
        match &file.location {
            FileLocation::Path(path) => {
                debug!("Copying: {}", path.display());
                fs_err::tokio::copy(path, &target).await?;
            }
            FileLocation::Url(url) => {
                self.download(url, dest, &target).await?;
            }
        }

        Ok(Fetched {
            path: target,
            already_downloaded: false,
        })
    }

    /// Stream a remote file to a temporary file in the destination directory, then move it into
    /// place.
    async fn download(&self, url: &Url, dest: &Path, target: &Path) -> Result<(), Error> {
        debug!("Downloading: {url}");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| ErrorKind::WrappedReqwestError(url.clone(), err))?;

        let (file, temp_path) = tempfile::NamedTempFile::new_in(dest)?.into_parts();
        let mut writer = tokio::io::BufWriter::new(tokio::fs::File::from_std(file));
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| ErrorKind::WrappedReqwestError(url.clone(), err))?;
            writer.write_all(&chunk).await?;
        }
        writer.flush().await?;
        drop(writer);

        temp_path
            .persist(target)
            .map_err(|err| ErrorKind::Persist(target.to_path_buf(), err))?;
        Ok(())
    }
}

/// The URL of a package's page on a simple index: `<index>/<name>/`.
fn simple_url(index: &Url, package_name: &PackageName) -> Result<Url, Error> {
    let mut url = index.clone();
    url.path_segments_mut()
        .map_err(|()| ErrorKind::CannotBeABase(index.clone()))?
        .pop_if_empty()
        .push(package_name.as_ref())
        .push("");
    Ok(url)
}
