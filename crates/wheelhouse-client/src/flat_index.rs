use std::path::Path;

use fs_err as fs;
use tracing::{debug, instrument};

use pep508_rs::PackageName;

use crate::{Error, ErrorKind, File, FileLocation, FlatIndexLocation, IndexEntry, RegistryClient};

/// The files listed by all `--find-links` locations, in the order the locations were given.
#[derive(Debug, Clone, Default)]
pub struct FlatIndex {
    files: Vec<File>,
}

impl FlatIndex {
    /// Create a [`FlatIndex`] from already-collected files.
    pub fn from_files(files: Vec<File>) -> Self {
        Self { files }
    }

    /// Return the distributions of the given package, in listing order.
    ///
    /// Files that aren't distributions of the package are skipped.
    pub fn entries(&self, package_name: &PackageName) -> Vec<IndexEntry> {
        self.files
            .iter()
            .filter_map(|file| IndexEntry::try_from_file(file.clone(), package_name))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }
}

impl RegistryClient {
    /// Read every `--find-links` location into a [`FlatIndex`].
    #[instrument(skip_all)]
    pub async fn flat_index(&self) -> Result<FlatIndex, Error> {
        let mut files = Vec::new();
        for location in self.index_locations().flat_indexes() {
            match location {
                FlatIndexLocation::Path(path) => {
                    let entries = read_from_directory(path)
                        .map_err(|err| ErrorKind::FindLinksDirectory(path.clone(), err))?;
                    debug!(
                        "Found {} file(s) in `--find-links` directory: {}",
                        entries.len(),
                        path.display()
                    );
                    files.extend(entries);
                }
                FlatIndexLocation::Url(url) => {
                    let html = self
                        .fetch_html(url)
                        .await
                        .map_err(|err| ErrorKind::FindLinksUrl(url.clone(), Box::new(err)))?;
                    let Some(html) = html else {
                        debug!("`--find-links` page not found: {url}");
                        continue;
                    };
                    debug!(
                        "Found {} link(s) on `--find-links` page: {url}",
                        html.files.len()
                    );
                    files.extend(html.files.into_iter().map(|file| File {
                        filename: file.filename,
                        location: FileLocation::Url(file.url),
                    }));
                }
            }
        }
        Ok(FlatIndex::from_files(files))
    }
}

/// List the files of a `--find-links` directory, sorted by filename. Subdirectories are not
/// searched.
fn read_from_directory(path: &Path) -> Result<Vec<File>, std::io::Error> {
    let mut files = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            continue;
        }
        let path = entry.path();
        if path.is_dir() {
            // A symlink to a directory.
            continue;
        }
        let Some(file) = File::from_path(path) else {
            debug!(
                "Ignoring non-UTF-8 filename in `--find-links` directory: {}",
                entry.path().display()
            );
            continue;
        };
        files.push(file);
    }
    files.sort_unstable_by(|a, b| a.filename.cmp(&b.filename));
    Ok(files)
}
