//! Walk the requirements breadth-first, selecting and downloading one distribution per package.
//!
//! Every package is selected at most once: the first requirement that reaches a package decides
//! its distribution, and later requirements for the same package only contribute extras.

use std::collections::VecDeque;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, instrument};

use pep440_rs::Version;
use pep508_rs::{ExtraName, MarkerEnvironment, PackageName, Requirement, VersionOrUrl};
use wheelhouse_client::{File, FlatIndex, IndexEntry, RegistryClient};
use wheelhouse_distribution_filename::DistFilename;
use wheelhouse_metadata::{Metadata, read_archive};
use wheelhouse_warnings::warn_user;

use crate::candidate_selector::CandidateSelector;
use crate::error::{NoCompatibleCandidate, ResolveError};

/// A top-level request: a requirement, or an archive given by path or URL.
#[derive(Debug, Clone)]
pub enum DownloadRequest {
    /// A named requirement (e.g., `colander>=0.9`), selected from the indexes and `--find-links`
    /// locations. A direct reference (`name @ https://...`) is fetched from its URL instead.
    Requirement(Requirement),
    /// A distribution archive given by path or URL, with the extras requested for it.
    Archive { file: File, extras: Vec<ExtraName> },
}

impl Display for DownloadRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Requirement(requirement) => write!(f, "{requirement}"),
            Self::Archive { file, .. } => write!(f, "{}", file.location),
        }
    }
}

/// A distribution that was selected and is present in the destination directory.
#[derive(Debug, Clone)]
pub struct Download {
    pub filename: DistFilename,
    /// Where the distribution was fetched from.
    pub file: File,
    /// The path of the distribution in the destination directory.
    pub path: PathBuf,
    /// Whether the file was already present and wasn't fetched again.
    pub already_downloaded: bool,
    /// Whether the distribution was requested directly rather than as a dependency.
    pub requested: bool,
    /// The packages this distribution depends on in the target environment.
    pub dependencies: Vec<PackageName>,
}

impl Download {
    pub fn name(&self) -> &PackageName {
        self.filename.name()
    }

    pub fn version(&self) -> &Version {
        self.filename.version()
    }
}

impl Display for Download {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}=={}", self.name(), self.version())
    }
}

/// The outcome of a download: every selected distribution, in selection order, and every
/// requirement that could not be satisfied.
#[derive(Debug, Default)]
pub struct Resolution {
    downloads: Vec<Download>,
    failures: Vec<NoCompatibleCandidate>,
}

impl Resolution {
    pub fn downloads(&self) -> &[Download] {
        &self.downloads
    }

    pub fn failures(&self) -> &[NoCompatibleCandidate] {
        &self.failures
    }

    /// Returns `true` if every requirement was satisfied.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Return the selected version of a package, if any.
    pub fn version(&self, package_name: &PackageName) -> Option<&Version> {
        self.downloads
            .iter()
            .find(|download| download.name() == package_name)
            .map(Download::version)
    }
}

pub trait Reporter: Send + Sync {
    /// Callback to invoke when a distribution is present in the destination directory.
    fn on_download(&self, download: &Download);

    /// Callback to invoke when the walk is complete.
    fn on_complete(&self);
}

pub struct DistFinder<'a> {
    client: &'a RegistryClient,
    flat_index: &'a FlatIndex,
    selector: &'a CandidateSelector,
    markers: &'a MarkerEnvironment,
    dest: &'a Path,
    reporter: Option<Box<dyn Reporter>>,
}

impl<'a> DistFinder<'a> {
    /// Initialize a new distribution finder.
    pub fn new(
        client: &'a RegistryClient,
        flat_index: &'a FlatIndex,
        selector: &'a CandidateSelector,
        markers: &'a MarkerEnvironment,
        dest: &'a Path,
    ) -> Self {
        Self {
            client,
            flat_index,
            selector,
            markers,
            dest,
            reporter: None,
        }
    }

    /// Set the [`Reporter`] to use for this finder.
    #[must_use]
    pub fn with_reporter(self, reporter: impl Reporter + 'static) -> Self {
        Self {
            reporter: Some(Box::new(reporter)),
            ..self
        }
    }

    /// Select and download a distribution for every request and, unless `--no-deps` is set, for
    /// every dependency they pull in.
    ///
    /// A requirement that can't be satisfied is recorded in the [`Resolution`] and the walk
    /// continues; network and filesystem errors abort it.
    pub async fn download(
        &self,
        requests: Vec<DownloadRequest>,
    ) -> Result<Resolution, ResolveError> {
        let mut state = WalkState::default();
        let mut queue = requests
            .into_iter()
            .map(|request| Pending {
                request,
                parent: None,
            })
            .collect::<VecDeque<_>>();

        while let Some(pending) = queue.pop_front() {
            self.visit(pending, &mut state, &mut queue).await?;
        }

        if let Some(reporter) = self.reporter.as_ref() {
            reporter.on_complete();
        }

        Ok(Resolution {
            downloads: state.downloads,
            failures: state.failures,
        })
    }

    #[instrument(skip_all, fields(request = %pending.request))]
    async fn visit(
        &self,
        pending: Pending,
        state: &mut WalkState,
        queue: &mut VecDeque<Pending>,
    ) -> Result<(), ResolveError> {
        let request = Request::from_pending(&pending)?;

        if pending.parent.is_none() {
            if let Some(requirement) = request.requirement {
                if !requirement.evaluate_markers(self.markers, &[]) {
                    warn_user!(
                        "Ignoring `{requirement}`: markers don't match the target environment"
                    );
                    return Ok(());
                }
            }
        }

        // The package was already selected: merge, but never reselect.
        if let Some(&index) = state.selected.get(&request.name) {
            let selected = state.downloads[index].version().clone();
            let conflicts = match &request.source {
                Source::Archive(archive) => archive.filename.version() != &selected,
                Source::Index(requirement) => match &requirement.version_or_url {
                    Some(VersionOrUrl::VersionSpecifier(specifiers)) => {
                        !specifiers.contains(&selected)
                    }
                    Some(VersionOrUrl::Url(_)) | None => false,
                },
            };
            if conflicts {
                warn_user!(
                    "Ignoring `{}`{}: `{}=={selected}` was already selected",
                    pending.request,
                    RequiredBy(pending.parent.as_ref()),
                    request.name,
                );
            }
            self.expand(index, request.extras, state, queue);
            return Ok(());
        }

        // The package already failed; the failure was reported the first time.
        if state.failed.contains(&request.name) {
            return Ok(());
        }

        let selected = match &request.source {
            Source::Archive(archive) => self.selector.select_archive(archive).cloned(),
            Source::Index(requirement) => {
                let mut candidates = self.flat_index.entries(&request.name);
                candidates.extend(self.client.simple(&request.name).await?);
                debug!("Found {} candidate(s) for `{requirement}`", candidates.len());
                self.selector.select(requirement, &candidates).cloned()
            }
        };
        let entry = match selected {
            Ok(entry) => entry,
            Err(failure) => {
                debug!("{failure}: {}", failure.reason);
                state.failed.insert(request.name);
                state.failures.push(failure);
                return Ok(());
            }
        };

        let fetched = self
            .client
            .fetch(&entry.file, self.dest)
            .await
            .map_err(|err| ResolveError::Fetch(entry.file.filename.clone(), err))?;

        let metadata = if self.selector.policy().no_deps {
            None
        } else {
            let path = fetched.path.clone();
            let filename = entry.filename.clone();
            match tokio::task::spawn_blocking(move || read_archive(&path, &filename)).await? {
                Ok(metadata) => Some(metadata),
                Err(err) => {
                    warn_user!(
                        "Failed to read the metadata of `{}`, so its dependencies will not be downloaded: {err}",
                        entry.file.filename
                    );
                    None
                }
            }
        };

        let download = Download {
            filename: entry.filename,
            file: entry.file,
            path: fetched.path,
            already_downloaded: fetched.already_downloaded,
            requested: pending.parent.is_none(),
            dependencies: Vec::new(),
        };
        if let Some(reporter) = self.reporter.as_ref() {
            reporter.on_download(&download);
        }

        let index = state.downloads.len();
        state.selected.insert(request.name, index);
        state.downloads.push(download);
        state.packages.push(PackageState {
            metadata,
            extras: FxHashSet::default(),
            enqueued: FxHashSet::default(),
        });
        self.expand(index, request.extras, state, queue);

        Ok(())
    }

    /// Enqueue the dependencies of a selected package that are active for its requested extras.
    ///
    /// Called again whenever a later requirement asks for more extras; dependencies that were
    /// already enqueued are skipped.
    fn expand(
        &self,
        index: usize,
        extras: Vec<ExtraName>,
        state: &mut WalkState,
        queue: &mut VecDeque<Pending>,
    ) {
        let package = &mut state.packages[index];
        package.extras.extend(extras);
        let Some(metadata) = &package.metadata else {
            return;
        };

        let extras = package.extras.iter().cloned().collect::<Vec<_>>();
        let download = &mut state.downloads[index];
        for (position, requirement) in metadata.requires_dist.iter().enumerate() {
            if package.enqueued.contains(&position) {
                continue;
            }
            if !requirement.evaluate_markers(self.markers, &extras) {
                continue;
            }
            package.enqueued.insert(position);
            if !download.dependencies.contains(&requirement.name) {
                download.dependencies.push(requirement.name.clone());
            }
            debug!("Adding dependency `{requirement}` of `{download}`");
            queue.push_back(Pending {
                request: DownloadRequest::Requirement(requirement.clone()),
                parent: Some(download.name().clone()),
            });
        }
    }
}

/// A request waiting in the queue, with the package that pulled it in.
#[derive(Debug)]
struct Pending {
    request: DownloadRequest,
    parent: Option<PackageName>,
}

/// A [`Pending`] request, with its package name and archive resolved.
struct Request<'a> {
    name: PackageName,
    extras: Vec<ExtraName>,
    /// The requirement as written, for named requests and direct references.
    requirement: Option<&'a Requirement>,
    source: Source<'a>,
}

/// Where the candidates for a [`Request`] come from.
enum Source<'a> {
    /// The indexes and `--find-links` locations.
    Index(&'a Requirement),
    /// A single archive, given by path or URL.
    Archive(IndexEntry),
}

impl<'a> Request<'a> {
    fn from_pending(pending: &'a Pending) -> Result<Self, ResolveError> {
        match &pending.request {
            DownloadRequest::Requirement(requirement) => {
                let source = if let Some(VersionOrUrl::Url(url)) = &requirement.version_or_url {
                    let file = File::from_url(url.to_url())
                        .ok_or_else(|| ResolveError::InvalidArchive(url.to_string()))?;
                    let archive = IndexEntry::try_from_normalized_file(file.clone())
                        .ok_or_else(|| ResolveError::InvalidArchive(file.filename.clone()))?;
                    if archive.filename.name() != &requirement.name {
                        return Err(ResolveError::ArchiveNameMismatch {
                            filename: file.filename,
                            expected: requirement.name.clone(),
                            actual: archive.filename.name().clone(),
                        });
                    }
                    Source::Archive(archive)
                } else {
                    Source::Index(requirement)
                };
                Ok(Self {
                    name: requirement.name.clone(),
                    extras: requirement.extras.clone(),
                    requirement: Some(requirement),
                    source,
                })
            }
            DownloadRequest::Archive { file, extras } => {
                let archive = IndexEntry::try_from_normalized_file(file.clone())
                    .ok_or_else(|| ResolveError::InvalidArchive(file.filename.clone()))?;
                Ok(Self {
                    name: archive.filename.name().clone(),
                    extras: extras.clone(),
                    requirement: None,
                    source: Source::Archive(archive),
                })
            }
        }
    }
}

#[derive(Default)]
struct WalkState {
    downloads: Vec<Download>,
    /// The per-package walk state, parallel to `downloads`.
    packages: Vec<PackageState>,
    selected: FxHashMap<PackageName, usize>,
    failed: FxHashSet<PackageName>,
    failures: Vec<NoCompatibleCandidate>,
}

struct PackageState {
    /// `None` with `--no-deps`, or if the metadata couldn't be read.
    metadata: Option<Metadata>,
    extras: FxHashSet<ExtraName>,
    /// Positions in `Requires-Dist` that were already enqueued.
    enqueued: FxHashSet<usize>,
}

struct RequiredBy<'a>(Option<&'a PackageName>);

impl Display for RequiredBy<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(parent) => write!(f, " (required by `{parent}`)"),
            None => Ok(()),
        }
    }
}
