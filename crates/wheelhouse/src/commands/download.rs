use std::fmt::Write;
use std::path::PathBuf;

use anstream::{eprint, println};
use anyhow::{Context, Result};
use itertools::Itertools;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::debug;

use wheelhouse_client::{IndexLocations, RegistryClient};
use wheelhouse_configuration::{BinaryPolicy, NoBinary, OnlyBinary, SelectionPolicy};
use wheelhouse_interpreter::Interpreter;
use wheelhouse_resolver::{CandidateSelector, DistFinder, Resolution, TargetEnvironment};
use wheelhouse_warnings::write_error_chain;

use crate::commands::ExitStatus;
use crate::commands::reporters::DownloadReporter;
use crate::printer::Printer;
use crate::requirements::{RequirementsSource, RequirementsSpecification};
use crate::settings::DownloadSettings;

/// Download distributions compatible with the target environment, along with their dependencies.
pub(crate) async fn download(settings: DownloadSettings, mut printer: Printer) -> Result<ExitStatus> {
    let start = std::time::Instant::now();
    let working_dir = std::env::current_dir()?;

    // Requirements given as arguments come first, followed by requirements files.
    let sources = settings
        .requirements
        .iter()
        .cloned()
        .map(RequirementsSource::Package)
        .chain(
            settings
                .requirement_files
                .iter()
                .cloned()
                .map(RequirementsSource::RequirementsTxt),
        )
        .collect::<Vec<_>>();

    // Read all requirements and options from the provided sources.
    let spec = RequirementsSpecification::from_sources(&sources, &working_dir)?;

    // Options from requirements files extend the command line and configuration file.
    let policy = SelectionPolicy {
        binary: BinaryPolicy::new(
            OnlyBinary::from_args(
                settings
                    .only_binary
                    .into_iter()
                    .chain(spec.only_binary)
                    .collect(),
            ),
            NoBinary::from_args(settings.no_binary.into_iter().chain(spec.no_binary).collect()),
        ),
        prefer_binary: settings.prefer_binary || spec.prefer_binary,
        no_deps: settings.no_deps,
        prereleases: settings.pre || spec.pre,
    };

    // Reject invalid combinations before touching the network.
    wheelhouse_resolver::validate(&policy, &settings.overrides, !sources.is_empty())?;

    // Determine the target environment.
    let interpreter = Interpreter::find(settings.python.as_deref())?;
    let (major, minor) = interpreter.python_version();
    debug!(
        "Using host interpreter: {}{major}{minor} on {}",
        interpreter.implementation(),
        interpreter.platform()
    );
    let target = TargetEnvironment::new(interpreter, settings.overrides);
    let tags = target.tags()?;
    let markers = target.markers()?;
    debug!("Compatible tags for the target environment:\n{tags}");

    // Instantiate a client.
    let index_locations = IndexLocations::new(
        settings.index_url.or(spec.index_url),
        settings
            .extra_index_urls
            .into_iter()
            .chain(spec.extra_index_urls)
            .collect(),
        settings.find_links.into_iter().chain(spec.find_links).collect(),
        settings.no_index || spec.no_index,
    );
    let client = RegistryClient::new(index_locations)?;
    let flat_index = client
        .flat_index()
        .await
        .context("Failed to read the `--find-links` locations")?;
    debug!(
        "Found {} files in the `--find-links` locations",
        flat_index.len()
    );

    // Select and download the distributions.
    let selector = CandidateSelector::new(tags, policy, target.is_cross());
    let finder = DistFinder::new(&client, &flat_index, &selector, &markers, &settings.dest)
        .with_reporter(DownloadReporter::from(printer));
    let resolution = finder.download(spec.requests).await?;

    // Report every requirement that couldn't be satisfied, even in quiet mode.
    for failure in resolution.failures() {
        let mut message = String::new();
        write_error_chain(failure, &mut message)?;
        if let Some(hint) = &failure.hint {
            writeln!(message, "  {}{} {hint}", "hint".cyan().bold(), ":".bold())?;
        }
        #[allow(clippy::print_stderr)]
        {
            eprint!("{message}");
        }
    }

    if !resolution.downloads().is_empty() {
        writeln!(
            printer,
            "Successfully downloaded {}",
            resolution
                .downloads()
                .iter()
                .map(|download| download.name())
                .join(" ")
        )?;
        let s = if resolution.downloads().len() == 1 {
            ""
        } else {
            "s"
        };
        writeln!(
            printer,
            "{}",
            format!(
                "Downloaded {} in {}ms",
                format!("{} package{}", resolution.downloads().len(), s).bold(),
                start.elapsed().as_millis()
            )
            .dimmed()
        )?;
    }

    if settings.json {
        let report = DownloadReport::from_resolution(&resolution);
        #[allow(clippy::print_stdout)]
        {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    if resolution.is_success() {
        Ok(ExitStatus::Success)
    } else {
        Ok(ExitStatus::Failure)
    }
}

/// The machine-readable report printed with `--json`.
#[derive(Debug, Serialize)]
#[serde(transparent)]
struct DownloadReport(Vec<DownloadReportEntry>);

#[derive(Debug, Serialize)]
struct DownloadReportEntry {
    name: String,
    version: String,
    url: Option<String>,
    download_path: PathBuf,
    dependencies: Vec<DependencyReportEntry>,
}

#[derive(Debug, Serialize)]
struct DependencyReportEntry {
    name: String,
    version: String,
}

impl DownloadReport {
    fn from_resolution(resolution: &Resolution) -> Self {
        Self(
            resolution
                .downloads()
                .iter()
                .map(|download| DownloadReportEntry {
                    name: download.name().to_string(),
                    version: download.version().to_string(),
                    url: download
                        .file
                        .location
                        .to_url()
                        .map(|url| url.to_string()),
                    download_path: download.path.clone(),
                    // Dependencies that failed to resolve have no version to report.
                    dependencies: download
                        .dependencies
                        .iter()
                        .filter_map(|name| {
                            resolution.version(name).map(|version| DependencyReportEntry {
                                name: name.to_string(),
                                version: version.to_string(),
                            })
                        })
                        .collect(),
                })
                .collect(),
        )
    }
}
