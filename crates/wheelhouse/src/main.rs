use std::path::PathBuf;
use std::process::ExitCode;

use anstream::eprint;
use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use wheelhouse_configuration::{PackageNameSpecifier, PythonVersion};

use crate::commands::ExitStatus;
use crate::printer::Printer;
use crate::settings::{DownloadSettings, FilesystemOptions};

mod commands;
mod logging;
mod printer;
mod requirements;
mod requirements_txt;
mod settings;

#[derive(Parser)]
#[command(name = "wheelhouse", author, version, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Do not print any output.
    #[arg(global = true, long, short, conflicts_with = "verbose")]
    quiet: bool,

    /// Use verbose output. Repeat for trace output (e.g., `-vv`).
    #[arg(global = true, long, short, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// The path to a `wheelhouse.toml` file to use for configuration.
    ///
    /// Defaults to `wheelhouse.toml` in the current directory, if present.
    #[arg(global = true, long, env = "WHEELHOUSE_CONFIG_FILE")]
    config_file: Option<PathBuf>,

    /// Avoid reading a `wheelhouse.toml` file.
    #[arg(global = true, long, conflicts_with = "config_file")]
    no_config: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Download distributions compatible with a target environment, along with their
    /// dependencies.
    Download(DownloadArgs),
}

#[derive(Args)]
struct DownloadArgs {
    /// The requirements to download: PEP 508 requirements (e.g., `colander>=0.9`), or paths or URLs
    /// of distribution archives.
    requirements: Vec<String>,

    /// Download all packages listed in the given requirements files.
    #[arg(long, short)]
    requirement: Vec<PathBuf>,

    /// The directory to save distributions to.
    #[arg(long, short)]
    dest: Option<PathBuf>,

    /// Locations to search for distributions, in addition to the indexes: local directories, or
    /// URLs of HTML pages listing archives.
    #[arg(long, short, env = "WHEELHOUSE_FIND_LINKS", value_delimiter = ' ')]
    find_links: Vec<String>,

    /// The URL of the Python Package Index.
    #[arg(long, short, env = "WHEELHOUSE_INDEX_URL")]
    index_url: Option<String>,

    /// Extra URLs of package indexes to use, in addition to `--index-url`.
    #[arg(long)]
    extra_index_url: Vec<String>,

    /// Ignore the package indexes, instead relying on `--find-links` locations.
    #[arg(long)]
    no_index: bool,

    /// Only use wheels compatible with the given platform (e.g., `manylinux2014_x86_64` or
    /// `macosx_10_10_x86_64`).
    ///
    /// Defaults to the platform of the running interpreter.
    #[arg(long)]
    platform: Option<String>,

    /// The Python version to download distributions for (e.g., `3`, `37`, or `3.7`).
    ///
    /// Defaults to the version of the running interpreter.
    #[arg(long)]
    python_version: Option<PythonVersion>,

    /// Only use wheels compatible with the given Python implementation (e.g., `cp`, `pp`, or
    /// `py` for implementation-agnostic wheels).
    #[arg(long)]
    implementation: Option<String>,

    /// Only use wheels compatible with the given ABI (e.g., `cp37m` or `none`).
    #[arg(long)]
    abi: Option<String>,

    /// Don't use source distributions for the given packages. Accepts `:all:` to disable
    /// source distributions for every package, and `:none:` to clear the list.
    #[arg(long, value_delimiter = ',')]
    only_binary: Vec<PackageNameSpecifier>,

    /// Don't use wheels for the given packages. Accepts `:all:` to disable wheels for every
    /// package, and `:none:` to clear the list.
    #[arg(long, value_delimiter = ',')]
    no_binary: Vec<PackageNameSpecifier>,

    /// Prefer older wheels over newer source distributions.
    #[arg(long)]
    prefer_binary: bool,

    /// Include pre-release and development versions.
    #[arg(long)]
    pre: bool,

    /// Don't download dependencies.
    #[arg(long)]
    no_deps: bool,

    /// The Python interpreter used to determine the host environment.
    #[arg(long, env = "WHEELHOUSE_PYTHON")]
    python: Option<PathBuf>,

    /// Print a JSON report of the downloaded distributions to stdout.
    #[arg(long)]
    json: bool,
}

async fn run() -> Result<ExitStatus> {
    let cli = Cli::parse();

    logging::setup_logging(logging::Level::from_verbosity(cli.verbose));

    let printer = Printer::from_flags(cli.quiet, cli.verbose);

    wheelhouse_warnings::set_enabled(!cli.quiet);

    let filesystem = if cli.no_config {
        None
    } else if let Some(config_file) = cli.config_file {
        Some(FilesystemOptions::from_file(&config_file)?)
    } else {
        FilesystemOptions::from_directory(&std::env::current_dir()?)?
    };

    match cli.command {
        Commands::Download(args) => {
            let settings = DownloadSettings::resolve(args, filesystem)?;
            commands::download(settings, printer).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(status) => status.into(),
        Err(err) => {
            let mut message = String::new();
            if wheelhouse_warnings::write_error_chain(err.as_ref(), &mut message).is_ok() {
                #[allow(clippy::print_stderr)]
                {
                    eprint!("{message}");
                }
            }
            ExitStatus::Error.into()
        }
    }
}
