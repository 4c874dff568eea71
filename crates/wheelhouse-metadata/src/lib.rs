//! Read the core metadata of wheels and source distributions.

use std::io;

use mailparse::MailParseError;
use thiserror::Error;

use pep440_rs::{VersionParseError, VersionSpecifiersParseError};
use pep508_rs::{InvalidNameError, Pep508Error};
use wheelhouse_distribution_filename::SourceDistExtension;

pub use archive::read_archive;
pub use metadata::Metadata;

mod archive;
mod metadata;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("Failed to read zip archive")]
    Zip(#[from] zip::result::ZipError),
    #[error(transparent)]
    MailParse(#[from] MailParseError),
    #[error("Metadata field {0} not found")]
    FieldNotFound(&'static str),
    #[error("Invalid version: {0}")]
    InvalidVersion(String, #[source] VersionParseError),
    #[error(transparent)]
    InvalidRequiresPython(#[from] VersionSpecifiersParseError),
    #[error(transparent)]
    InvalidRequirement(#[from] Box<Pep508Error>),
    #[error(transparent)]
    InvalidName(#[from] InvalidNameError),
    #[error("Invalid `Metadata-Version` field: {0}")]
    InvalidMetadataVersion(String),
    #[error("Reading metadata from `PKG-INFO` requires Metadata 2.2 or later (found: {0})")]
    UnsupportedMetadataVersion(String),
    #[error("The following field was marked as dynamic: {0}")]
    DynamicField(&'static str),
    #[error("No `.dist-info/METADATA` file found in `{0}`")]
    MissingDistInfo(String),
    #[error("Multiple `.dist-info` directories found in `{0}`: {1}")]
    MultipleDistInfo(String, String),
    #[error("No `PKG-INFO` file found in `{0}`")]
    MissingPkgInfo(String),
    #[error("Reading metadata from `.{0}` source distributions is not supported")]
    UnsupportedArchive(SourceDistExtension),
}
