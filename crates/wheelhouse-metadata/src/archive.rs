use std::io::{Read, Seek};
use std::path::Path;
use std::str::FromStr;

use flate2::read::GzDecoder;
use fs_err as fs;
use tracing::debug;
use zip::ZipArchive;

use pep508_rs::PackageName;
use wheelhouse_distribution_filename::{DistFilename, SourceDistExtension, WheelFilename};

use crate::{Metadata, MetadataError};

/// Read the [`Metadata`] of a downloaded distribution archive.
pub fn read_archive(path: &Path, filename: &DistFilename) -> Result<Metadata, MetadataError> {
    debug!("Reading metadata from: {}", path.display());
    match filename {
        DistFilename::WheelFilename(wheel) => {
            let mut archive = ZipArchive::new(fs::File::open(path)?)?;
            read_wheel_metadata(wheel, &mut archive)
        }
        DistFilename::SourceDistFilename(source_dist) => match source_dist.extension {
            SourceDistExtension::Zip => {
                let mut archive = ZipArchive::new(fs::File::open(path)?)?;
                read_zip_pkg_info(&filename.to_string(), &mut archive)
            }
            SourceDistExtension::TarGz => {
                let reader = GzDecoder::new(fs::File::open(path)?);
                read_tar_pkg_info(&filename.to_string(), reader)
            }
            SourceDistExtension::Tar => {
                read_tar_pkg_info(&filename.to_string(), fs::File::open(path)?)
            }
            extension @ (SourceDistExtension::TarBz2
            | SourceDistExtension::TarXz
            | SourceDistExtension::TarZst) => Err(MetadataError::UnsupportedArchive(extension)),
        },
    }
}

/// Find the `.dist-info/METADATA` file of a wheel and parse it.
fn read_wheel_metadata<R: Read + Seek>(
    filename: &WheelFilename,
    archive: &mut ZipArchive<R>,
) -> Result<Metadata, MetadataError> {
    let metadata = format!("{}/METADATA", find_dist_info(filename, archive.file_names())?);
    let mut content = Vec::new();
    archive.by_name(&metadata)?.read_to_end(&mut content)?;
    Metadata::parse_metadata(&content)
}

/// Find the `.dist-info` directory of a wheel.
///
/// Prefers the directory whose name matches the wheel's package name, and otherwise accepts the
/// only top-level `.dist-info` directory that contains a `METADATA` file.
fn find_dist_info<'a>(
    filename: &WheelFilename,
    files: impl Iterator<Item = &'a str>,
) -> Result<&'a str, MetadataError> {
    let candidates = files
        .filter_map(|path| path.strip_suffix("/METADATA"))
        .filter(|dir| !dir.contains('/'))
        .filter(|dir| dir.ends_with(".dist-info"))
        .collect::<Vec<_>>();

    let matching = candidates.iter().copied().find(|dir| {
        dir.trim_end_matches(".dist-info")
            .rsplit_once('-')
            .and_then(|(name, _version)| PackageName::from_str(name).ok())
            .is_some_and(|name| name == filename.name)
    });
    if let Some(dir) = matching {
        return Ok(dir);
    }

    match candidates.as_slice() {
        [] => Err(MetadataError::MissingDistInfo(filename.to_string())),
        [dir] => Ok(dir),
        dirs => Err(MetadataError::MultipleDistInfo(
            filename.to_string(),
            dirs.join(", "),
        )),
    }
}

/// Return `true` if the path is `<top>/PKG-INFO`.
fn is_top_level_pkg_info(path: &str) -> bool {
    let path = path.trim_start_matches("./");
    path.strip_suffix("/PKG-INFO")
        .is_some_and(|top| !top.is_empty() && !top.contains('/'))
}

fn read_zip_pkg_info<R: Read + Seek>(
    filename: &str,
    archive: &mut ZipArchive<R>,
) -> Result<Metadata, MetadataError> {
    let Some(pkg_info) = archive
        .file_names()
        .find(|path| is_top_level_pkg_info(path))
        .map(ToString::to_string)
    else {
        return Err(MetadataError::MissingPkgInfo(filename.to_string()));
    };
    let mut content = Vec::new();
    archive.by_name(&pkg_info)?.read_to_end(&mut content)?;
    Metadata::parse_pkg_info(&content)
}

fn read_tar_pkg_info(filename: &str, reader: impl Read) -> Result<Metadata, MetadataError> {
    let mut archive = tar::Archive::new(reader);
    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?;
        if !is_top_level_pkg_info(&path.to_string_lossy()) {
            continue;
        }
        let mut content = Vec::new();
        entry.read_to_end(&mut content)?;
        return Metadata::parse_pkg_info(&content);
    }
    Err(MetadataError::MissingPkgInfo(filename.to_string()))
}
