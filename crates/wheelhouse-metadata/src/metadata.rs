use std::str::FromStr;

use mailparse::{MailHeaderMap, MailParseError};
use tracing::warn;

use pep440_rs::{Version, VersionSpecifiers};
use pep508_rs::{ExtraName, PackageName, Requirement};

use crate::MetadataError;

/// The subset of the core metadata that matters for walking dependencies.
///
/// See <https://packaging.python.org/specifications/core-metadata/>.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Metadata {
    pub metadata_version: String,
    pub name: PackageName,
    pub version: Version,
    pub requires_dist: Vec<Requirement>,
    pub requires_python: Option<VersionSpecifiers>,
    pub provides_extras: Vec<ExtraName>,
}

impl Metadata {
    /// Parse the [`Metadata`] from a `METADATA` file, as included in a built distribution (wheel).
    pub fn parse_metadata(content: &[u8]) -> Result<Self, MetadataError> {
        let headers = Headers::parse(content)?;

        let metadata_version = headers
            .get_first_value("Metadata-Version")
            .ok_or(MetadataError::FieldNotFound("Metadata-Version"))?;
        Self::from_headers(metadata_version, &headers)
    }

    /// Parse the [`Metadata`] from a source distribution's `PKG-INFO` file.
    ///
    /// Only Metadata 2.2 or later is reliable, and only when none of the fields we need are marked
    /// as dynamic: older or dynamic metadata is only known after building the distribution.
    pub fn parse_pkg_info(content: &[u8]) -> Result<Self, MetadataError> {
        let headers = Headers::parse(content)?;

        let metadata_version = headers
            .get_first_value("Metadata-Version")
            .ok_or(MetadataError::FieldNotFound("Metadata-Version"))?;

        let (major, minor) = parse_version(&metadata_version)?;
        if (major, minor) < (2, 2) || (major, minor) >= (3, 0) {
            return Err(MetadataError::UnsupportedMetadataVersion(metadata_version));
        }

        for field in headers.get_all_values("Dynamic") {
            match field.as_str() {
                "Requires-Python" => return Err(MetadataError::DynamicField("Requires-Python")),
                "Requires-Dist" => return Err(MetadataError::DynamicField("Requires-Dist")),
                "Provides-Extra" => return Err(MetadataError::DynamicField("Provides-Extra")),
                _ => (),
            }
        }

        Self::from_headers(metadata_version, &headers)
    }

    fn from_headers(metadata_version: String, headers: &Headers) -> Result<Self, MetadataError> {
        let name = PackageName::from_str(
            &headers
                .get_first_value("Name")
                .ok_or(MetadataError::FieldNotFound("Name"))?,
        )?;
        let version = headers
            .get_first_value("Version")
            .ok_or(MetadataError::FieldNotFound("Version"))?;
        let version = Version::from_str(&version)
            .map_err(|err| MetadataError::InvalidVersion(version, err))?;
        let requires_dist = headers
            .get_all_values("Requires-Dist")
            .map(|requires_dist| Requirement::from_str(&requires_dist).map_err(Box::new))
            .collect::<Result<Vec<_>, _>>()?;
        let requires_python = headers
            .get_first_value("Requires-Python")
            .and_then(
                |requires_python| match VersionSpecifiers::from_str(&requires_python) {
                    Ok(specifiers) => Some(specifiers),
                    Err(err) => {
                        warn!("Ignoring invalid `Requires-Python` for {name}: {err}");
                        None
                    }
                },
            );
        let provides_extras = headers
            .get_all_values("Provides-Extra")
            .filter_map(|provides_extra| match ExtraName::from_str(&provides_extra) {
                Ok(extra_name) => Some(extra_name),
                Err(err) => {
                    warn!("Ignoring invalid extra: {err}");
                    None
                }
            })
            .collect::<Vec<_>>();

        Ok(Self {
            metadata_version,
            name,
            version,
            requires_dist,
            requires_python,
            provides_extras,
        })
    }
}

/// Parse a `Metadata-Version` field into a (major, minor) tuple.
fn parse_version(metadata_version: &str) -> Result<(u8, u8), MetadataError> {
    let invalid = || MetadataError::InvalidMetadataVersion(metadata_version.to_string());
    let (major, minor) = metadata_version.split_once('.').ok_or_else(invalid)?;
    let major = major.parse::<u8>().map_err(|_| invalid())?;
    let minor = minor.parse::<u8>().map_err(|_| invalid())?;
    Ok((major, minor))
}

/// The headers of a distribution metadata file.
#[derive(Debug)]
struct Headers<'a>(Vec<mailparse::MailHeader<'a>>);

impl<'a> Headers<'a> {
    /// Parse the headers from the given metadata file content.
    fn parse(content: &'a [u8]) -> Result<Self, MailParseError> {
        let (headers, _) = mailparse::parse_headers(content)?;
        Ok(Self(headers))
    }

    /// Return the first value associated with the header with the given name.
    fn get_first_value(&self, name: &str) -> Option<String> {
        self.0
            .get_first_header(name)
            .map(mailparse::MailHeader::get_value)
            .filter(|value| value != "UNKNOWN")
    }

    /// Return all values associated with the header with the given name.
    fn get_all_values(&self, name: &str) -> impl Iterator<Item = String> {
        self.0
            .get_all_values(name)
            .into_iter()
            .filter(|value| value != "UNKNOWN")
    }
}
