//! Identity of the build host, used when no Python interpreter can be queried.

use std::process::Command;
use std::sync::LazyLock;

use regex::Regex;
use target_lexicon::HOST;
use tracing::trace;

use crate::MarkerValues;

/// The operating system and architecture of the running host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HostPlatform {
    /// The platform tag, e.g., `linux_x86_64` or `macosx_14_0_arm64`.
    pub(crate) platform: String,
    /// The glibc version, on Linux hosts that use glibc.
    pub(crate) glibc: Option<(u16, u16)>,
    /// `platform_machine`, as Python would report it.
    pub(crate) machine: String,
    /// `platform_system`, as Python would report it.
    pub(crate) system: String,
    /// `sys_platform`, as Python would report it.
    pub(crate) sys_platform: String,
    /// `os_name`, as Python would report it.
    pub(crate) os_name: String,
}

impl HostPlatform {
    pub(crate) fn detect() -> Self {
        let os = HOST.operating_system.to_string();
        let arch = HOST.architecture.to_string();
        let environment = HOST.environment.to_string();

        match os.as_str() {
            "linux" => {
                let glibc = if environment.starts_with("musl") {
                    None
                } else {
                    detect_glibc_version_from_ldd()
                };
                Self {
                    platform: format!("linux_{arch}"),
                    glibc,
                    machine: arch,
                    system: "Linux".to_string(),
                    sys_platform: "linux".to_string(),
                    os_name: "posix".to_string(),
                }
            }
            "darwin" | "macos" => {
                let arch = if arch == "aarch64" {
                    "arm64".to_string()
                } else {
                    arch
                };
                let (major, minor) = detect_mac_os_version().unwrap_or((11, 0));
                Self {
                    platform: format!("macosx_{major}_{minor}_{arch}"),
                    glibc: None,
                    machine: arch,
                    system: "Darwin".to_string(),
                    sys_platform: "darwin".to_string(),
                    os_name: "posix".to_string(),
                }
            }
            "windows" => {
                let platform = match arch.as_str() {
                    "x86_64" => "win_amd64",
                    "aarch64" => "win_arm64",
                    _ => "win32",
                };
                Self {
                    platform: platform.to_string(),
                    glibc: None,
                    machine: if arch == "x86_64" {
                        "AMD64".to_string()
                    } else {
                        arch
                    },
                    system: "Windows".to_string(),
                    sys_platform: "win32".to_string(),
                    os_name: "nt".to_string(),
                }
            }
            _ => Self {
                platform: format!("{os}_{arch}"),
                glibc: None,
                machine: arch,
                system: os.clone(),
                sys_platform: os,
                os_name: "posix".to_string(),
            },
        }
    }

    /// Marker values for a CPython interpreter of the given version on this host.
    pub(crate) fn markers(&self, major: u8, minor: u8) -> MarkerValues {
        let version = format!("{major}.{minor}.0");
        MarkerValues {
            implementation_name: "cpython".to_string(),
            implementation_version: version.clone(),
            os_name: self.os_name.clone(),
            platform_machine: self.machine.clone(),
            platform_python_implementation: "CPython".to_string(),
            platform_release: String::new(),
            platform_system: self.system.clone(),
            platform_version: String::new(),
            python_full_version: version,
            python_version: format!("{major}.{minor}"),
            sys_platform: self.sys_platform.clone(),
        }
    }
}

fn detect_glibc_version_from_ldd() -> Option<(u16, u16)> {
    let output = match Command::new("ldd").arg("--version").output() {
        Ok(output) => output,
        Err(err) => {
            trace!("Failed to execute `ldd --version` for glibc: {err}");
            return None;
        }
    };
    glibc_ldd_output_to_version(&output.stdout)
        .or_else(|| glibc_ldd_output_to_version(&output.stderr))
}

fn glibc_ldd_output_to_version(output: &[u8]) -> Option<(u16, u16)> {
    static RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"ldd \(.+\) ([0-9]+)\.([0-9]+)").unwrap());

    let output = std::str::from_utf8(output).ok()?;
    trace!("Output from `ldd --version`: {output:?}");
    let (_, [major, minor]) = RE.captures(output).map(|c| c.extract())?;
    Some((major.parse().ok()?, minor.parse().ok()?))
}

fn detect_mac_os_version() -> Option<(u16, u16)> {
    let output = Command::new("sw_vers").arg("-productVersion").output().ok()?;
    parse_mac_os_version(std::str::from_utf8(&output.stdout).ok()?)
}

/// Parse the output of `sw_vers -productVersion`. Starting with macOS 11, only the major version
/// is part of the platform tag.
fn parse_mac_os_version(version: &str) -> Option<(u16, u16)> {
    let mut parts = version.trim().split('.');
    let major = parts.next()?.parse::<u16>().ok()?;
    let minor = parts
        .next()
        .map(str::parse::<u16>)
        .transpose()
        .ok()?
        .unwrap_or(0);
    if major >= 11 {
        Some((major, 0))
    } else {
        Some((major, minor))
    }
}
