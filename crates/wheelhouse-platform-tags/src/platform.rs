//! Expansion of a single platform tag into the ordered list of platform tags it accepts.

/// Architectures defined by the legacy `manylinux1` and `manylinux2010` families.
const LEGACY_X86_ARCHES: &[&str] = &["x86_64", "i686"];

/// Architectures defined by `manylinux2014`.
const MANYLINUX2014_ARCHES: &[&str] = &[
    "x86_64", "i686", "aarch64", "armv7l", "ppc64", "ppc64le", "s390x",
];

/// Return the platform tags accepted by the given platform, most-preferred first.
///
/// `glibc` is the glibc version of the running Linux host. It must be `None` when the platform
/// was requested explicitly: an explicit platform never widens to the `manylinux` family.
///
/// macOS platforms (e.g., `macosx_10_10_x86_64`) always expand to their backwards-compatible
/// chain, since a wheel built against an older SDK runs on newer releases.
pub fn compatible_platforms(platform: &str, glibc: Option<(u16, u16)>) -> Vec<String> {
    if let Some((major, minor, arch)) = parse_macos(platform) {
        let platforms = mac_platforms(major, minor, arch);
        if !platforms.is_empty() {
            return platforms;
        }
    }

    if let (Some(arch), Some(glibc)) = (platform.strip_prefix("linux_"), glibc) {
        let mut platforms = manylinux_platforms(arch, glibc);
        platforms.push(platform.to_string());
        return platforms;
    }

    vec![platform.to_string()]
}

/// Split `macosx_10_9_x86_64` into `(10, 9, "x86_64")`.
fn parse_macos(platform: &str) -> Option<(u16, u16, &str)> {
    let rest = platform.strip_prefix("macosx_")?;
    let mut parts = rest.splitn(3, '_');
    let major = parts.next()?.parse::<u16>().ok()?;
    let minor = parts.next()?.parse::<u16>().ok()?;
    let arch = parts.next().filter(|arch| !arch.is_empty())?;
    Some((major, minor, arch))
}

/// Return the macOS platform tags accepted by a target of the given version and architecture.
///
/// A wheel built for macOS `V` runs on any `V' >= V`, so the chain walks downwards from the
/// requested version. Starting with macOS 11, each yearly release bumps the major version, and
/// `universal2` binaries may still target `10.x` releases.
///
/// Source: <https://github.com/pypa/packaging/blob/fd4f11139d1c884a637be8aa26bb60a31fbc9411/packaging/tags.py#L346>
pub fn mac_platforms(major: u16, minor: u16, arch: &str) -> Vec<String> {
    let mut platforms = Vec::new();

    if major == 10 {
        for minor in (0..=minor).rev() {
            for format in darwin_binary_formats(10, minor, arch) {
                platforms.push(format!("macosx_10_{minor}_{format}"));
            }
        }
    }

    if major >= 11 {
        for minor in (1..=minor).rev() {
            for format in darwin_binary_formats(major, minor, arch) {
                platforms.push(format!("macosx_{major}_{minor}_{format}"));
            }
        }
        for major in (11..=major).rev() {
            for format in darwin_binary_formats(major, 0, arch) {
                platforms.push(format!("macosx_{major}_0_{format}"));
            }
        }
        for minor in (4..=16).rev() {
            if arch == "x86_64" {
                for format in darwin_binary_formats(10, minor, arch) {
                    platforms.push(format!("macosx_10_{minor}_{format}"));
                }
            } else {
                platforms.push(format!("macosx_10_{minor}_universal2"));
            }
        }
    }

    platforms
}

/// Determine the binary formats (fat binaries included) that can run on the given macOS version
/// and architecture.
///
/// Source: <https://github.com/pypa/packaging/blob/fd4f11139d1c884a637be8aa26bb60a31fbc9411/packaging/tags.py#L314>
pub fn darwin_binary_formats(major: u16, minor: u16, arch: &str) -> Vec<String> {
    let version = (major, minor);
    let mut formats = vec![arch.to_string()];

    match arch {
        "x86_64" => {
            if version < (10, 4) {
                return vec![];
            }
            formats.extend(["intel", "fat64", "fat32"].map(String::from));
        }
        "i386" => {
            if version < (10, 4) {
                return vec![];
            }
            formats.extend(["intel", "fat32", "fat"].map(String::from));
        }
        "ppc64" => {
            if version > (10, 5) || version < (10, 4) {
                return vec![];
            }
            formats.push("fat64".to_string());
        }
        "ppc" => {
            if version > (10, 6) {
                return vec![];
            }
            formats.extend(["fat32", "fat"].map(String::from));
        }
        _ => {}
    }

    if matches!(arch, "arm64" | "x86_64") {
        formats.push("universal2".to_string());
    }

    if matches!(arch, "x86_64" | "i386" | "ppc64" | "ppc" | "intel") {
        formats.push("universal".to_string());
    }

    formats
}

/// Return the `manylinux` platform tags supported by a host with the given glibc version, newest
/// first.
///
/// Each PEP 600 `manylinux_2_X` tag is followed by its legacy alias (`manylinux2014`,
/// `manylinux2010`, `manylinux1`) where one exists for the architecture.
pub fn manylinux_platforms(arch: &str, glibc: (u16, u16)) -> Vec<String> {
    let (major, minor) = glibc;
    if major != 2 {
        return vec![];
    }

    let floor = if LEGACY_X86_ARCHES.contains(&arch) {
        5
    } else if MANYLINUX2014_ARCHES.contains(&arch) {
        17
    } else {
        return vec![];
    };

    let mut platforms = Vec::new();
    for minor in (floor..=minor).rev() {
        platforms.push(format!("manylinux_2_{minor}_{arch}"));
        let legacy = match minor {
            17 => Some("manylinux2014"),
            12 if LEGACY_X86_ARCHES.contains(&arch) => Some("manylinux2010"),
            5 if LEGACY_X86_ARCHES.contains(&arch) => Some("manylinux1"),
            _ => None,
        };
        if let Some(legacy) = legacy {
            platforms.push(format!("{legacy}_{arch}"));
        }
    }
    platforms
}
