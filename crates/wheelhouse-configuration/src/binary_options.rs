use std::fmt::{Display, Formatter};

use pep508_rs::PackageName;

use crate::{PackageNameSpecifier, PackageNameSpecifiers};

/// The distribution formats a package may be downloaded as.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AllowedFormats {
    pub binary: bool,
    pub source: bool,
}

/// The combination of `--only-binary` and `--no-binary`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BinaryPolicy {
    only_binary: OnlyBinary,
    no_binary: NoBinary,
}

impl BinaryPolicy {
    pub fn new(only_binary: OnlyBinary, no_binary: NoBinary) -> Self {
        Self {
            only_binary,
            no_binary,
        }
    }

    /// Return the formats allowed for the given package.
    ///
    /// A package named explicitly on either side takes precedence over `:all:` on the other, so
    /// `--only-binary=:all: --no-binary=foo` allows only source archives for `foo`.
    pub fn allowed_formats(&self, package_name: &PackageName) -> AllowedFormats {
        let only_binary = matches!(
            &self.only_binary,
            OnlyBinary::Packages(packages) if packages.contains(package_name)
        );
        let no_binary = matches!(
            &self.no_binary,
            NoBinary::Packages(packages) if packages.contains(package_name)
        );

        let (binary, source) = if only_binary {
            (true, false)
        } else if no_binary {
            (false, true)
        } else if matches!(self.only_binary, OnlyBinary::All) {
            (true, false)
        } else if matches!(self.no_binary, NoBinary::All) {
            (false, true)
        } else {
            (true, true)
        };

        AllowedFormats { binary, source }
    }

    /// Return the [`OnlyBinary`] strategy to use.
    pub fn only_binary(&self) -> &OnlyBinary {
        &self.only_binary
    }

    /// Return the [`NoBinary`] strategy to use.
    pub fn no_binary(&self) -> &NoBinary {
        &self.no_binary
    }
}

/// The packages for which source distributions must not be used.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum OnlyBinary {
    /// Allow source distributions for every package.
    #[default]
    None,

    /// Never use source distributions.
    All,

    /// Never use source distributions for the specific packages.
    Packages(Vec<PackageName>),
}

impl OnlyBinary {
    /// Determine the strategy from the `--only-binary` arguments.
    pub fn from_args(only_binary: Vec<PackageNameSpecifier>) -> Self {
        match PackageNameSpecifiers::from_iter(only_binary.into_iter()) {
            PackageNameSpecifiers::All => Self::All,
            PackageNameSpecifiers::None => Self::None,
            PackageNameSpecifiers::Packages(packages) => Self::Packages(packages),
        }
    }

    /// Combine a set of [`OnlyBinary`] values.
    #[must_use]
    pub fn combine(self, other: Self) -> Self {
        match (self, other) {
            (Self::None, Self::None) => Self::None,
            (Self::All, _) | (_, Self::All) => Self::All,
            (Self::Packages(a), Self::None) => Self::Packages(a),
            (Self::None, Self::Packages(b)) => Self::Packages(b),
            (Self::Packages(mut a), Self::Packages(b)) => {
                a.extend(b);
                Self::Packages(a)
            }
        }
    }

    /// Returns `true` if source distributions are disabled for every package.
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

/// The packages for which binary distributions must not be used.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum NoBinary {
    /// Allow binary distributions for every package.
    #[default]
    None,

    /// Never use binary distributions.
    All,

    /// Never use binary distributions for the specific packages.
    Packages(Vec<PackageName>),
}

impl NoBinary {
    /// Determine the strategy from the `--no-binary` arguments.
    pub fn from_args(no_binary: Vec<PackageNameSpecifier>) -> Self {
        match PackageNameSpecifiers::from_iter(no_binary.into_iter()) {
            PackageNameSpecifiers::All => Self::All,
            PackageNameSpecifiers::None => Self::None,
            PackageNameSpecifiers::Packages(packages) => Self::Packages(packages),
        }
    }

    /// Combine a set of [`NoBinary`] values.
    #[must_use]
    pub fn combine(self, other: Self) -> Self {
        match (self, other) {
            (Self::None, Self::None) => Self::None,
            (Self::All, _) | (_, Self::All) => Self::All,
            (Self::Packages(a), Self::None) => Self::Packages(a),
            (Self::None, Self::Packages(b)) => Self::Packages(b),
            (Self::Packages(mut a), Self::Packages(b)) => {
                a.extend(b);
                Self::Packages(a)
            }
        }
    }

    /// Returns `true` if no package is excluded from binary distributions.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl Display for NoBinary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str(":none:"),
            Self::All => f.write_str(":all:"),
            Self::Packages(packages) => {
                for (index, package) in packages.iter().enumerate() {
                    if index > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{package}")?;
                }
                Ok(())
            }
        }
    }
}
