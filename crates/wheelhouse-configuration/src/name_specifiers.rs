use std::str::FromStr;

use pep508_rs::PackageName;

/// A specifier used for the `--only-binary` and `--no-binary` flags.
///
/// This is a superset of the package name format, allowing for special values `:all:` and `:none:`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageNameSpecifier {
    All,
    None,
    Package(PackageName),
}

impl FromStr for PackageNameSpecifier {
    type Err = pep508_rs::InvalidNameError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            ":all:" => Ok(Self::All),
            ":none:" => Ok(Self::None),
            _ => Ok(Self::Package(PackageName::from_str(name)?)),
        }
    }
}

impl<'de> serde::Deserialize<'de> for PackageNameSpecifier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct Visitor;

        impl serde::de::Visitor<'_> for Visitor {
            type Value = PackageNameSpecifier;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a package name or `:all:` or `:none:`")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                PackageNameSpecifier::from_str(value).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(Visitor)
    }
}

/// Parse a comma-separated list of specifiers, as accepted by `--only-binary` (e.g.,
/// `--only-binary=numpy,scipy`).
pub fn parse_specifier_list(value: &str) -> Result<Vec<PackageNameSpecifier>, String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| PackageNameSpecifier::from_str(name).map_err(|err| err.to_string()))
        .collect()
}

/// A repeated specifier used for the `--only-binary` and `--no-binary` flags.
///
/// This is a superset of the package name format, allowing for special values `:all:` and `:none:`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageNameSpecifiers {
    All,
    None,
    Packages(Vec<PackageName>),
}

impl PackageNameSpecifiers {
    /// Combine the specifiers in order: `:none:` clears everything seen so far, `:all:` selects
    /// every package.
    pub fn from_iter(specifiers: impl Iterator<Item = PackageNameSpecifier>) -> Self {
        let mut packages = Vec::new();
        let mut all: bool = false;

        for specifier in specifiers {
            match specifier {
                PackageNameSpecifier::None => {
                    packages.clear();
                    all = false;
                }
                PackageNameSpecifier::All => {
                    all = true;
                }
                PackageNameSpecifier::Package(name) => {
                    packages.push(name);
                }
            }
        }

        if all {
            Self::All
        } else if packages.is_empty() {
            Self::None
        } else {
            Self::Packages(packages)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_resets() {
        let specifiers = parse_specifier_list(":all:,:none:,foo").unwrap();
        assert_eq!(
            PackageNameSpecifiers::from_iter(specifiers.into_iter()),
            PackageNameSpecifiers::Packages(vec![PackageName::from_str("foo").unwrap()])
        );
    }

    #[test]
    fn all_wins() {
        let specifiers = parse_specifier_list("foo, :all:").unwrap();
        assert_eq!(
            PackageNameSpecifiers::from_iter(specifiers.into_iter()),
            PackageNameSpecifiers::All
        );
    }

    #[test]
    fn deserialize() {
        let specifiers: Vec<PackageNameSpecifier> =
            serde_json::from_str(r#"[":all:", "Foo_Bar"]"#).unwrap();
        assert_eq!(
            specifiers,
            vec![
                PackageNameSpecifier::All,
                PackageNameSpecifier::Package(PackageName::from_str("foo-bar").unwrap())
            ]
        );
        assert!(serde_json::from_str::<Vec<PackageNameSpecifier>>(r#"["f!oo"]"#).is_err());
    }
}
