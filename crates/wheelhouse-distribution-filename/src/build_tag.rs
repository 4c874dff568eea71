use std::fmt::{Display, Formatter};
use std::num::ParseIntError;
use std::str::FromStr;
use std::sync::Arc;

#[derive(thiserror::Error, Debug)]
pub enum BuildTagError {
    #[error("must not be empty")]
    Empty,
    #[error("must start with a digit")]
    NoLeadingDigit,
    #[error(transparent)]
    ParseInt(#[from] ParseIntError),
}

/// The optional build tag for a wheel:
///
/// > Must start with a digit. Acts as a tie-breaker if two wheel file names are the same in all
/// > other respects (i.e. name, version, and other tags). Sort as an empty tuple if unspecified,
/// > else sort as a two-item tuple with the first item being the initial digits as an int, and the
/// > second item being the remainder of the tag as a str.
///
/// See: <https://packaging.python.org/en/latest/specifications/binary-distribution-format/#file-name-convention>
#[derive(Debug, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct BuildTag(u64, Option<Arc<str>>);

impl FromStr for BuildTag {
    type Err = BuildTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(BuildTagError::Empty);
        }

        let (prefix, suffix) = match s.find(|c: char| !c.is_ascii_digit()) {
            // Ex) `abc`
            Some(0) => return Err(BuildTagError::NoLeadingDigit),
            // Ex) `123abc`
            Some(split) => {
                let (prefix, suffix) = s.split_at(split);
                (prefix, Some(suffix))
            }
            // Ex) `123`
            None => (s, None),
        };

        Ok(Self(prefix.parse::<u64>()?, suffix.map(Arc::from)))
    }
}

impl Display for BuildTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.1 {
            Some(suffix) => write!(f, "{}{}", self.0, suffix),
            None => write!(f, "{}", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering() {
        let one = BuildTag::from_str("1").unwrap();
        let one_a = BuildTag::from_str("1a").unwrap();
        let two = BuildTag::from_str("2").unwrap();
        let ten = BuildTag::from_str("10").unwrap();
        assert!(one < one_a);
        assert!(one_a < two);
        assert!(two < ten);
        // An absent build tag sorts before any present one.
        assert!(None < Some(one));
    }

    #[test]
    fn invalid() {
        insta::assert_snapshot!(BuildTag::from_str("").unwrap_err(), @"must not be empty");
        insta::assert_snapshot!(BuildTag::from_str("a1").unwrap_err(), @"must start with a digit");
    }
}
