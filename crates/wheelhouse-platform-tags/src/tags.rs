use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::{cmp, num::NonZeroU32};

use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Debug, thiserror::Error)]
pub enum TagsError {
    #[error("At least one Python version is required to generate compatibility tags")]
    NoVersions,
    #[error("Invalid Python version tag: `{0}`")]
    InvalidVersion(String),
    #[error("At least one platform is required to generate compatibility tags")]
    NoPlatforms,
    #[error("Invalid priority: `{0}`")]
    InvalidPriority(usize, #[source] std::num::TryFromIntError),
}

/// The closest-matching part of an incompatible wheel tag.
///
/// Ordered by how close the match was: a wheel with a compatible Python and ABI tag but an
/// unsupported platform is "closer" than one with an unsupported Python tag.
#[derive(Debug, Eq, Ord, PartialEq, PartialOrd, Copy, Clone)]
pub enum IncompatibleTag {
    /// The tag is invalid and cannot be used.
    Invalid,
    /// The Python implementation or version tag is incompatible.
    Python,
    /// The ABI tag is incompatible.
    Abi,
    /// The platform tag is incompatible.
    Platform,
}

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum TagCompatibility {
    Incompatible(IncompatibleTag),
    Compatible(TagPriority),
}

impl Ord for TagCompatibility {
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        match (self, other) {
            (Self::Compatible(p_self), Self::Compatible(p_other)) => p_self.cmp(p_other),
            (Self::Incompatible(_), Self::Compatible(_)) => cmp::Ordering::Less,
            (Self::Compatible(_), Self::Incompatible(_)) => cmp::Ordering::Greater,
            (Self::Incompatible(t_self), Self::Incompatible(t_other)) => t_self.cmp(t_other),
        }
    }
}

impl PartialOrd for TagCompatibility {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(Self::cmp(self, other))
    }
}

impl TagCompatibility {
    /// Returns `true` if the tag is compatible.
    pub fn is_compatible(&self) -> bool {
        matches!(self, Self::Compatible(_))
    }
}

/// A single `(interpreter, abi, platform)` compatibility tag, e.g., `cp37-cp37m-manylinux1_x86_64`.
///
/// The vocabulary is open: custom implementation codes like `fk2` are as valid as `cp37`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag {
    pub python: String,
    pub abi: String,
    pub platform: String,
}

impl Tag {
    pub fn new(python: impl Into<String>, abi: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            python: python.into(),
            abi: abi.into(),
            platform: platform.into(),
        }
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}-{}", self.python, self.abi, self.platform)
    }
}

/// The inputs to tag generation, resolved from the target environment.
#[derive(Debug, Clone)]
pub struct TagSpec {
    /// The implementation abbreviation, e.g., `cp`, `pp`, or a custom code like `fk`.
    pub implementation: String,
    /// Version strings, most-preferred first, e.g., `["37", "36", ..., "30"]` or `["2"]`.
    pub versions: Vec<String>,
    /// The preferred ABI tag (e.g., `cp37m`), if any.
    pub abi: Option<String>,
    /// Whether the stable `abi3` ABI is acceptable.
    pub abi3: bool,
    /// Platform tags, most-preferred first.
    pub platforms: Vec<String>,
}

/// A set of compatible tags for a given Python version and platform.
///
/// Its principle function is to determine whether the tags for a particular
/// wheel are compatible with the current environment.
#[derive(Debug, Clone)]
pub struct Tags {
    /// `python_tag` |--> `abi_tag` |--> `platform_tag` |--> priority
    #[allow(clippy::type_complexity)]
    map: Arc<FxHashMap<String, FxHashMap<String, FxHashMap<String, TagPriority>>>>,
    /// The tags, most-preferred first.
    ordered: Arc<[Tag]>,
}

impl Tags {
    /// Create a new set of tags.
    ///
    /// Tags are prioritized based on their position in the given vector. Specifically, tags that
    /// appear earlier in the vector are given higher priority than tags that appear later.
    /// Duplicates keep their first (highest-priority) position.
    pub fn new(tags: Vec<Tag>) -> Result<Self, TagsError> {
        let mut seen = FxHashSet::default();
        let ordered = tags
            .into_iter()
            .filter(|tag| seen.insert(tag.clone()))
            .collect::<Vec<_>>();

        let mut map = FxHashMap::default();
        for (index, tag) in ordered.iter().rev().enumerate() {
            map.entry(tag.python.clone())
                .or_insert(FxHashMap::default())
                .entry(tag.abi.clone())
                .or_insert(FxHashMap::default())
                .entry(tag.platform.clone())
                .or_insert(TagPriority::try_from(index)?);
        }

        Ok(Self {
            map: Arc::new(map),
            ordered: Arc::from(ordered),
        })
    }

    /// Generate the ordered tag set for the given [`TagSpec`].
    ///
    /// The order, most-preferred first:
    /// 1. The preferred version with each ABI (explicit, `abi3`, `none`) on each platform.
    /// 2. `abi3` for each older version.
    /// 3. `py<major>` with no ABI on each platform.
    /// 4. The implementation with no ABI on `any`, for the preferred and the major version.
    /// 5. Generic `py<version>` tags on `any`, followed by `py<major>`.
    pub fn from_spec(spec: &TagSpec) -> Result<Self, TagsError> {
        let Some(current) = spec.versions.first() else {
            return Err(TagsError::NoVersions);
        };
        let Some(major) = current.get(..1).filter(|major| major.chars().all(|c| c.is_ascii_digit())) else {
            return Err(TagsError::InvalidVersion(current.clone()));
        };
        if spec.platforms.is_empty() {
            return Err(TagsError::NoPlatforms);
        }

        let implementation = spec.implementation.as_str();

        let mut abis = Vec::with_capacity(3);
        if let Some(abi) = &spec.abi {
            abis.push(abi.as_str());
        }
        if spec.abi3 {
            abis.push("abi3");
        }
        abis.push("none");

        let mut tags = Vec::with_capacity(abis.len() * spec.platforms.len() + 8);

        // 1. This exact version, with each ABI
        for abi in &abis {
            for platform in &spec.platforms {
                tags.push(Tag::new(format!("{implementation}{current}"), *abi, platform));
            }
        }

        // 2. abi3 for older versions
        if spec.abi3 {
            for version in &spec.versions[1..] {
                // `abi3` was introduced in Python 3.2
                if matches!(version.as_str(), "31" | "30") {
                    break;
                }
                for platform in &spec.platforms {
                    tags.push(Tag::new(format!("{implementation}{version}"), "abi3", platform));
                }
            }
        }

        // 3. No ABI, but platform-specific (e.g., an executable binary)
        for platform in &spec.platforms {
            tags.push(Tag::new(format!("py{major}"), "none", platform));
        }

        // 4. No ABI or platform, but tied to the implementation
        tags.push(Tag::new(format!("{implementation}{current}"), "none", "any"));
        tags.push(Tag::new(format!("{implementation}{major}"), "none", "any"));

        // 5. Generic Python
        for (index, version) in spec.versions.iter().enumerate() {
            tags.push(Tag::new(format!("py{version}"), "none", "any"));
            if index == 0 {
                tags.push(Tag::new(format!("py{major}"), "none", "any"));
            }
        }

        Self::new(tags)
    }

    /// Returns the [`TagCompatibility`] of the given tags.
    ///
    /// If compatible, includes the score of the most-compatible platform tag.
    /// If incompatible, includes the tag part which was a closest match.
    pub fn compatibility(
        &self,
        wheel_python_tags: &[String],
        wheel_abi_tags: &[String],
        wheel_platform_tags: &[String],
    ) -> TagCompatibility {
        let mut max_compatibility = TagCompatibility::Incompatible(IncompatibleTag::Invalid);

        for wheel_py in wheel_python_tags {
            let Some(abis) = self.map.get(wheel_py) else {
                max_compatibility =
                    max_compatibility.max(TagCompatibility::Incompatible(IncompatibleTag::Python));
                continue;
            };
            for wheel_abi in wheel_abi_tags {
                let Some(platforms) = abis.get(wheel_abi) else {
                    max_compatibility =
                        max_compatibility.max(TagCompatibility::Incompatible(IncompatibleTag::Abi));
                    continue;
                };
                for wheel_platform in wheel_platform_tags {
                    let priority = platforms.get(wheel_platform).copied();
                    if let Some(priority) = priority {
                        max_compatibility =
                            max_compatibility.max(TagCompatibility::Compatible(priority));
                    } else {
                        max_compatibility = max_compatibility
                            .max(TagCompatibility::Incompatible(IncompatibleTag::Platform));
                    }
                }
            }
        }
        max_compatibility
    }

    /// Iterate over the tags, most-preferred first.
    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.ordered.iter()
    }

    /// Returns the number of distinct tags.
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    /// Returns `true` if the set contains no tags.
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Returns `true` if the exact tag is part of the set.
    pub fn contains(&self, tag: &Tag) -> bool {
        self.map
            .get(&tag.python)
            .and_then(|abis| abis.get(&tag.abi))
            .is_some_and(|platforms| platforms.contains_key(&tag.platform))
    }
}

impl Display for Tags {
    /// Display tags from high to low priority
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (index, tag) in self.ordered.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{tag}")?;
        }
        Ok(())
    }
}

/// The priority of a platform tag.
///
/// A wrapper around [`NonZeroU32`]. Higher values indicate higher priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TagPriority(NonZeroU32);

impl TryFrom<usize> for TagPriority {
    type Error = TagsError;

    /// Create a [`TagPriority`] from a `usize`, where higher `usize` values are given higher
    /// priority.
    fn try_from(priority: usize) -> Result<Self, TagsError> {
        match u32::try_from(priority).and_then(|priority| NonZeroU32::try_from(1 + priority)) {
            Ok(priority) => Ok(Self(priority)),
            Err(err) => Err(TagsError::InvalidPriority(priority, err)),
        }
    }
}
