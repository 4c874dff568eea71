use std::cmp::Ordering;

use itertools::Itertools;
use tracing::{debug, warn};

use pep440_rs::{Version, VersionSpecifier, VersionSpecifiers};
use pep508_rs::{PackageName, Requirement, VersionOrUrl};
use wheelhouse_client::IndexEntry;
use wheelhouse_configuration::SelectionPolicy;
use wheelhouse_distribution_filename::{BuildTag, DistFilename};
use wheelhouse_platform_tags::{IncompatibleTag, TagCompatibility, TagPriority, Tags};

use crate::error::{Hint, IncompatibleReason, NoCompatibleCandidate};

/// Picks the single best distribution for a requirement out of a candidate pool.
#[derive(Debug, Clone)]
pub struct CandidateSelector {
    tags: Tags,
    policy: SelectionPolicy,
    cross: bool,
}

impl CandidateSelector {
    /// Create a selector for the given target tags and policy.
    ///
    /// `cross` marks a download for an environment other than the running one, which only
    /// affects the hints attached to failures.
    pub fn new(tags: Tags, policy: SelectionPolicy, cross: bool) -> Self {
        Self {
            tags,
            policy,
            cross,
        }
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    pub fn policy(&self) -> &SelectionPolicy {
        &self.policy
    }

    /// Select the best candidate for the requirement.
    ///
    /// Candidates go through the version filter, the binary policy and the tag check. The
    /// pre-release rule then applies to the usable candidates only, so a final release that
    /// can't be used never hides a usable pre-release. Of the survivors, the highest ranked
    /// wins; among equally ranked candidates, the first in pool order.
    pub fn select<'a>(
        &self,
        requirement: &Requirement,
        candidates: &'a [IndexEntry],
    ) -> Result<&'a IndexEntry, NoCompatibleCandidate> {
        let specifiers = match &requirement.version_or_url {
            Some(VersionOrUrl::VersionSpecifier(specifiers)) => Some(specifiers),
            Some(VersionOrUrl::Url(_)) | None => None,
        };
        self.select_from(
            &requirement.name,
            specifiers,
            &requirement.to_string(),
            candidates,
        )
    }

    /// Check an archive that was requested directly by path or URL.
    ///
    /// The archive is the only candidate, so this applies the binary policy and the tag check.
    pub fn select_archive<'a>(
        &self,
        archive: &'a IndexEntry,
    ) -> Result<&'a IndexEntry, NoCompatibleCandidate> {
        self.select_from(
            archive.filename.name(),
            None,
            &archive.file.filename,
            std::slice::from_ref(archive),
        )
    }

    fn select_from<'a>(
        &self,
        package_name: &PackageName,
        specifiers: Option<&VersionSpecifiers>,
        requirement: &str,
        candidates: &'a [IndexEntry],
    ) -> Result<&'a IndexEntry, NoCompatibleCandidate> {
        if candidates.is_empty() {
            return Err(self.failure(
                requirement,
                IncompatibleReason::NoDistributions(package_name.clone()),
            ));
        }

        let matching = candidates
            .iter()
            .filter(|candidate| {
                specifiers.is_none_or(|specifiers| specifiers.contains(candidate.filename.version()))
            })
            .collect::<Vec<_>>();
        if matching.is_empty() {
            let available = candidates
                .iter()
                .map(|candidate| candidate.filename.version().clone())
                .sorted()
                .dedup()
                .collect();
            return Err(self.failure(
                requirement,
                IncompatibleReason::NoMatchingVersion(available),
            ));
        }

        let usable = match self.usable(package_name, matching) {
            Ok(usable) => usable,
            Err(reason) => return Err(self.failure(requirement, reason)),
        };

        let mut best: Option<(CandidateKey, &IndexEntry)> = None;
        for (key, candidate) in self.apply_prerelease_rule(specifiers, usable) {
            let replace = match &best {
                None => true,
                Some((best_key, best_candidate)) => match key.cmp(best_key) {
                    Ordering::Greater => true,
                    Ordering::Less => false,
                    Ordering::Equal => {
                        warn!(
                            "`{candidate}` and `{best_candidate}` rank equally for `{requirement}`; using `{best_candidate}`"
                        );
                        false
                    }
                },
            };
            if replace {
                best = Some((key, candidate));
            }
        }

        match best {
            Some((_, candidate)) => {
                debug!("Selected `{candidate}` for `{requirement}`");
                Ok(candidate)
            }
            // The pre-release rule never empties a non-empty list.
            None => Err(self.failure(
                requirement,
                IncompatibleReason::IncompatibleTag(IncompatibleTag::Invalid),
            )),
        }
    }

    /// Apply the binary policy and the tag check, ranking each candidate that passes.
    ///
    /// If nothing passes, returns the constraint that blocked the candidates: a tag mismatch
    /// whenever some wheel reached the tag check, otherwise the binary policy.
    fn usable<'a>(
        &self,
        package_name: &PackageName,
        candidates: Vec<&'a IndexEntry>,
    ) -> Result<Vec<(CandidateKey<'a>, &'a IndexEntry)>, IncompatibleReason> {
        let formats = self.policy.binary.allowed_formats(package_name);
        let mut excluded_binary = false;
        let mut closest_tag: Option<IncompatibleTag> = None;
        let mut usable = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let key = match &candidate.filename {
                DistFilename::WheelFilename(wheel) => {
                    if !formats.binary {
                        excluded_binary = true;
                        continue;
                    }
                    match wheel.compatibility(&self.tags) {
                        TagCompatibility::Compatible(priority) => CandidateKey {
                            preferred_format: self.policy.prefer_binary,
                            version: &wheel.version,
                            priority: Some(priority),
                            build_tag: wheel.build_tag.as_ref(),
                        },
                        TagCompatibility::Incompatible(tag) => {
                            debug!("Skipping incompatible wheel `{candidate}` ({tag:?} mismatch)");
                            closest_tag = closest_tag.max(Some(tag));
                            continue;
                        }
                    }
                }
                DistFilename::SourceDistFilename(source_dist) => {
                    if !formats.source {
                        continue;
                    }
                    CandidateKey {
                        preferred_format: false,
                        version: &source_dist.version,
                        priority: None,
                        build_tag: None,
                    }
                }
            };
            usable.push((key, candidate));
        }

        if !usable.is_empty() {
            return Ok(usable);
        }
        Err(match closest_tag {
            Some(tag) => IncompatibleReason::IncompatibleTag(tag),
            None if excluded_binary => IncompatibleReason::NoBinary,
            None => IncompatibleReason::OnlyBinary,
        })
    }

    /// Drop pre-releases if any usable final release remains, unless they're allowed explicitly
    /// or requested by a pre-release specifier (e.g., `==2.0b1`).
    fn apply_prerelease_rule<'a>(
        &self,
        specifiers: Option<&VersionSpecifiers>,
        usable: Vec<(CandidateKey<'a>, &'a IndexEntry)>,
    ) -> Vec<(CandidateKey<'a>, &'a IndexEntry)> {
        let allow_prerelease = if self.policy.prereleases
            || specifiers
                .is_some_and(|specifiers| specifiers.iter().any(VersionSpecifier::any_prerelease))
        {
            AllowPreRelease::Yes
        } else {
            AllowPreRelease::IfNecessary
        };

        match allow_prerelease {
            AllowPreRelease::Yes => usable,
            AllowPreRelease::IfNecessary => {
                let is_final = |(key, _): &(CandidateKey<'a>, &'a IndexEntry)| {
                    !key.version.any_prerelease()
                };
                if usable.iter().any(is_final) {
                    usable.into_iter().filter(is_final).collect()
                } else {
                    usable
                }
            }
        }
    }

    fn failure(&self, requirement: &str, reason: IncompatibleReason) -> NoCompatibleCandidate {
        let hint = match reason {
            IncompatibleReason::OnlyBinary if self.cross => Some(Hint::SourceUnusableForTarget),
            IncompatibleReason::IncompatibleTag(_) if self.cross => Some(Hint::TargetTags),
            _ => None,
        };
        NoCompatibleCandidate {
            requirement: requirement.to_string(),
            reason,
            hint,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum AllowPreRelease {
    /// Allow all pre-release versions.
    Yes,
    /// Allow pre-release versions if no usable final release satisfies the requirement.
    IfNecessary,
}

/// The ranking of a surviving candidate. Fields compare in order; greater is better.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct CandidateKey<'a> {
    /// Whether the candidate is a wheel and `--prefer-binary` is set.
    preferred_format: bool,
    version: &'a Version,
    /// The priority of the best matching tag. Source distributions have none, so they rank
    /// below any wheel of the same version.
    priority: Option<TagPriority>,
    build_tag: Option<&'a BuildTag>,
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::str::FromStr;

    use wheelhouse_client::File;
    use wheelhouse_configuration::{BinaryPolicy, NoBinary, OnlyBinary, PythonVersion, TargetOverrides};

    use crate::target::tests::target;

    use super::*;

    fn candidates(filenames: &[&str]) -> Vec<IndexEntry> {
        filenames
            .iter()
            .map(|filename| {
                let file = File::from_path(PathBuf::from("/find-links").join(filename)).unwrap();
                IndexEntry::try_from_normalized_file(file).unwrap()
            })
            .collect()
    }

    fn requirement(requirement: &str) -> Requirement {
        Requirement::from_str(requirement).unwrap()
    }

    fn selector(overrides: TargetOverrides, policy: SelectionPolicy) -> CandidateSelector {
        let target = target(overrides);
        CandidateSelector::new(target.tags().unwrap(), policy, target.is_cross())
    }

    fn host(policy: SelectionPolicy) -> CandidateSelector {
        selector(TargetOverrides::default(), policy)
    }

    fn select(selector: &CandidateSelector, requirement_str: &str, pool: &[&str]) -> String {
        let pool = candidates(pool);
        match selector.select(&requirement(requirement_str), &pool) {
            Ok(candidate) => candidate.to_string(),
            Err(err) => format!("{err}: {}", err.reason),
        }
    }

    const SOURCE: &[&str] = &["source-0.8-py2.py3-none-any.whl", "source-1.0.tar.gz"];

    #[test]
    fn newest_version_wins() {
        let selector = host(SelectionPolicy::default());
        assert_eq!(select(&selector, "source", SOURCE), "source-1.0.tar.gz");
    }

    #[test]
    fn prefer_binary_over_newer_source() {
        let selector = host(SelectionPolicy {
            prefer_binary: true,
            ..SelectionPolicy::default()
        });
        assert_eq!(
            select(&selector, "source", SOURCE),
            "source-0.8-py2.py3-none-any.whl"
        );
    }

    #[test]
    fn prefer_binary_respects_the_requirement() {
        let selector = host(SelectionPolicy {
            prefer_binary: true,
            ..SelectionPolicy::default()
        });
        assert_eq!(select(&selector, "source>0.9", SOURCE), "source-1.0.tar.gz");
    }

    #[test]
    fn wheel_beats_source_of_the_same_version() {
        let selector = host(SelectionPolicy::default());
        assert_eq!(
            select(
                &selector,
                "simple",
                &["simple-1.0.tar.gz", "simple-1.0-py3-none-any.whl"]
            ),
            "simple-1.0-py3-none-any.whl"
        );
    }

    #[test]
    fn more_specific_tag_wins() {
        let selector = host(SelectionPolicy::default());
        assert_eq!(
            select(
                &selector,
                "fake",
                &[
                    "fake-1.0-py3-none-any.whl",
                    "fake-1.0-cp37-cp37m-manylinux1_x86_64.whl",
                    "fake-1.0-cp37-cp37m-linux_x86_64.whl",
                ]
            ),
            "fake-1.0-cp37-cp37m-manylinux1_x86_64.whl"
        );
    }

    #[test]
    fn higher_build_tag_wins() {
        let selector = host(SelectionPolicy::default());
        assert_eq!(
            select(
                &selector,
                "fake",
                &["fake-1.0-1-py3-none-any.whl", "fake-1.0-2-py3-none-any.whl"]
            ),
            "fake-1.0-2-py3-none-any.whl"
        );
    }

    #[test]
    fn ties_keep_the_first_candidate() {
        let selector = host(SelectionPolicy::default());
        assert_eq!(
            select(
                &selector,
                "fake",
                &["fake-1.0.zip", "fake-1.0.tar.gz"]
            ),
            "fake-1.0.zip"
        );
    }

    #[test]
    fn explicit_platform_excludes_manylinux() {
        let selector = selector(
            TargetOverrides {
                platform: Some("linux_x86_64".to_string()),
                ..TargetOverrides::default()
            },
            SelectionPolicy {
                binary: BinaryPolicy::new(OnlyBinary::All, NoBinary::None),
                ..SelectionPolicy::default()
            },
        );
        insta::assert_snapshot!(
            select(&selector, "fake", &["fake-1.0-py2.py3-none-manylinux1_x86_64.whl"]),
            @"No matching distribution found for fake: No wheel is compatible with the target platform"
        );
        assert_eq!(
            select(&selector, "fake", &["fake-1.0-py2.py3-none-linux_x86_64.whl"]),
            "fake-1.0-py2.py3-none-linux_x86_64.whl"
        );
    }

    #[test]
    fn macos_monotonicity() {
        let pool = &["fake-1.0-py2.py3-none-macosx_10_9_x86_64.whl"];
        let policy = SelectionPolicy {
            no_deps: true,
            ..SelectionPolicy::default()
        };
        let newer = selector(
            TargetOverrides {
                platform: Some("macosx_10_10_x86_64".to_string()),
                ..TargetOverrides::default()
            },
            policy.clone(),
        );
        assert_eq!(select(&newer, "fake", pool), pool[0]);

        let older = selector(
            TargetOverrides {
                platform: Some("macosx_10_8_x86_64".to_string()),
                ..TargetOverrides::default()
            },
            policy,
        );
        let pool = candidates(pool);
        let err = older.select(&requirement("fake"), &pool).unwrap_err();
        assert_eq!(
            err.reason,
            IncompatibleReason::IncompatibleTag(IncompatibleTag::Platform)
        );
        assert_eq!(err.hint, Some(Hint::TargetTags));
    }

    fn fake_implementation(abi: &str) -> CandidateSelector {
        selector(
            TargetOverrides {
                python_version: Some(PythonVersion::from_str("2").unwrap()),
                implementation: Some("fk".to_string()),
                abi: Some(abi.to_string()),
                platform: Some("fake_platform".to_string()),
            },
            SelectionPolicy {
                binary: BinaryPolicy::new(OnlyBinary::All, NoBinary::None),
                ..SelectionPolicy::default()
            },
        )
    }

    #[test]
    fn custom_abi() {
        let pool = &["fake-1.0-fk2-fakeabi-fake_platform.whl"];
        assert_eq!(select(&fake_implementation("fakeabi"), "fake", pool), pool[0]);
        insta::assert_snapshot!(
            select(&fake_implementation("none"), "fake", pool),
            @"No matching distribution found for fake: No wheel is compatible with the target ABI"
        );
    }

    #[test]
    fn closest_mismatch_is_reported() {
        let pool = &[
            "fake-1.0-cp37-cp37m-fake_platform.whl",
            "fake-1.0-fk2-otherabi-other_platform.whl",
        ];
        let pool = candidates(pool);
        let err = fake_implementation("fakeabi")
            .select(&requirement("fake"), &pool)
            .unwrap_err();
        assert_eq!(
            err.reason,
            IncompatibleReason::IncompatibleTag(IncompatibleTag::Abi)
        );
    }

    #[test]
    fn no_matching_version() {
        let selector = host(SelectionPolicy::default());
        insta::assert_snapshot!(
            select(&selector, "source>=2.0", SOURCE),
            @"No matching distribution found for source>=2.0: None of the available versions satisfy the requirement (available: 0.8, 1.0)"
        );
    }

    #[test]
    fn no_distributions() {
        let selector = host(SelectionPolicy::default());
        insta::assert_snapshot!(
            select(&selector, "missing", &[]),
            @"No matching distribution found for missing: No distributions were found for `missing`"
        );
    }

    #[test]
    fn only_binary_excludes_source() {
        let selector = host(SelectionPolicy {
            binary: BinaryPolicy::new(OnlyBinary::All, NoBinary::None),
            ..SelectionPolicy::default()
        });
        assert_eq!(
            select(&selector, "source", SOURCE),
            "source-0.8-py2.py3-none-any.whl"
        );
        insta::assert_snapshot!(
            select(&selector, "source>0.9", SOURCE),
            @"No matching distribution found for source>0.9: Only source distributions are available, but source distributions are disallowed by `--only-binary`"
        );
    }

    #[test]
    fn only_binary_hint_for_cross_environment() {
        let selector = selector(
            TargetOverrides {
                platform: Some("linux_x86_64".to_string()),
                ..TargetOverrides::default()
            },
            SelectionPolicy {
                binary: BinaryPolicy::new(OnlyBinary::All, NoBinary::None),
                ..SelectionPolicy::default()
            },
        );
        let pool = candidates(&["fake-1.0.tar.gz"]);
        let err = selector.select(&requirement("fake"), &pool).unwrap_err();
        assert_eq!(err.reason, IncompatibleReason::OnlyBinary);
        assert_eq!(err.hint, Some(Hint::SourceUnusableForTarget));
    }

    #[test]
    fn archive_goes_through_the_tag_check() {
        let selector = host(SelectionPolicy::default());
        let archive = candidates(&["fake-1.0-cp27-cp27mu-manylinux1_x86_64.whl"]).remove(0);
        let err = selector.select_archive(&archive).unwrap_err();
        insta::assert_snapshot!(err, @"No matching distribution found for fake-1.0-cp27-cp27mu-manylinux1_x86_64.whl");
        assert_eq!(
            err.reason,
            IncompatibleReason::IncompatibleTag(IncompatibleTag::Python)
        );

        let archive = candidates(&["fake-1.0.tar.gz"]).remove(0);
        assert_eq!(selector.select_archive(&archive).unwrap(), &archive);
    }

    #[test]
    fn no_binary_excludes_wheels() {
        let selector = host(SelectionPolicy {
            binary: BinaryPolicy::new(
                OnlyBinary::None,
                NoBinary::Packages(vec![PackageName::from_str("simple").unwrap()]),
            ),
            ..SelectionPolicy::default()
        });
        insta::assert_snapshot!(
            select(&selector, "simple", &["simple-1.0-py3-none-any.whl"]),
            @"No matching distribution found for simple: Only wheels are available, but wheels are disallowed by `--no-binary`"
        );
        assert_eq!(
            select(
                &selector,
                "other",
                &["other-1.0-py3-none-any.whl", "other-1.0.tar.gz"]
            ),
            "other-1.0-py3-none-any.whl"
        );
    }

    #[test]
    fn prereleases() {
        let pool = &["fake-1.0.tar.gz", "fake-2.0b1.tar.gz"];
        let selector = host(SelectionPolicy::default());
        assert_eq!(select(&selector, "fake", pool), "fake-1.0.tar.gz");
        // Only a pre-release satisfies the requirement.
        assert_eq!(select(&selector, "fake>1.0", pool), "fake-2.0b1.tar.gz");
        // The specifier names a pre-release.
        assert_eq!(select(&selector, "fake>=2.0b1", pool), "fake-2.0b1.tar.gz");

        let selector = host(SelectionPolicy {
            prereleases: true,
            ..SelectionPolicy::default()
        });
        assert_eq!(select(&selector, "fake", pool), "fake-2.0b1.tar.gz");
    }

    #[test]
    fn tag_mismatch_is_not_hidden_by_excluded_source() {
        let selector = selector(
            TargetOverrides {
                platform: Some("linux_x86_64".to_string()),
                ..TargetOverrides::default()
            },
            SelectionPolicy {
                binary: BinaryPolicy::new(OnlyBinary::All, NoBinary::None),
                ..SelectionPolicy::default()
            },
        );
        let pool = candidates(&[
            "fake-1.0-py2.py3-none-manylinux1_x86_64.whl",
            "fake-1.0.tar.gz",
        ]);
        let err = selector.select(&requirement("fake"), &pool).unwrap_err();
        assert_eq!(
            err.reason,
            IncompatibleReason::IncompatibleTag(IncompatibleTag::Platform)
        );
        assert_eq!(err.hint, Some(Hint::TargetTags));
    }

    #[test]
    fn unusable_final_release_does_not_hide_prerelease() {
        let selector = host(SelectionPolicy {
            binary: BinaryPolicy::new(OnlyBinary::All, NoBinary::None),
            ..SelectionPolicy::default()
        });
        assert_eq!(
            select(
                &selector,
                "fake",
                &["fake-1.0.tar.gz", "fake-2.0b1-py3-none-any.whl"]
            ),
            "fake-2.0b1-py3-none-any.whl"
        );

        let selector = host(SelectionPolicy::default());
        assert_eq!(
            select(
                &selector,
                "fake",
                &[
                    "fake-1.0-cp27-cp27mu-manylinux1_x86_64.whl",
                    "fake-2.0b1-py3-none-any.whl"
                ]
            ),
            "fake-2.0b1-py3-none-any.whl"
        );
    }

    fn python_version(version: &str) -> CandidateSelector {
        selector(
            TargetOverrides {
                python_version: Some(PythonVersion::from_str(version).unwrap()),
                ..TargetOverrides::default()
            },
            SelectionPolicy {
                no_deps: true,
                ..SelectionPolicy::default()
            },
        )
    }

    #[test]
    fn python_version_alone() {
        let pool = &["fake-1.0-py2-none-any.whl", "fake-2.0-py3-none-any.whl"];
        let pool_entries = candidates(pool);
        let err = python_version("3")
            .select(&requirement("fake==1.0"), &pool_entries)
            .unwrap_err();
        assert_eq!(
            err.reason,
            IncompatibleReason::IncompatibleTag(IncompatibleTag::Python)
        );
        assert_eq!(select(&python_version("2"), "fake", pool), pool[0]);
        assert_eq!(select(&python_version("3"), "fake", pool), pool[1]);
    }

    #[test]
    fn implementation_alone() {
        let policy = SelectionPolicy {
            no_deps: true,
            ..SelectionPolicy::default()
        };
        let fake = selector(
            TargetOverrides {
                implementation: Some("fk".to_string()),
                ..TargetOverrides::default()
            },
            policy.clone(),
        );
        let pool = &["fake-1.0-fk2.fk3-none-any.whl"];
        assert_eq!(select(&fake, "fake", pool), pool[0]);

        let fake_2 = selector(
            TargetOverrides {
                python_version: Some(PythonVersion::from_str("2").unwrap()),
                implementation: Some("fk".to_string()),
                ..TargetOverrides::default()
            },
            policy,
        );
        let pool = candidates(&["fake-1.0-fk3-none-any.whl"]);
        let err = fake_2.select(&requirement("fake"), &pool).unwrap_err();
        assert_eq!(
            err.reason,
            IncompatibleReason::IncompatibleTag(IncompatibleTag::Python)
        );
    }
}
