//! Entity collection: which commits and tags get verified.
//!
//! Collection is declarative set algebra, applied strictly in order:
//! explicit includes, git-sourced entries, explicit excludes, and (for
//! tags only) a final name filter. An entity in both the include and
//! exclude lists ends up excluded, and explicit inclusion grants no
//! immunity from the filter.

use std::collections::BTreeSet;

use regex::Regex;
use tracing::debug;

use crate::error::GitError;
use crate::repo::GitRepo;

/// A commit range roughly as used by `git rev-list`.
///
/// Resolves to `git rev-list <from>..<to>`, except when `from_ref` is
/// empty, which denotes an open start (`git rev-list <to>`, all ancestors
/// of `to_ref`). Using something like `master..` to list all commits on a
/// branch since forking out from master works as expected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRange {
    from_ref: String,
    to_ref: String,
}

/// Both refs of a commit range were empty.
#[derive(Debug, thiserror::Error)]
#[error("commit range needs at least one non-empty ref")]
pub struct EmptyRangeError;

impl CommitRange {
    /// Build a range, rejecting the doubly-empty form up front.
    ///
    /// # Errors
    ///
    /// Fails with [`EmptyRangeError`] if both refs are empty; an empty
    /// range must be a loud configuration error, not a silently empty
    /// result set.
    pub fn new(
        from_ref: impl Into<String>,
        to_ref: impl Into<String>,
    ) -> Result<Self, EmptyRangeError> {
        let from_ref = from_ref.into();
        let to_ref = to_ref.into();
        if from_ref.is_empty() && to_ref.is_empty() {
            return Err(EmptyRangeError);
        }
        Ok(Self { from_ref, to_ref })
    }

    /// The revision spec handed to `git rev-list`.
    pub(crate) fn rev_list_spec(&self) -> String {
        if self.from_ref.is_empty() {
            self.to_ref.clone()
        } else {
            format!("{}..{}", self.from_ref, self.to_ref)
        }
    }
}

/// Options for collecting commits.
#[derive(Debug, Clone, Default)]
pub struct CommitCollectionOptions {
    /// Commits to explicitly include (existence is not checked).
    pub explicitly_include: Vec<String>,
    /// The range of commits to include using `git rev-list`.
    pub include_in_range: Option<CommitRange>,
    /// Commits to explicitly exclude.
    pub explicitly_exclude: Vec<String>,
}

/// How tags are sourced from the git repository.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TagSource {
    /// Do not collect any tags from git.
    None,
    /// Collect all tags returned by `git tag --list`.
    All,
    /// Collect the tags pointing at any already-collected commit.
    #[default]
    ForCommits,
}

/// Options for collecting tags.
#[derive(Debug, Clone, Default)]
pub struct TagCollectionOptions {
    /// Tags to explicitly include (existence is not checked).
    pub explicitly_include: Vec<String>,
    /// Which tags to source from the repository.
    pub include_from_git: TagSource,
    /// Tags to explicitly exclude.
    pub explicitly_exclude: Vec<String>,
    /// Filter applied last on tag *names*; non-matching tags are dropped.
    /// No implicit flags are added: case sensitivity follows the regex.
    pub filter: Option<Regex>,
}

/// Collection options for both entity kinds.
#[derive(Debug, Clone, Default)]
pub struct CollectionOptions {
    /// How to collect commits.
    pub for_commits: CommitCollectionOptions,
    /// How to collect tags.
    pub for_tags: TagCollectionOptions,
}

/// The resolved, deduplicated entity sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectedEntities {
    /// Collected commit hashes.
    pub commits: BTreeSet<String>,
    /// Collected tag names.
    pub tags: BTreeSet<String>,
}

/// Collect the commits and tags to verify.
///
/// Commits resolve first; the tag pipeline sees the already-resolved
/// commit set.
///
/// # Errors
///
/// Fails with [`GitError`] if any underlying git call fails.
pub fn collect_commits_and_tags(
    repo: &GitRepo,
    options: &CollectionOptions,
) -> Result<CollectedEntities, GitError> {
    let commits = collect_commits(repo, &options.for_commits)?;
    let tags = collect_tags(repo, &options.for_tags, &commits)?;
    Ok(CollectedEntities { commits, tags })
}

/// Collect commits: explicit includes, then the range, then exclusions.
///
/// # Errors
///
/// Fails with [`GitError`] if listing the range fails.
pub fn collect_commits(
    repo: &GitRepo,
    options: &CommitCollectionOptions,
) -> Result<BTreeSet<String>, GitError> {
    let mut commits: BTreeSet<String> = options.explicitly_include.iter().cloned().collect();
    if let Some(range) = &options.include_in_range {
        commits.extend(repo.list_commits_in_range(range)?);
    }
    for excluded in &options.explicitly_exclude {
        commits.remove(excluded);
    }
    Ok(commits)
}

/// Collect tags: explicit includes, git-sourced tags, exclusions, filter.
///
/// # Errors
///
/// Fails with [`GitError`] if sourcing tags from the repository fails.
pub fn collect_tags(
    repo: &GitRepo,
    options: &TagCollectionOptions,
    commits: &BTreeSet<String>,
) -> Result<BTreeSet<String>, GitError> {
    let mut tags: BTreeSet<String> = options.explicitly_include.iter().cloned().collect();
    tags.extend(tags_from_git(repo, options.include_from_git, commits)?);
    for excluded in &options.explicitly_exclude {
        tags.remove(excluded);
    }
    Ok(filter_tags(tags, options.filter.as_ref()))
}

/// Source tags from the repository per the [`TagSource`].
fn tags_from_git(
    repo: &GitRepo,
    source: TagSource,
    commits: &BTreeSet<String>,
) -> Result<BTreeSet<String>, GitError> {
    match source {
        TagSource::None => Ok(BTreeSet::new()),
        TagSource::All => repo.list_all_tags(),
        TagSource::ForCommits => repo.list_tags_for_commits(commits.iter().map(String::as_str)),
    }
}

/// Keep only tags whose name matches the filter, if one is given.
#[must_use]
pub fn filter_tags(tags: BTreeSet<String>, filter: Option<&Regex>) -> BTreeSet<String> {
    let Some(regex) = filter else {
        return tags;
    };
    tags.into_iter()
        .filter(|tag| {
            let keep = regex.is_match(tag);
            if !keep {
                debug!(%tag, "tag removed by filter");
            }
            keep
        })
        .collect()
}
