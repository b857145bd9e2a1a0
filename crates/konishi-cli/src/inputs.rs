//! Turning CLI arguments and CI environment into run options.
//!
//! Everything here fails fast: malformed trust levels, filters, or range
//! combinations are rejected before any git call happens.

use regex::Regex;

use konishi_git::{
    CollectionOptions, CommitCollectionOptions, CommitRange, EmptyRangeError, Options,
    TagCollectionOptions, TagSource, VerificationOptions, VerificationPolicy,
};
use konishi_gnupg::TrustLevel;

use crate::commands::check::CheckArgs;

/// Configuration errors, raised before any collection or verification.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    /// A trust level input did not name a known level.
    #[error("malformed trust level `{input}` (expected one of Never, Undefined, Unknown, Marginal, Full, Ultimate)")]
    MalformedTrustLevel {
        /// The rejected input.
        input: String,
    },

    /// A tag source input did not name a known mode.
    #[error("malformed tag source `{input}` (expected one of none, all, for-commits)")]
    MalformedTagSource {
        /// The rejected input.
        input: String,
    },

    /// A `/regex/flags` filter missing its closing slash.
    #[error("malformed regex filter without closing /: `{input}`")]
    UnterminatedFilter {
        /// The rejected input.
        input: String,
    },

    /// A `/regex/flags` filter carrying an unsupported flag.
    #[error("unsupported regex flag `{flag}` in `{input}` (supported: i, m, s, U, x)")]
    UnsupportedFilterFlag {
        /// The offending flag character.
        flag: char,
        /// The full filter input.
        input: String,
    },

    /// The filter regex itself failed to compile.
    #[error("invalid filter regex: {0}")]
    BadFilterRegex(#[from] regex::Error),

    /// A named filter that is not one of the predefined patterns.
    #[error("unknown pre-defined filter (use /regex/flags for a raw regex): {input}")]
    UnknownNamedFilter {
        /// The rejected input.
        input: String,
    },

    /// Both a manual range and the PR range were requested.
    #[error("the --pr-commits and --commits-after/--commits-up-to options are not compatible")]
    ConflictingRangeOptions,

    /// `--pr-commits` without the CI environment it needs.
    #[error("--pr-commits requires the {var} environment variable")]
    MissingPrEnv {
        /// Name of the missing variable.
        var: &'static str,
    },

    /// Both range refs were empty.
    #[error(transparent)]
    EmptyRange(#[from] EmptyRangeError),
}

/// Build the full run options from parsed CLI arguments.
///
/// # Errors
///
/// Fails with [`InputError`] on any malformed or conflicting input.
pub fn options_from_args(args: &CheckArgs) -> Result<Options, InputError> {
    let min_all = parse_opt_trust_level(args.min_trust_level.as_deref())?;
    let min_for_commits = muxed(
        min_all,
        parse_opt_trust_level(args.min_trust_level_for_commits.as_deref())?,
        TrustLevel::Undefined,
    );
    let min_for_tags = muxed(
        min_all,
        parse_opt_trust_level(args.min_trust_level_for_tags.as_deref())?,
        TrustLevel::Undefined,
    );

    // Unlike commits, tags default to requiring a signature: an annotated
    // release tag without one is almost always a policy violation.
    let require_for_commits = muxed(
        args.require_signature,
        args.require_signature_for_commits,
        false,
    );
    let require_for_tags = muxed(args.require_signature, args.require_signature_for_tags, true);

    let ignore_unknown_for_commits = muxed(
        args.ignore_unknown_keys,
        args.ignore_unknown_keys_for_commits,
        false,
    );
    let ignore_unknown_for_tags = muxed(
        args.ignore_unknown_keys,
        args.ignore_unknown_keys_for_tags,
        false,
    );
    let ignore_untrusted_for_commits = muxed(
        args.ignore_untrusted_keys,
        args.ignore_untrusted_keys_for_commits,
        false,
    );
    let ignore_untrusted_for_tags = muxed(
        args.ignore_untrusted_keys,
        args.ignore_untrusted_keys_for_tags,
        false,
    );

    let filter = args
        .filter_tags
        .as_deref()
        .map(parse_tag_filter)
        .transpose()?;

    Ok(Options {
        collection: CollectionOptions {
            for_commits: CommitCollectionOptions {
                explicitly_include: split_list(args.included_commits.as_deref()),
                include_in_range: commit_range(args)?,
                explicitly_exclude: split_list(args.excluded_commits.as_deref()),
            },
            for_tags: TagCollectionOptions {
                explicitly_include: split_list(args.included_tags.as_deref()),
                include_from_git: parse_tag_source(args.tags_from_git.as_deref())?,
                explicitly_exclude: split_list(args.excluded_tags.as_deref()),
                filter,
            },
        },
        verification: VerificationPolicy {
            for_commits: VerificationOptions {
                require_min_trust_level: min_for_commits,
                require_signature: require_for_commits,
                ignore_unknown_keys: ignore_unknown_for_commits,
                ignore_untrusted_keys: ignore_untrusted_for_commits,
            },
            for_tags: VerificationOptions {
                require_min_trust_level: min_for_tags,
                require_signature: require_for_tags,
                ignore_unknown_keys: ignore_unknown_for_tags,
                ignore_untrusted_keys: ignore_untrusted_for_tags,
            },
        },
    })
}

/// Resolve a muxed option triple: the base value wins over the per-kind
/// one, and the per-kind default applies when neither is given.
fn muxed<T: Copy>(for_all: Option<T>, per_kind: Option<T>, default: T) -> T {
    for_all.or(per_kind).unwrap_or(default)
}

/// Split a comma-separated list input into trimmed entries.
fn split_list(input: Option<&str>) -> Vec<String> {
    match input {
        None | Some("") => Vec::new(),
        Some(value) => value.split(',').map(|entry| entry.trim().to_owned()).collect(),
    }
}

fn parse_opt_trust_level(input: Option<&str>) -> Result<Option<TrustLevel>, InputError> {
    input.map(parse_trust_level).transpose()
}

fn parse_trust_level(input: &str) -> Result<TrustLevel, InputError> {
    TrustLevel::from_status_token(input).ok_or_else(|| InputError::MalformedTrustLevel {
        input: input.to_owned(),
    })
}

fn parse_tag_source(input: Option<&str>) -> Result<TagSource, InputError> {
    let Some(input) = input else {
        return Ok(TagSource::ForCommits);
    };
    match input.to_ascii_lowercase().as_str() {
        "" | "for-commits" | "forcommits" => Ok(TagSource::ForCommits),
        "none" => Ok(TagSource::None),
        "all" => Ok(TagSource::All),
        _ => Err(InputError::MalformedTagSource {
            input: input.to_owned(),
        }),
    }
}

/// Resolve the commit range from the manual refs or the PR environment.
///
/// The two sources are mutually exclusive; requesting both is a
/// configuration error rather than a silent precedence rule.
fn commit_range(args: &CheckArgs) -> Result<Option<CommitRange>, InputError> {
    let manual = manual_commit_range(args)?;
    if args.pr_commits {
        if manual.is_some() {
            return Err(InputError::ConflictingRangeOptions);
        }
        return Ok(Some(pr_commit_range()?));
    }
    Ok(manual)
}

fn manual_commit_range(args: &CheckArgs) -> Result<Option<CommitRange>, InputError> {
    if args.commits_after.is_none() && args.commits_up_to.is_none() {
        return Ok(None);
    }
    let from_ref = args.commits_after.clone().unwrap_or_default();
    let to_ref = args.commits_up_to.clone().unwrap_or_default();
    Ok(Some(CommitRange::new(from_ref, to_ref)?))
}

fn pr_commit_range() -> Result<CommitRange, InputError> {
    let base = require_env("GITHUB_BASE_REF")?;
    let head = require_env("GITHUB_REF")?;
    Ok(CommitRange::new(fix_base_ref(&base), fix_head_ref(&head))?)
}

fn require_env(var: &'static str) -> Result<String, InputError> {
    std::env::var(var)
        .ok()
        .filter(|value| !value.is_empty())
        .ok_or(InputError::MissingPrEnv { var })
}

/// GITHUB_BASE_REF is usually a bare branch name, and the checkout action
/// leaves no local ref for it, only the remote-tracking one.
fn fix_base_ref(base_ref: &str) -> String {
    if base_ref.starts_with("refs/") {
        base_ref.to_owned()
    } else {
        format!("refs/remotes/origin/{base_ref}")
    }
}

/// GITHUB_REF for PRs is `refs/pull/…`, which checkout materializes under
/// `refs/remotes/pull/…` instead.
fn fix_head_ref(head_ref: &str) -> String {
    match head_ref.strip_prefix("refs/pull/") {
        Some(tail) => format!("refs/remotes/pull/{tail}"),
        None => head_ref.to_owned(),
    }
}

// Stringly regex matching a semver version number, without anchors.
// Taken from https://semver.org (CC BY 3.0, Tom Preston-Werner).
const SEMVER_PATTERN: &str = r"(0|[1-9]\d*)\.(0|[1-9]\d*)\.(0|[1-9]\d*)(?:-((?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*)(?:\.(?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*))*))?(?:\+([0-9a-zA-Z-]+(?:\.[0-9a-zA-Z-]+)*))?";

/// Parse a tag filter input: `/regex/flags` or a predefined pattern name.
///
/// Predefined names (matched case-insensitively):
/// - `semver`: a semver version number, anchored
/// - `v_semver`: like `semver` but with a `v` prefix, e.g. `v1.0.2`
///
/// # Errors
///
/// Fails with [`InputError`] on an unterminated `/…` form, an unsupported
/// flag, a regex that does not compile, or an unknown pattern name.
pub fn parse_tag_filter(input: &str) -> Result<Regex, InputError> {
    if let Some(stripped) = input.strip_prefix('/') {
        let Some((body, flags)) = stripped.rsplit_once('/') else {
            return Err(InputError::UnterminatedFilter {
                input: input.to_owned(),
            });
        };
        for flag in flags.chars() {
            if !matches!(flag, 'i' | 'm' | 's' | 'U' | 'x') {
                return Err(InputError::UnsupportedFilterFlag {
                    flag,
                    input: input.to_owned(),
                });
            }
        }
        let pattern = if flags.is_empty() {
            body.to_owned()
        } else {
            format!("(?{flags}){body}")
        };
        return Ok(Regex::new(&pattern)?);
    }

    match input.to_ascii_lowercase().as_str() {
        "semver" => Ok(Regex::new(&format!("^{SEMVER_PATTERN}$"))?),
        "v_semver" => Ok(Regex::new(&format!("^v{SEMVER_PATTERN}$"))?),
        _ => Err(InputError::UnknownNamedFilter {
            input: input.to_owned(),
        }),
    }
}
