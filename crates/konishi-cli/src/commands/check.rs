//! The `konishi check` subcommand.
//!
//! Runs the full collect-and-verify pipeline and reports the outcome. The
//! process exits non-zero when any verification failure is found; the
//! resolved entity sets are always reported so callers know what was
//! checked.

use std::path::PathBuf;
use std::process;

use clap::Args;
use color_eyre::eyre::Result;
use konishi_git::{collect_and_verify, GitRepo};
use tracing::info;

use crate::inputs;

/// Arguments for `konishi check`.
///
/// The trust-policy options come in triples: a base option applying to
/// commits and tags alike, plus per-kind overrides. When the base option
/// is given it wins over both per-kind variants.
#[derive(Args)]
pub struct CheckArgs {
    /// Repository to check (defaults to the current directory).
    #[arg(long, value_name = "PATH", default_value = ".")]
    pub repo: PathBuf,

    /// Commits to verify in addition to any range (comma-separated).
    #[arg(long, value_name = "LIST")]
    pub included_commits: Option<String>,

    /// Tags to verify in addition to git-sourced ones (comma-separated).
    #[arg(long, value_name = "LIST")]
    pub included_tags: Option<String>,

    /// Commits to exclude from verification (comma-separated).
    #[arg(long, value_name = "LIST")]
    pub excluded_commits: Option<String>,

    /// Tags to exclude from verification (comma-separated).
    #[arg(long, value_name = "LIST")]
    pub excluded_tags: Option<String>,

    /// Start ref of the commit range (exclusive); empty for an open start.
    #[arg(long, value_name = "REF")]
    pub commits_after: Option<String>,

    /// End ref of the commit range (inclusive).
    #[arg(long, value_name = "REF")]
    pub commits_up_to: Option<String>,

    /// Take the commit range from the pull-request environment
    /// (GITHUB_BASE_REF / GITHUB_REF).
    #[arg(long)]
    pub pr_commits: bool,

    /// How to source tags from git: none, all, or for-commits.
    #[arg(long, value_name = "MODE")]
    pub tags_from_git: Option<String>,

    /// Tag name filter: /regex/flags or a named pattern (semver, v_semver).
    #[arg(long, value_name = "FILTER")]
    pub filter_tags: Option<String>,

    /// Minimum trust level for commits and tags alike.
    #[arg(long, value_name = "LEVEL")]
    pub min_trust_level: Option<String>,

    /// Minimum trust level for commits only.
    #[arg(long, value_name = "LEVEL")]
    pub min_trust_level_for_commits: Option<String>,

    /// Minimum trust level for tags only.
    #[arg(long, value_name = "LEVEL")]
    pub min_trust_level_for_tags: Option<String>,

    /// Require a signature on commits and tags alike.
    #[arg(long, value_name = "BOOL")]
    pub require_signature: Option<bool>,

    /// Require a signature on commits only (default: false).
    #[arg(long, value_name = "BOOL")]
    pub require_signature_for_commits: Option<bool>,

    /// Require a signature on tags only (default: true).
    #[arg(long, value_name = "BOOL")]
    pub require_signature_for_tags: Option<bool>,

    /// Ignore unknown-key signatures on commits and tags alike.
    #[arg(long, value_name = "BOOL")]
    pub ignore_unknown_keys: Option<bool>,

    /// Ignore unknown-key signatures on commits only.
    #[arg(long, value_name = "BOOL")]
    pub ignore_unknown_keys_for_commits: Option<bool>,

    /// Ignore unknown-key signatures on tags only.
    #[arg(long, value_name = "BOOL")]
    pub ignore_unknown_keys_for_tags: Option<bool>,

    /// Ignore untrusted valid signatures on commits and tags alike.
    #[arg(long, value_name = "BOOL")]
    pub ignore_untrusted_keys: Option<bool>,

    /// Ignore untrusted valid signatures on commits only.
    #[arg(long, value_name = "BOOL")]
    pub ignore_untrusted_keys_for_commits: Option<bool>,

    /// Ignore untrusted valid signatures on tags only.
    #[arg(long, value_name = "BOOL")]
    pub ignore_untrusted_keys_for_tags: Option<bool>,

    /// Output the report as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Execute the check command.
pub fn execute(args: CheckArgs) -> Result<()> {
    let options = inputs::options_from_args(&args)?;
    info!(repo = %args.repo.display(), "starting verification run");
    let repo = GitRepo::open(&args.repo);
    let outcome = collect_and_verify(&repo, &options)?;

    if args.json {
        let report = serde_json::json!({
            "passed": outcome.errors.is_empty(),
            "commits": outcome.commits,
            "tags": outcome.tags,
            "errors": outcome.errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "policy": options.verification,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for failure in &outcome.errors {
            println!("[FAIL] {failure}");
        }
        println!(
            "Checked {} commit(s) and {} tag(s)",
            outcome.commits.len(),
            outcome.tags.len()
        );
        if outcome.errors.is_empty() {
            println!("Verification PASSED");
        } else {
            println!("Verification FAILED");
        }
    }

    if !outcome.errors.is_empty() {
        process::exit(1);
    }

    Ok(())
}
