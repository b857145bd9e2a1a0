//! The git collaborator seam.
//!
//! All repository access goes through the [`GitCli`] trait so tests can
//! script git's behavior; the production implementation shells out to the
//! `git` binary in a configured working directory and captures both output
//! streams.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::process::Command;

use tracing::debug;

use crate::collect::CommitRange;
use crate::error::GitError;

/// Captured output of one git invocation.
#[derive(Debug, Clone)]
pub struct GitOutput {
    /// Captured stdout, lossily decoded.
    pub stdout: String,
    /// Captured stderr, lossily decoded.
    pub stderr: String,
    /// Exit code of the process (-1 if terminated by signal).
    pub exit_code: i32,
}

/// Low-level seam for running git.
///
/// Only spawn-level failures are errors at this layer; callers decide what
/// a non-zero exit code means for their command.
pub trait GitCli: Send + Sync {
    /// Run git with the given arguments, capturing both output streams.
    fn call(&self, args: &[&str]) -> Result<GitOutput, GitError>;
}

/// Runs the system `git` binary inside a working directory.
#[derive(Debug, Clone)]
pub struct SystemGit {
    work_dir: PathBuf,
}

impl SystemGit {
    /// Use the repository at `work_dir`.
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }
}

impl GitCli for SystemGit {
    fn call(&self, args: &[&str]) -> Result<GitOutput, GitError> {
        debug!(?args, "running git");
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.work_dir)
            .output()
            .map_err(|source| GitError::Spawn {
                args: owned_args(args),
                source,
            })?;
        Ok(GitOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

/// Commit or tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityType {
    /// A commit, addressed by hash or ref.
    Commit,
    /// A tag, addressed by name.
    Tag,
}

impl EntityType {
    /// `verify-commit` for commits, `verify-tag` for tags.
    pub(crate) const fn verify_subcommand(self) -> &'static str {
        match self {
            Self::Commit => "verify-commit",
            Self::Tag => "verify-tag",
        }
    }

    /// Label used in failure messages: `Commit(<id>)` / `Tag(<id>)`.
    #[must_use]
    pub fn label(self, id: &str) -> String {
        format!("{self}({id})")
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Commit => f.write_str("Commit"),
            Self::Tag => f.write_str("Tag"),
        }
    }
}

/// High-level git queries used by collection and verification.
pub struct GitRepo {
    cli: Box<dyn GitCli>,
}

impl GitRepo {
    /// Open the repository at `work_dir` using the system git binary.
    pub fn open(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            cli: Box::new(SystemGit::new(work_dir)),
        }
    }

    /// Use a custom [`GitCli`] implementation.
    pub fn with_cli(cli: Box<dyn GitCli>) -> Self {
        Self { cli }
    }

    /// List all tag names in the repository.
    ///
    /// # Errors
    ///
    /// Fails with [`GitError`] if git cannot be run or exits non-zero.
    pub fn list_all_tags(&self) -> Result<BTreeSet<String>, GitError> {
        let out = self.expect_success(&["tag", "--list"])?;
        Ok(trimmed_line_set(&out.stdout))
    }

    /// List tag names pointing at the given commit.
    ///
    /// # Errors
    ///
    /// Fails with [`GitError`] if git cannot be run or exits non-zero.
    pub fn list_tags_for_commit(&self, commit: &str) -> Result<BTreeSet<String>, GitError> {
        let out = self.expect_success(&["tag", "--list", "--points-at", commit])?;
        Ok(trimmed_line_set(&out.stdout))
    }

    /// Union of the tags pointing at any of the given commits.
    ///
    /// # Errors
    ///
    /// Fails with [`GitError`] on the first failing git call.
    pub fn list_tags_for_commits<'a>(
        &self,
        commits: impl IntoIterator<Item = &'a str>,
    ) -> Result<BTreeSet<String>, GitError> {
        let mut tags = BTreeSet::new();
        for commit in commits {
            tags.extend(self.list_tags_for_commit(commit)?);
        }
        Ok(tags)
    }

    /// List the commit hashes `git rev-list` reports for the range.
    ///
    /// # Errors
    ///
    /// Fails with [`GitError`] if git cannot be run or exits non-zero
    /// (e.g. an unknown ref).
    pub fn list_commits_in_range(&self, range: &CommitRange) -> Result<BTreeSet<String>, GitError> {
        let spec = range.rev_list_spec();
        let out = self.expect_success(&["rev-list", &spec])?;
        Ok(trimmed_line_set(&out.stdout))
    }

    /// Raw signature status stream for a commit or tag.
    ///
    /// The stream is read from stderr and the exit code is deliberately
    /// ignored: a failed verification still emits a parseable stream, and
    /// an unsigned entity emits none at all.
    ///
    /// # Errors
    ///
    /// Fails with [`GitError`] only when git itself cannot be run.
    pub fn signature_status(&self, entity: EntityType, id: &str) -> Result<String, GitError> {
        let out = self
            .cli
            .call(&[entity.verify_subcommand(), "--raw", "--", id])?;
        Ok(out.stderr)
    }

    fn expect_success(&self, args: &[&str]) -> Result<GitOutput, GitError> {
        let out = self.cli.call(args)?;
        if out.exit_code != 0 {
            return Err(GitError::CommandFailed {
                args: owned_args(args),
                exit_code: out.exit_code,
                stderr: out.stderr,
            });
        }
        Ok(out)
    }
}

fn owned_args(args: &[&str]) -> Vec<String> {
    args.iter().map(|&arg| arg.to_owned()).collect()
}

/// Split git's line-oriented stdout into a set of trimmed lines.
///
/// A sole trailing newline produces no entry, but interior
/// whitespace-only lines survive as empty strings after trimming.
fn trimmed_line_set(stdout: &str) -> BTreeSet<String> {
    if stdout.is_empty() || stdout == "\n" || stdout == "\r\n" {
        return BTreeSet::new();
    }
    stdout
        .lines()
        .map(|line| line.trim().to_owned())
        .collect()
}
