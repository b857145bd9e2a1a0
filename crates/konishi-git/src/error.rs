//! Error types for git collection and verification.

use konishi_gnupg::StatusParseError;

/// A git invocation failed.
#[derive(Debug, thiserror::Error)]
pub enum GitError {
    /// Spawning or waiting on the git binary failed.
    #[error("failed to run git {args:?}: {source}")]
    Spawn {
        /// Arguments the invocation was attempted with.
        args: Vec<String>,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// git exited non-zero for a command whose exit code matters.
    #[error("git {args:?} exited with status {exit_code}: {stderr}")]
    CommandFailed {
        /// Arguments of the failed invocation.
        args: Vec<String>,
        /// The non-zero exit code.
        exit_code: i32,
        /// Captured stderr of the failed invocation.
        stderr: String,
    },
}

/// Fatal errors from a collect-and-verify run.
///
/// Per-entity verification failures are *not* errors here; they are
/// entries in the returned failure list. Only collection-phase git
/// failures and status-protocol violations abort a run.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// A git call during entity collection failed.
    #[error(transparent)]
    Git(#[from] GitError),

    /// The signing tool's status stream violated its protocol.
    #[error(transparent)]
    StatusParse(#[from] StatusParseError),
}
