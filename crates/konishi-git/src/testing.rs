//! Scripted [`GitCli`] implementation for tests.

use std::collections::HashMap;

use crate::error::GitError;
use crate::repo::{GitCli, GitOutput};

enum Response {
    Output(GitOutput),
    SpawnError(String),
}

/// Maps exact git argument vectors to canned outputs.
///
/// Unscripted calls panic so tests notice unexpected git traffic.
#[derive(Default)]
pub(crate) struct ScriptedGit {
    responses: HashMap<Vec<String>, Response>,
}

impl ScriptedGit {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Succeed with the given stdout.
    pub(crate) fn on(mut self, args: &[&str], stdout: &str) -> Self {
        self.responses.insert(
            key(args),
            Response::Output(GitOutput {
                stdout: stdout.to_owned(),
                stderr: String::new(),
                exit_code: 0,
            }),
        );
        self
    }

    /// Exit non-zero with the given stderr.
    pub(crate) fn failing(mut self, args: &[&str], stderr: &str) -> Self {
        self.responses.insert(
            key(args),
            Response::Output(GitOutput {
                stdout: String::new(),
                stderr: stderr.to_owned(),
                exit_code: 1,
            }),
        );
        self
    }

    /// Emit a status stream on stderr with the given exit code, the way
    /// `git verify-commit --raw` does.
    pub(crate) fn with_status_stream(mut self, args: &[&str], stderr: &str, exit_code: i32) -> Self {
        self.responses.insert(
            key(args),
            Response::Output(GitOutput {
                stdout: String::new(),
                stderr: stderr.to_owned(),
                exit_code,
            }),
        );
        self
    }

    /// Fail at spawn level, as if the git binary were missing.
    pub(crate) fn erroring(mut self, args: &[&str], message: &str) -> Self {
        self.responses
            .insert(key(args), Response::SpawnError(message.to_owned()));
        self
    }
}

impl GitCli for ScriptedGit {
    fn call(&self, args: &[&str]) -> Result<GitOutput, GitError> {
        match self.responses.get(&key(args)) {
            Some(Response::Output(out)) => Ok(out.clone()),
            Some(Response::SpawnError(message)) => Err(GitError::Spawn {
                args: key(args),
                source: std::io::Error::other(message.clone()),
            }),
            None => panic!("unscripted git call: {args:?}"),
        }
    }
}

fn key(args: &[&str]) -> Vec<String> {
    args.iter().map(|&arg| arg.to_owned()).collect()
}
