//! Entity collection and signature verification over a git repository.
//!
//! `konishi-git` decides *which* commits and tags to check (declarative
//! include/exclude/range/filter set algebra), retrieves each entity's raw
//! GnuPG status stream through a narrow git seam, and judges the parsed
//! signature records against a configurable trust policy.
//!
//! A verification run has three phases:
//! 1. **Collect** — resolve the commit set, then the tag set (tags may
//!    depend on the resolved commits, never the other way around)
//! 2. **Retrieve & parse** — `git verify-commit/verify-tag --raw` per
//!    entity, parsed by [`konishi_gnupg`]
//! 3. **Judge** — per-record policy checks, failures collected per entity

pub mod collect;
pub mod error;
pub mod repo;
pub mod verify;

#[cfg(test)]
pub(crate) mod testing;

// Re-export primary types for convenience.
pub use collect::{
    CollectedEntities, CollectionOptions, CommitCollectionOptions, CommitRange, EmptyRangeError,
    TagCollectionOptions, TagSource,
};
pub use error::{GitError, VerifyError};
pub use repo::{EntityType, GitCli, GitOutput, GitRepo, SystemGit};
pub use verify::{
    collect_and_verify, Options, Outcome, VerificationFailure, VerificationOptions,
    VerificationPolicy,
};
