//! The verification policy engine and run orchestration.
//!
//! Per entity, the engine filters ignorable signature records, enforces
//! the signature-required rule on what is left, and judges every surviving
//! record against the minimum trust level. Filtering happens *before* the
//! required check: an entity whose only signature was ignorable counts as
//! having none.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, info};

use konishi_gnupg::{parse_raw_status, ErrorKind, SignatureRecord, StatusParseError, TrustLevel};

use crate::collect::{collect_commits_and_tags, CollectedEntities, CollectionOptions};
use crate::error::VerifyError;
use crate::repo::{EntityType, GitRepo};

/// Determines under which conditions signature checks fail.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationOptions {
    /// Minimum trust level a valid signature must carry.
    pub require_min_trust_level: TrustLevel,
    /// Fail entities that have no (non-ignored) signature at all.
    pub require_signature: bool,
    /// Drop invalid records caused by unknown keys before judging.
    pub ignore_unknown_keys: bool,
    /// Drop valid records below the minimum trust level before judging.
    pub ignore_untrusted_keys: bool,
}

impl Default for VerificationOptions {
    fn default() -> Self {
        Self {
            require_min_trust_level: TrustLevel::Undefined,
            require_signature: false,
            ignore_unknown_keys: false,
            ignore_untrusted_keys: false,
        }
    }
}

/// Verification options for both entity kinds.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VerificationPolicy {
    /// Options applied to commits.
    pub for_commits: VerificationOptions,
    /// Options applied to tags.
    pub for_tags: VerificationOptions,
}

/// A single verification failure.
///
/// These are expected outcomes, collected and reported; they are never
/// raised as errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationFailure {
    /// A signature was required but none survived filtering.
    #[error("{label} requires a signature but has no (non-ignored) signatures.")]
    MissingSignature {
        /// Entity label, e.g. `Tag(v1.0.0)`.
        label: String,
    },

    /// A signature did not verify.
    #[error("Invalid signature for {label} because of {kind}")]
    InvalidSignature {
        /// Entity label.
        label: String,
        /// Why the signature is invalid.
        kind: ErrorKind,
    },

    /// A valid signature did not meet the minimum trust level.
    #[error("Valid but untrusted signature on {label} had {level} but required at least {min}")]
    UntrustedSignature {
        /// Entity label.
        label: String,
        /// Trust level the signature carried.
        level: TrustLevel,
        /// Trust level the policy required.
        min: TrustLevel,
    },

    /// Retrieving the signature status for the entity failed.
    #[error("{label}: {message}")]
    RetrievalFailed {
        /// Entity label.
        label: String,
        /// Message of the underlying failure.
        message: String,
    },
}

/// Check a list of signature records for one entity against the options.
///
/// An entity can carry several independent signatures; each surviving
/// record is judged separately, so zero, one, or many failures can come
/// out of a single entity. The input slice is never mutated.
#[must_use]
pub fn check_signature_list(
    records: &[SignatureRecord],
    options: &VerificationOptions,
    label: &str,
) -> Vec<VerificationFailure> {
    let mut kept: Vec<&SignatureRecord> = records.iter().collect();

    if options.ignore_unknown_keys {
        kept.retain(|record| {
            let keep = !matches!(
                record,
                SignatureRecord::Invalid {
                    error_kind: ErrorKind::UnknownKey
                }
            );
            if !keep {
                debug!(label, "ignoring unknown key signature");
            }
            keep
        });
    }

    if options.ignore_untrusted_keys {
        kept.retain(|record| match record {
            SignatureRecord::Invalid { .. } => true,
            SignatureRecord::Valid { trust_level } => {
                let keep = trust_level.is_compatible_with_min(options.require_min_trust_level);
                if !keep {
                    debug!(label, "ignoring untrusted signature");
                }
                keep
            }
        });
    }

    if options.require_signature && kept.is_empty() {
        return vec![VerificationFailure::MissingSignature {
            label: label.to_owned(),
        }];
    }

    kept.into_iter()
        .filter_map(|record| check_signature(record, options.require_min_trust_level, label))
        .collect()
}

/// Judge one signature record against the minimum trust level.
#[must_use]
pub fn check_signature(
    record: &SignatureRecord,
    min: TrustLevel,
    label: &str,
) -> Option<VerificationFailure> {
    match record {
        SignatureRecord::Invalid { error_kind } => Some(VerificationFailure::InvalidSignature {
            label: label.to_owned(),
            kind: *error_kind,
        }),
        SignatureRecord::Valid { trust_level } => {
            if trust_level.is_compatible_with_min(min) {
                None
            } else {
                Some(VerificationFailure::UntrustedSignature {
                    label: label.to_owned(),
                    level: *trust_level,
                    min,
                })
            }
        }
    }
}

/// Retrieve, parse, and judge the signatures of one entity.
///
/// A retrieval failure becomes a single failure entry so one bad entity
/// cannot mask the rest of the run; a status-protocol violation is fatal.
///
/// # Errors
///
/// Returns [`StatusParseError`] if the status stream violates its
/// protocol.
pub fn verify_entity(
    repo: &GitRepo,
    entity: EntityType,
    id: &str,
    options: &VerificationOptions,
) -> Result<Vec<VerificationFailure>, StatusParseError> {
    let label = entity.label(id);
    let raw = match repo.signature_status(entity, id) {
        Ok(raw) => raw,
        Err(err) => {
            return Ok(vec![VerificationFailure::RetrievalFailed {
                label,
                message: err.to_string(),
            }]);
        }
    };
    let records = parse_raw_status(&raw)?;
    debug!(%label, records = records.len(), "judging signature records");
    Ok(check_signature_list(&records, options, &label))
}

/// Verify every entity of one kind, concatenating failures.
///
/// # Errors
///
/// Returns [`StatusParseError`] if any entity's status stream violates
/// its protocol.
pub fn verify_all(
    repo: &GitRepo,
    entity: EntityType,
    ids: &BTreeSet<String>,
    options: &VerificationOptions,
) -> Result<Vec<VerificationFailure>, StatusParseError> {
    let mut failures = Vec::new();
    for id in ids {
        failures.extend(verify_entity(repo, entity, id, options)?);
    }
    Ok(failures)
}

/// Verify all collected commits, then all collected tags.
///
/// # Errors
///
/// Returns [`StatusParseError`] if any status stream violates its
/// protocol.
pub fn verify_commits_and_tags(
    repo: &GitRepo,
    entities: &CollectedEntities,
    policy: &VerificationPolicy,
) -> Result<Vec<VerificationFailure>, StatusParseError> {
    let mut failures = verify_all(repo, EntityType::Commit, &entities.commits, &policy.for_commits)?;
    failures.extend(verify_all(
        repo,
        EntityType::Tag,
        &entities.tags,
        &policy.for_tags,
    )?);
    Ok(failures)
}

/// All options for a collect-and-verify run.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Which entities to check.
    pub collection: CollectionOptions,
    /// How to judge their signatures.
    pub verification: VerificationPolicy,
}

/// Result of a collect-and-verify run.
///
/// The resolved sets are reported regardless of verification outcome so
/// callers know what was checked even when the run fails.
#[derive(Debug)]
pub struct Outcome {
    /// All checked commit hashes.
    pub commits: BTreeSet<String>,
    /// All checked tag names.
    pub tags: BTreeSet<String>,
    /// Every verification failure across both entity kinds.
    pub errors: Vec<VerificationFailure>,
}

/// Single entry point: collect the requested entities, then verify them.
///
/// # Errors
///
/// Fails with [`VerifyError`] only for collection-phase git failures or
/// status-protocol violations; verification failures are reported in the
/// returned [`Outcome`].
pub fn collect_and_verify(repo: &GitRepo, options: &Options) -> Result<Outcome, VerifyError> {
    let entities = collect_commits_and_tags(repo, &options.collection)?;
    let errors = verify_commits_and_tags(repo, &entities, &options.verification)?;
    info!(
        commits = entities.commits.len(),
        tags = entities.tags.len(),
        failures = errors.len(),
        "verification run finished"
    );
    Ok(Outcome {
        commits: entities.commits,
        tags: entities.tags,
        errors,
    })
}
