//! Parsed signature verdicts.

use std::fmt;

use crate::trust::TrustLevel;

/// Reason a signature is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A bad signature (signature verification failed).
    BadSignature,
    /// The key used for signing expired.
    ExpiredKey,
    /// The signature itself expired.
    ExpiredSignature,
    /// The key used for signing was revoked.
    RevokedKey,
    /// The key used for signing is unknown; trust and validity can not be
    /// determined.
    UnknownKey,
    /// Validation failed due to an error gpg ran into.
    SigValidationError,
    /// The gpg output could not be interpreted; treated as an error.
    UnrecognizedNonGoodSignature,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BadSignature => "BadSignature",
            Self::ExpiredKey => "ExpiredKey",
            Self::ExpiredSignature => "ExpiredSignature",
            Self::RevokedKey => "RevokedKey",
            Self::UnknownKey => "UnknownKey",
            Self::SigValidationError => "SigValidationError",
            Self::UnrecognizedNonGoodSignature => "UnrecognizedNonGoodSignature",
        };
        f.write_str(name)
    }
}

/// The parsed verdict for one signature block of the status stream.
///
/// Exactly one of the two shapes holds: a valid signature carries a trust
/// level, an invalid one carries the reason it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureRecord {
    /// The tool asserted a good signature with the given trust level.
    Valid {
        /// Trust in the key that produced the signature.
        trust_level: TrustLevel,
    },
    /// The signature did not verify.
    Invalid {
        /// Why verification failed.
        error_kind: ErrorKind,
    },
}
