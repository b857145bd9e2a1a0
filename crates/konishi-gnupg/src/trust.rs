//! Trust levels and the minimum-trust comparison.

use std::fmt;

use serde::Serialize;

/// Degree of confidence in the key that produced a valid signature.
///
/// `Unknown` and `Undefined` convey the same degree of trust in different
/// ways and rank equally. `Never` is a poison value: it satisfies no
/// minimum, not even a minimum of `Never` itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrustLevel {
    /// The key is explicitly marked as never trusted.
    Never,
    /// No trust assigned to the key.
    Undefined,
    /// Trust in the key could not be determined.
    Unknown,
    /// The key is marginally trusted.
    Marginal,
    /// The key is fully trusted.
    Full,
    /// The key is ultimately trusted (usually the user's own key).
    Ultimate,
}

impl TrustLevel {
    /// Parse a status-protocol token (case-insensitive) into a trust level.
    ///
    /// Returns `None` for unrecognized input; the caller decides whether
    /// that is an error.
    #[must_use]
    pub fn from_status_token(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "NEVER" => Some(Self::Never),
            "UNDEFINED" => Some(Self::Undefined),
            "UNKNOWN" => Some(Self::Unknown),
            "MARGINAL" => Some(Self::Marginal),
            "FULL" => Some(Self::Full),
            "ULTIMATE" => Some(Self::Ultimate),
            _ => None,
        }
    }

    /// Ordering rank used by the minimum-trust comparison.
    ///
    /// `Never` has no rank; it must never compare as satisfying anything.
    const fn rank(self) -> Option<u8> {
        match self {
            Self::Never => None,
            Self::Undefined | Self::Unknown => Some(1),
            Self::Marginal => Some(2),
            Self::Full => Some(3),
            Self::Ultimate => Some(4),
        }
    }

    /// Check whether this level satisfies the given minimum.
    ///
    /// A level of `Never` is never compatible, and a minimum of `Never`
    /// rejects everything, `Ultimate` included.
    #[must_use]
    pub fn is_compatible_with_min(self, min: Self) -> bool {
        match (self.rank(), min.rank()) {
            (Some(level), Some(min)) => level >= min,
            _ => false,
        }
    }
}

impl fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Never => "Never",
            Self::Undefined => "Undefined",
            Self::Unknown => "Unknown",
            Self::Marginal => "Marginal",
            Self::Full => "Full",
            Self::Ultimate => "Ultimate",
        };
        f.write_str(name)
    }
}
