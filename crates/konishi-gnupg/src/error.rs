//! Error types for status-stream parsing.

/// Fatal status-protocol violations.
///
/// Each variant signals either a bug in this parser or a protocol change
/// in the signing tool. They abort the whole parse and are never coerced
/// into a signature verdict. The offending raw stream is carried along for
/// debugging.
#[derive(Debug, thiserror::Error)]
pub enum StatusParseError {
    /// More than one `TRUST_*` signal for the same signature.
    #[error("gpg output contained multiple TRUST_* signals for the same signature, better not processing that:\n{raw}")]
    DuplicateTrustSignal {
        /// The full raw status stream.
        raw: String,
    },

    /// Conflicting error signals for the same signature.
    #[error("gpg output contained multiple error signals for the same signature, better not processing that:\n{raw}")]
    ConflictingErrorSignals {
        /// The full raw status stream.
        raw: String,
    },

    /// More than one `GOODSIG` signal for the same signature.
    #[error("gpg output contained multiple GOODSIG signals for the same signature, better not processing that:\n{raw}")]
    DuplicateGoodSig {
        /// The full raw status stream.
        raw: String,
    },

    /// A `GOODSIG` without any `TRUST_*` entry.
    #[error("gpg output contained GOODSIG but no TRUST_ entry, better not processing that:\n{raw}")]
    GoodSigWithoutTrustLevel {
        /// The full raw status stream.
        raw: String,
    },
}
