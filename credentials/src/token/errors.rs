use thiserror::Error;

/// Error type for token operations.
///
/// Verification distinguishes `Malformed`, `BadSignature` and `Expired` so
/// callers can log which one happened, even when they treat all three alike.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Signing key too short: minimum {min} bytes, got {actual}")]
    KeyTooShort { min: usize, actual: usize },

    #[error("Failed to encode token: {0}")]
    EncodingFailed(String),

    #[error("Claim {0:?} is reserved and cannot be set by the caller")]
    ReservedClaim(String),

    #[error("Token is malformed: {0}")]
    Malformed(String),

    #[error("Token signature is invalid")]
    BadSignature,

    #[error("Token is expired")]
    Expired,
}

impl TokenError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            TokenError::KeyTooShort { .. } => "key_too_short",
            TokenError::EncodingFailed(_) => "encoding_failed",
            TokenError::ReservedClaim(_) => "reserved_claim",
            TokenError::Malformed(_) => "malformed",
            TokenError::BadSignature => "bad_signature",
            TokenError::Expired => "expired",
        }
    }
}
