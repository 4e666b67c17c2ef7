//! Error types for the token layer.
//!
//! A provider can fail in exactly two ways that the ledger cares about:
//! it could not mint a token, or it rejected a token as no longer valid.
//! The ledger propagates both unchanged.

/// Errors reported by a [`TokenProvider`](crate::TokenProvider).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// The provider failed to mint a new token (key unavailable, signer
    /// error, etc.).
    #[error("token generation failed: {0}")]
    Generation(String),

    /// The provider rejected a token because its validity window elapsed.
    #[error("token expired: {0}")]
    Expired(String),
}
