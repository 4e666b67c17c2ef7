//! Error types for the ledger layer.

use rotor_token::{SessionId, TokenError};

/// Errors that can occur during ledger operations.
///
/// Every ledger operation either succeeds completely or fails with one of
/// these without having changed anything.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The token provider failed to mint or rejected a token as expired.
    /// Passed through exactly as the provider reported it.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// No session exists for the given ID. Either it was never created or
    /// it has already been invalidated.
    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    /// The presented refresh token was never issued to this session.
    #[error("invalid refresh token for session {0}")]
    InvalidRefreshToken(SessionId),

    /// The presented refresh token belongs to a superseded generation.
    /// Someone is replaying an old credential, which usually means it
    /// leaked.
    #[error("refresh token reuse detected for session {0}")]
    TokenReuseDetected(SessionId),

    /// The allocator could not find a free session ID within its retry
    /// budget.
    #[error("session id allocation exhausted after {attempts} attempts")]
    AllocationExhausted { attempts: u32 },

    /// A token's claims did not identify a session.
    #[error("invalid session claim: {0}")]
    InvalidClaim(String),
}
