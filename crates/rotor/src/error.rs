//! Unified error type for the Rotor facade.

use rotor_ledger::LedgerError;
use rotor_token::TokenError;

/// Top-level error that wraps all crate-specific errors.
///
/// `#[from]` on each variant lets `?` convert sub-crate errors
/// automatically. Note that [`LedgerError`] already carries provider errors
/// in its `Token` variant; the `Token` variant here is for callers that use
/// a [`TokenProvider`](rotor_token::TokenProvider) directly.
#[derive(Debug, thiserror::Error)]
pub enum RotorError {
    /// A provider-level error (generation failure, expiry).
    #[error(transparent)]
    Token(#[from] TokenError),

    /// A ledger-level error (unknown session, reuse, invalid token).
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl RotorError {
    /// Returns `true` if this error means a refresh token was replayed.
    ///
    /// Callers usually want to alert on this one specifically.
    pub fn is_reuse(&self) -> bool {
        matches!(self, Self::Ledger(LedgerError::TokenReuseDetected(_)))
    }

    /// Returns `true` if the provider reported an expired token, whether it
    /// came back directly or through the ledger.
    pub fn is_expired(&self) -> bool {
        matches!(
            self,
            Self::Token(TokenError::Expired(_))
                | Self::Ledger(LedgerError::Token(TokenError::Expired(_)))
        )
    }
}
