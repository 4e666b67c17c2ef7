//! Ledger configuration.

use serde::{Deserialize, Serialize};

/// Configuration for a [`TokenLedger`](crate::TokenLedger).
///
/// Sensible defaults are provided; override just the fields you need:
///
/// ```rust
/// use rotor_ledger::LedgerConfig;
///
/// let config = LedgerConfig {
///     revoke_on_reuse: false,
///     ..LedgerConfig::default()
/// };
/// assert_eq!(config.max_allocation_attempts, 8);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// How many random candidates the allocator draws before giving up
    /// with [`LedgerError::AllocationExhausted`](crate::LedgerError).
    ///
    /// With 64-bit IDs a single retry is already astronomically rare.
    pub max_allocation_attempts: u32,

    /// Whether presenting a superseded refresh token revokes the whole
    /// session, not just the failing call.
    ///
    /// Default: `true`. A replayed refresh token means either the client
    /// or an attacker holds a stale copy, and the ledger can't tell which.
    pub revoke_on_reuse: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_allocation_attempts: 8,
            revoke_on_reuse: true,
        }
    }
}
