//! Session ID allocation.
//!
//! IDs are drawn uniformly from the full `u64` space using `rand`'s
//! thread-local generator (a CSPRNG reseeded from the OS). Guessing a live
//! session ID is therefore as hard as guessing a 64-bit secret, and two
//! draws colliding is vanishingly rare even with millions of sessions.
//! The retry loop is bounded all the same.

use rand::Rng;
use rotor_token::SessionId;

use crate::LedgerError;

/// Draws collision-free [`SessionId`]s.
#[derive(Debug, Clone)]
pub struct SessionIdAllocator {
    max_attempts: u32,
}

impl SessionIdAllocator {
    /// Creates an allocator that gives up after `max_attempts` collisions.
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    /// Returns a random ID for which `is_taken` is `false`.
    ///
    /// `is_taken` is usually a lookup into the ledger's key set, evaluated
    /// while the caller holds the lock that guards it.
    ///
    /// # Errors
    /// [`LedgerError::AllocationExhausted`] if every candidate drawn within
    /// the retry budget was taken.
    pub fn next(
        &self,
        is_taken: impl Fn(SessionId) -> bool,
    ) -> Result<SessionId, LedgerError> {
        let mut rng = rand::rng();
        for attempt in 1..=self.max_attempts {
            let candidate = SessionId(rng.random());
            if !is_taken(candidate) {
                return Ok(candidate);
            }
            tracing::debug!(%candidate, attempt, "session id collision, retrying");
        }

        tracing::error!(attempts = self.max_attempts, "session id allocation exhausted");
        Err(LedgerError::AllocationExhausted {
            attempts: self.max_attempts,
        })
    }

    /// The retry budget.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}
