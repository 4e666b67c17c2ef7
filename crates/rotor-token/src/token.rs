//! The [`Token`] capability: what the ledger needs from a credential.

use std::fmt::Debug;

use crate::SessionId;

/// Claim key holding the owning session's ID (decimal string).
pub const SESSION_ID_CLAIM: &str = "id";

/// Claim key holding the token's [`TokenKind`](crate::TokenKind).
pub const KIND_CLAIM: &str = "kind";

/// An opaque credential.
///
/// The ledger treats tokens as values: it stores them, compares them with
/// `==`, and occasionally reads a claim. It never looks inside.
///
/// # Trait bounds
///
/// - `Clone` → generations are handed back to callers by value.
/// - `PartialEq` → rotation and "is this current?" are equality checks.
/// - `Send + Sync + 'static` → the ledger is shared across Tokio tasks.
pub trait Token: Clone + PartialEq + Debug + Send + Sync + 'static {
    /// Looks up a string claim by key.
    fn claim(&self, key: &str) -> Option<&str>;

    /// The session ID carried in the [`SESSION_ID_CLAIM`] claim, if present
    /// and well-formed.
    fn session_id(&self) -> Option<SessionId> {
        self.claim(SESSION_ID_CLAIM).and_then(SessionId::from_claim)
    }
}
