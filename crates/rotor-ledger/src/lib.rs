//! Rotating refresh-credential ledger for Rotor.
//!
//! This crate owns the lifecycle of a session's credentials:
//!
//! 1. **Creation**: a new session gets a random ID and an initial
//!    refresh/access pair ([`TokenLedger::create_session`])
//! 2. **Rotation**: presenting the current refresh token mints the next
//!    pair and supersedes the old one ([`TokenLedger::rotate`])
//! 3. **Reuse detection**: presenting a superseded refresh token is
//!    treated as a leaked credential and (by default) revokes the session
//! 4. **Invalidation**: the whole chain is dropped at once
//!
//! # How it fits in the stack
//!
//! ```text
//! Caller (above)  ← auth endpoint / resource server
//!     ↕
//! Ledger Layer (this crate)  ← SessionChain per SessionId, concurrency
//!     ↕
//! Token Layer (below)  ← Token, TokenProvider, SessionId
//! ```

mod allocator;
mod chain;
mod config;
mod error;
mod ledger;

pub use allocator::SessionIdAllocator;
pub use chain::{Generation, SessionChain};
pub use config::LedgerConfig;
pub use error::LedgerError;
pub use ledger::TokenLedger;
