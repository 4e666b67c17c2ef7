//! # Rotor
//!
//! Rotating refresh/access credential ledger.
//!
//! Every session holds a chain of credential generations. Presenting the
//! current refresh token mints the next generation; presenting an older one
//! is treated as a stolen credential. Rotor keeps that chain consistent under
//! concurrent requests and leaves signing and transport to you: implement
//! [`TokenProvider`] for your token format and hand it to a [`TokenLedger`].
//!
//! ## Quick Start
//!
//! ```rust
//! use rotor::prelude::*;
//!
//! # async fn demo() -> Result<(), RotorError> {
//! let ledger = TokenLedger::new(OpaqueTokenProvider::default(), LedgerConfig::default());
//!
//! let (id, gen0) = ledger.create_session().await?;
//! let gen1 = ledger.rotate(id, gen0.refresh()).await?;
//!
//! assert!(ledger.is_current(id, gen1.auth(), TokenKind::Auth).await?);
//! assert!(ledger.rotate(id, gen0.refresh()).await.is_err());
//! # Ok(())
//! # }
//! ```

mod error;

pub use error::RotorError;
pub use rotor_ledger::{
    Generation, LedgerConfig, LedgerError, SessionChain, SessionIdAllocator, TokenLedger,
};
pub use rotor_token::{
    KIND_CLAIM, OpaqueToken, OpaqueTokenProvider, ProviderConfig, SESSION_ID_CLAIM, SessionId,
    Token, TokenError, TokenKind, TokenProvider,
};

/// Everything most callers need, in one import.
pub mod prelude {
    pub use crate::{
        Generation, LedgerConfig, LedgerError, OpaqueToken, OpaqueTokenProvider, ProviderConfig,
        RotorError, SessionId, Token, TokenError, TokenKind, TokenLedger, TokenProvider,
    };
}

/// Installs a `tracing` subscriber that honours `RUST_LOG`, falling back to
/// `default_directive` (e.g. `"info"` or `"rotor_ledger=debug"`).
///
/// Safe to call more than once; only the first call installs anything.
pub fn init_tracing(default_directive: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_ok() {
        tracing::debug!("tracing initialized");
    }
}
