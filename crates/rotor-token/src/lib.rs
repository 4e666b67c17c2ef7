//! Token capabilities for Rotor.
//!
//! Rotor never encodes, signs, or verifies credentials itself. This crate
//! defines the seams the ledger talks through:
//!
//! - **Identity** ([`SessionId`], [`TokenKind`]): which session a credential
//!   belongs to, and which half of a refresh/access pair it is.
//! - **Token** ([`Token`] trait): an opaque value that can be compared for
//!   equality and asked for string claims.
//! - **Provider** ([`TokenProvider`] trait): mints and validates tokens.
//!   Your gateway implements this; the ledger only calls it.
//! - **Errors** ([`TokenError`]): what a provider reports when minting or
//!   validation fails.
//!
//! [`OpaqueToken`] and [`OpaqueTokenProvider`] are a small in-memory
//! implementation of both traits, useful for development and tests.
//!
//! # How it fits in the stack
//!
//! ```text
//! Ledger Layer (above)  ← rotates chains of generations per session
//!     ↕
//! Token Layer (this crate)  ← SessionId, Token, TokenProvider
//! ```

#![allow(async_fn_in_trait)]

mod error;
mod opaque;
mod provider;
mod token;
mod types;

pub use error::TokenError;
pub use opaque::{OpaqueToken, OpaqueTokenProvider, ProviderConfig};
pub use provider::TokenProvider;
pub use token::{KIND_CLAIM, SESSION_ID_CLAIM, Token};
pub use types::{SessionId, TokenKind};
