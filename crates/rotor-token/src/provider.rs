//! The [`TokenProvider`] capability: minting and validating tokens.
//!
//! Rotor doesn't sign anything. Your gateway already knows how to mint a
//! JWT, a PASETO, or a random opaque handle; it implements this trait and
//! hands it to the ledger. The ledger calls it when a session is created,
//! when a refresh token is presented, and when a caller asks whether a
//! presented credential is still usable.

use std::future::Future;

use crate::{SessionId, Token, TokenError};

/// Mints and validates the tokens stored in a session chain.
///
/// Every method is async so that providers backed by a KMS or a remote
/// signer fit without blocking the runtime.
///
/// # Trait bounds
///
/// - `Send + Sync` → one provider is shared by every task that touches the
///   ledger, and Tokio may run those tasks on different threads.
/// - `'static` → the provider owns its data instead of borrowing it, since
///   it lives as long as the ledger does.
///
/// # Why `impl Future + Send` instead of `async fn`?
///
/// The two mean the same thing to implementors: you can (and should) write
/// `async fn` in your `impl` block, as the example below does. Spelling the
/// return type out in the trait lets us add `+ Send`, which promises the
/// ledger that it can `.await` these futures inside a `tokio::spawn`ed task.
/// A bare `async fn` in a trait makes no such promise.
///
/// # Example
///
/// ```rust
/// use rotor_token::{OpaqueToken, SessionId, TokenError, TokenKind, TokenProvider};
///
/// /// Mints tokens that never expire.
/// /// Only for development, never in production!
/// struct EternalProvider;
///
/// impl TokenProvider for EternalProvider {
///     type Token = OpaqueToken;
///
///     async fn generate_auth_token(
///         &self,
///         session: SessionId,
///     ) -> Result<OpaqueToken, TokenError> {
///         Ok(OpaqueToken::random(session, TokenKind::Auth, None))
///     }
///
///     async fn generate_refresh_token(
///         &self,
///         session: SessionId,
///     ) -> Result<OpaqueToken, TokenError> {
///         Ok(OpaqueToken::random(session, TokenKind::Refresh, None))
///     }
///
///     async fn is_auth_valid(&self, token: &OpaqueToken) -> Result<bool, TokenError> {
///         Ok(token.kind() == Some(TokenKind::Auth))
///     }
///
///     async fn is_refresh_valid(&self, token: &OpaqueToken) -> Result<bool, TokenError> {
///         Ok(token.kind() == Some(TokenKind::Refresh))
///     }
/// }
/// ```
pub trait TokenProvider: Send + Sync + 'static {
    /// The credential type this provider mints.
    ///
    /// An associated type, not a generic parameter: a given provider mints
    /// exactly one kind of credential, so the ledger can name it as
    /// `P::Token` without a second type parameter.
    type Token: Token;

    /// Mints a new access token for `session`.
    ///
    /// # Errors
    /// [`TokenError::Generation`] if the provider cannot mint.
    fn generate_auth_token(
        &self,
        session: SessionId,
    ) -> impl Future<Output = Result<Self::Token, TokenError>> + Send;

    /// Mints a new refresh token for `session`.
    ///
    /// # Errors
    /// [`TokenError::Generation`] if the provider cannot mint.
    fn generate_refresh_token(
        &self,
        session: SessionId,
    ) -> impl Future<Output = Result<Self::Token, TokenError>> + Send;

    /// Checks an access token's intrinsic validity (signature, expiry).
    ///
    /// # Returns
    /// - `Ok(true)`: token is well-formed and in its validity window
    /// - `Ok(false)`: token is not an access token this provider accepts
    /// - `Err(TokenError::Expired)`: validity window elapsed
    fn is_auth_valid(
        &self,
        token: &Self::Token,
    ) -> impl Future<Output = Result<bool, TokenError>> + Send;

    /// Checks a refresh token's intrinsic validity (signature, expiry).
    ///
    /// Same contract as [`TokenProvider::is_auth_valid`].
    fn is_refresh_valid(
        &self,
        token: &Self::Token,
    ) -> impl Future<Output = Result<bool, TokenError>> + Send;
}
