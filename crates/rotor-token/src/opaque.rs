//! A reference in-memory token type and provider.
//!
//! [`OpaqueToken`] is a random 128-bit handle plus a small claim map.
//! [`OpaqueTokenProvider`] mints them with a per-kind time-to-live and
//! rejects them once that TTL has elapsed. Nothing is signed: the handle's
//! randomness is the only thing standing between an attacker and a valid
//! token, which is fine for development, tests, and single-process
//! deployments where tokens never leave trusted storage.
//!
//! Expiry uses `tokio::time::Instant`, so tests can pause and advance the
//! clock instead of sleeping.

use std::collections::BTreeMap;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::token::{KIND_CLAIM, SESSION_ID_CLAIM};
use crate::{SessionId, Token, TokenError, TokenKind, TokenProvider};

// ---------------------------------------------------------------------------
// OpaqueToken
// ---------------------------------------------------------------------------

/// A random token value with string claims and an optional expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpaqueToken {
    value: String,
    claims: BTreeMap<String, String>,
    expires_at: Option<Instant>,
}

impl OpaqueToken {
    /// Mints a token with a fresh random value and the `id`/`kind` claims
    /// filled in for `session`.
    pub fn random(
        session: SessionId,
        kind: TokenKind,
        expires_at: Option<Instant>,
    ) -> Self {
        let mut claims = BTreeMap::new();
        claims.insert(SESSION_ID_CLAIM.to_string(), session.to_claim());
        claims.insert(KIND_CLAIM.to_string(), kind.as_claim().to_string());
        Self {
            value: random_hex(),
            claims,
            expires_at,
        }
    }

    /// Builds a token from explicit parts. Mostly useful in tests that need
    /// a token the provider never issued.
    pub fn from_parts(
        value: impl Into<String>,
        claims: BTreeMap<String, String>,
        expires_at: Option<Instant>,
    ) -> Self {
        Self {
            value: value.into(),
            claims,
            expires_at,
        }
    }

    /// The opaque handle, as it would be handed to a client.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The kind recorded in the `kind` claim.
    pub fn kind(&self) -> Option<TokenKind> {
        self.claim(KIND_CLAIM).and_then(TokenKind::from_claim)
    }

    /// When this token stops being valid, if it ever does.
    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    /// Returns `true` once the expiry instant has been reached.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

impl Token for OpaqueToken {
    fn claim(&self, key: &str) -> Option<&str> {
        self.claims.get(key).map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// ProviderConfig
// ---------------------------------------------------------------------------

/// Lifetimes for tokens minted by [`OpaqueTokenProvider`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// How long an access token stays valid after minting.
    pub auth_ttl: Duration,

    /// How long a refresh token stays valid after minting.
    pub refresh_ttl: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            auth_ttl: Duration::from_secs(15 * 60),
            refresh_ttl: Duration::from_secs(30 * 24 * 60 * 60),
        }
    }
}

// ---------------------------------------------------------------------------
// OpaqueTokenProvider
// ---------------------------------------------------------------------------

/// Mints [`OpaqueToken`]s and validates them by kind and expiry.
#[derive(Debug, Clone, Default)]
pub struct OpaqueTokenProvider {
    config: ProviderConfig,
}

impl OpaqueTokenProvider {
    /// Creates a provider with the given token lifetimes.
    pub fn new(config: ProviderConfig) -> Self {
        Self { config }
    }

    /// The lifetimes this provider mints with.
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn mint(&self, session: SessionId, kind: TokenKind) -> OpaqueToken {
        let ttl = match kind {
            TokenKind::Refresh => self.config.refresh_ttl,
            TokenKind::Auth => self.config.auth_ttl,
        };
        OpaqueToken::random(session, kind, Some(Instant::now() + ttl))
    }

    fn check(token: &OpaqueToken, expected: TokenKind) -> Result<bool, TokenError> {
        if token.kind() != Some(expected) {
            return Ok(false);
        }
        if token.is_expired() {
            let owner = token
                .session_id()
                .map_or_else(|| "unknown session".to_string(), |id| id.to_string());
            return Err(TokenError::Expired(format!("{expected} token for {owner}")));
        }
        Ok(true)
    }
}

impl TokenProvider for OpaqueTokenProvider {
    type Token = OpaqueToken;

    async fn generate_auth_token(
        &self,
        session: SessionId,
    ) -> Result<OpaqueToken, TokenError> {
        Ok(self.mint(session, TokenKind::Auth))
    }

    async fn generate_refresh_token(
        &self,
        session: SessionId,
    ) -> Result<OpaqueToken, TokenError> {
        Ok(self.mint(session, TokenKind::Refresh))
    }

    async fn is_auth_valid(&self, token: &OpaqueToken) -> Result<bool, TokenError> {
        Self::check(token, TokenKind::Auth)
    }

    async fn is_refresh_valid(&self, token: &OpaqueToken) -> Result<bool, TokenError> {
        Self::check(token, TokenKind::Refresh)
    }
}

/// Generates a random 32-character hex string (128 bits of entropy).
fn random_hex() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
