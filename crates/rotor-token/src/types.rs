//! Identity types shared by the token and ledger layers.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// A unique identifier for an authenticated session.
///
/// Newtype over `u64` so a session ID can't be confused with any other
/// integer in a signature. IDs are drawn at random from the full 64-bit
/// space by the ledger's allocator, which keeps collisions negligible.
///
/// `#[serde(transparent)]` serializes `SessionId(42)` as plain `42`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl SessionId {
    /// Parses a session ID from its claim form (a decimal string).
    ///
    /// Returns `None` for anything that isn't a plain unsigned integer.
    pub fn from_claim(value: &str) -> Option<Self> {
        value.trim().parse().ok().map(Self)
    }

    /// The claim form of this ID: the decimal value, without the display
    /// prefix, so it round-trips through [`SessionId::from_claim`].
    pub fn to_claim(self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// TokenKind
// ---------------------------------------------------------------------------

/// Which half of a generation a token is.
///
/// Every generation holds exactly one refresh token and one access
/// ("auth") token. Lookups against a chain always name the kind, so a
/// refresh token can never match an auth slot by accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Long-lived credential exchanged for a new generation.
    Refresh,
    /// Short-lived credential presented to resource servers.
    Auth,
}

impl TokenKind {
    /// The string used for this kind in a token's `kind` claim.
    pub fn as_claim(self) -> &'static str {
        match self {
            Self::Refresh => "refresh",
            Self::Auth => "auth",
        }
    }

    /// Parses the claim form produced by [`TokenKind::as_claim`].
    pub fn from_claim(value: &str) -> Option<Self> {
        match value {
            "refresh" => Some(Self::Refresh),
            "auth" => Some(Self::Auth),
            _ => None,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_claim())
    }
}
