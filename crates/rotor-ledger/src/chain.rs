//! Session chains: the append-only history of a session's credentials.
//!
//! Every rotation adds one [`Generation`] to the end of the chain. Nothing
//! is ever removed or edited, so the chain doubles as an audit trail: a
//! refresh token that isn't current but *is* somewhere in the chain was
//! definitely issued to this session and has definitely been superseded.
//!
//! ```text
//!   gen 0          gen 1          gen 2  ← current
//! (R0, A0) ───→ (R1, A1) ───→ (R2, A2)
//! ```

use rotor_token::{Token, TokenKind};

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// One refresh/access pair, minted together.
///
/// Immutable once built. `sequence` is the generation's position in its
/// chain: `0` for the pair issued at session creation, `n + 1` for the pair
/// minted by the `n`-th rotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation<T: Token> {
    sequence: u64,
    refresh: T,
    auth: T,
}

impl<T: Token> Generation<T> {
    /// Position of this generation in its chain.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// The refresh token of this pair.
    pub fn refresh(&self) -> &T {
        &self.refresh
    }

    /// The access token of this pair.
    pub fn auth(&self) -> &T {
        &self.auth
    }

    /// The token of the given kind.
    pub fn token(&self, kind: TokenKind) -> &T {
        match kind {
            TokenKind::Refresh => &self.refresh,
            TokenKind::Auth => &self.auth,
        }
    }

    /// Consumes the generation, returning `(refresh, auth)`.
    pub fn into_pair(self) -> (T, T) {
        (self.refresh, self.auth)
    }
}

// ---------------------------------------------------------------------------
// SessionChain
// ---------------------------------------------------------------------------

/// The ordered generations of one session.
///
/// A chain is never empty: it's born holding generation 0, and only grows.
/// That makes [`SessionChain::current`] infallible.
///
/// Backed by a `Vec`, so appending is O(1) amortized and the current
/// generation is just the last element. Sequence numbers equal indices.
#[derive(Debug, Clone)]
pub struct SessionChain<T: Token> {
    generations: Vec<Generation<T>>,
}

impl<T: Token> SessionChain<T> {
    /// Creates a chain holding only generation 0.
    pub fn new(refresh: T, auth: T) -> Self {
        Self {
            generations: vec![Generation {
                sequence: 0,
                refresh,
                auth,
            }],
        }
    }

    /// Appends a new generation and returns it. It becomes the current one.
    pub fn append(&mut self, refresh: T, auth: T) -> &Generation<T> {
        let sequence = self.generations.len() as u64;
        self.generations.push(Generation {
            sequence,
            refresh,
            auth,
        });
        self.current()
    }

    /// The most recently appended generation.
    pub fn current(&self) -> &Generation<T> {
        // Non-empty by construction: `new` seeds generation 0 and nothing
        // ever removes one.
        &self.generations[self.generations.len() - 1]
    }

    /// Returns `true` if `token` is the current generation's token of the
    /// given kind.
    pub fn is_current(&self, token: &T, kind: TokenKind) -> bool {
        self.current().token(kind) == token
    }

    /// Finds the first generation (oldest first) whose token of the given
    /// kind equals `token`.
    pub fn search(&self, token: &T, kind: TokenKind) -> Option<&Generation<T>> {
        self.generations.iter().find(|g| g.token(kind) == token)
    }

    /// Number of generations, including the current one.
    pub fn len(&self) -> usize {
        self.generations.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.generations.is_empty()
    }

    /// Iterates over all generations, oldest first.
    pub fn generations(&self) -> impl Iterator<Item = &Generation<T>> {
        self.generations.iter()
    }
}

#[cfg(test)]
mod tests {
    use rotor_token::{OpaqueToken, SessionId};

    use super::*;

    fn refresh() -> OpaqueToken {
        OpaqueToken::random(SessionId(1), TokenKind::Refresh, None)
    }

    fn auth() -> OpaqueToken {
        OpaqueToken::random(SessionId(1), TokenKind::Auth, None)
    }

    #[test]
    fn test_new_chain_has_generation_zero_as_current() {
        let (r0, a0) = (refresh(), auth());
        let chain = SessionChain::new(r0.clone(), a0.clone());

        assert_eq!(chain.len(), 1);
        assert!(!chain.is_empty());
        assert_eq!(chain.current().sequence(), 0);
        assert_eq!(chain.current().refresh(), &r0);
        assert_eq!(chain.current().auth(), &a0);
    }

    #[test]
    fn test_append_advances_current_and_sequence() {
        let mut chain = SessionChain::new(refresh(), auth());
        let (r1, a1) = (refresh(), auth());

        let appended = chain.append(r1.clone(), a1.clone()).clone();

        assert_eq!(appended.sequence(), 1);
        assert_eq!(chain.current(), &appended);
        assert_eq!(chain.len(), 2);
        assert!(chain.is_current(&r1, TokenKind::Refresh));
        assert!(chain.is_current(&a1, TokenKind::Auth));
    }

    #[test]
    fn test_generation_token_and_into_pair_agree() {
        let (r0, a0) = (refresh(), auth());
        let gen0 = SessionChain::new(r0.clone(), a0.clone()).current().clone();

        assert_eq!(gen0.token(TokenKind::Refresh), &r0);
        assert_eq!(gen0.token(TokenKind::Auth), &a0);
        assert_eq!(gen0.into_pair(), (r0, a0));
    }

    #[test]
    fn test_is_current_false_for_superseded_tokens() {
        let (r0, a0) = (refresh(), auth());
        let mut chain = SessionChain::new(r0.clone(), a0.clone());
        chain.append(refresh(), auth());

        assert!(!chain.is_current(&r0, TokenKind::Refresh));
        assert!(!chain.is_current(&a0, TokenKind::Auth));
    }

    #[test]
    fn test_is_current_respects_kind() {
        // The current auth token must not match the refresh slot.
        let a0 = auth();
        let chain = SessionChain::new(refresh(), a0.clone());

        assert!(!chain.is_current(&a0, TokenKind::Refresh));
    }

    #[test]
    fn test_search_finds_old_generations() {
        let r0 = refresh();
        let mut chain = SessionChain::new(r0.clone(), auth());
        chain.append(refresh(), auth());
        chain.append(refresh(), auth());

        let found = chain.search(&r0, TokenKind::Refresh).expect("gen 0 kept");
        assert_eq!(found.sequence(), 0);
    }

    #[test]
    fn test_search_unknown_token_returns_none() {
        let mut chain = SessionChain::new(refresh(), auth());
        chain.append(refresh(), auth());

        assert!(chain.search(&refresh(), TokenKind::Refresh).is_none());
    }

    #[test]
    fn test_search_wrong_kind_returns_none() {
        let a0 = auth();
        let chain = SessionChain::new(refresh(), a0.clone());

        assert!(chain.search(&a0, TokenKind::Refresh).is_none());
        assert!(chain.search(&a0, TokenKind::Auth).is_some());
    }

    #[test]
    fn test_long_chain_keeps_order() {
        let mut chain = SessionChain::new(refresh(), auth());
        for _ in 0..10_000 {
            chain.append(refresh(), auth());
        }

        assert_eq!(chain.len(), 10_001);
        assert_eq!(chain.current().sequence(), 10_000);
        let sequences: Vec<u64> = chain.generations().map(|g| g.sequence()).collect();
        assert!(sequences.windows(2).all(|w| w[1] == w[0] + 1));
    }
}
