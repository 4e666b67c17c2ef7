//! The token ledger: every live session and its chain of generations.
//!
//! # Concurrency
//!
//! The ledger is shared by every request-handling task, so it is safe to
//! call through `&self` from many tasks at once. Two levels of locking:
//!
//! - A ledger-wide `RwLock` over the `SessionId → slot` map. It guards
//!   structural changes (insert on create, remove on invalidate) and is
//!   never held across a call into the [`TokenProvider`].
//! - A per-session `Mutex` around each slot. `rotate` holds it for the whole
//!   validate → compare → mint → append sequence, so two rotations racing
//!   with the same refresh token can't both win.
//!
//! Nothing ever waits for a slot lock while holding the map lock, which
//! rules out lock-order deadlocks.
//!
//! A session being created is not in the map at all. Its ID sits in a
//! reservation set while generation 0 is minted, and only a fully built
//! chain is ever published.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as SyncMutex, MutexGuard, PoisonError};

use rotor_token::{SESSION_ID_CLAIM, SessionId, Token, TokenKind, TokenProvider};
use tokio::sync::{Mutex, RwLock};

use crate::{Generation, LedgerConfig, LedgerError, SessionChain, SessionIdAllocator};

/// What a session entry holds at any moment.
///
/// `Revoked` is left behind for tasks that grabbed the slot handle just
/// before the entry was removed.
enum Slot<T: Token> {
    Active(SessionChain<T>),
    Revoked,
}

impl<T: Token> Slot<T> {
    fn chain(&self, id: SessionId) -> Result<&SessionChain<T>, LedgerError> {
        match self {
            Self::Active(chain) => Ok(chain),
            Self::Revoked => Err(LedgerError::SessionNotFound(id)),
        }
    }

    fn chain_mut(&mut self, id: SessionId) -> Result<&mut SessionChain<T>, LedgerError> {
        match self {
            Self::Active(chain) => Ok(chain),
            Self::Revoked => Err(LedgerError::SessionNotFound(id)),
        }
    }
}

/// A shared, lockable slot.
///
/// `Arc` lets the map and any in-flight call each hold the same slot: it is
/// a reference-counted pointer, freed when the last clone goes away. The
/// `Mutex` is Tokio's, because `rotate` keeps it locked across `.await`s on
/// the provider, which a `std` mutex guard must never be.
type SlotHandle<T> = Arc<Mutex<Slot<T>>>;

/// An allocated session ID that hasn't been published yet.
///
/// This is an RAII guard: "Resource Acquisition Is Initialization". Holding
/// the value means holding the reservation, and Rust runs `Drop` however the
/// value goes away: an early `return`, a `?`, or the whole `create_session`
/// future being dropped mid-mint because the caller gave up on it. That
/// last case is why the release lives here and not in an error branch.
struct Reservation<'a> {
    reserved: &'a SyncMutex<HashSet<SessionId>>,
    session_id: SessionId,
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        lock_reserved(self.reserved).remove(&self.session_id);
    }
}

/// Tracks every active session's credential chain.
///
/// ## Lifecycle of one session
///
/// ```text
///   absent ──create_session()──→ reserved ──gen 0 minted──→ active[gen 0]
///                                   │                          │
///                         mint fails or caller gives up        │ rotate()
///                                   ▼                          ▼
///                                 absent                 active[gen n+1] ──rotate()──→ …
///                                                              │
///                                 invalidate_session() or      │
///                                 reuse of an old refresh      │
///                                 token (revoke_on_reuse)      ▼
///                                                            absent
/// ```
///
/// Only `active` sessions are visible: [`TokenLedger::contains`],
/// [`TokenLedger::len`], and every lookup ignore reserved IDs.
pub struct TokenLedger<P: TokenProvider> {
    provider: P,

    /// Live sessions. Every handle in here is `Active` until the moment it
    /// is removed.
    sessions: RwLock<HashMap<SessionId, SlotHandle<P::Token>>>,

    /// IDs handed out to `create_session` calls still minting generation 0.
    ///
    /// A plain `std` mutex is enough: it is only held for a set lookup or
    /// insert, never across an `.await`, and `Drop` (which can't be async)
    /// needs to take it.
    reserved: SyncMutex<HashSet<SessionId>>,

    allocator: SessionIdAllocator,

    config: LedgerConfig,
}

impl<P: TokenProvider> TokenLedger<P> {
    /// Creates an empty ledger that mints and validates through `provider`.
    pub fn new(provider: P, config: LedgerConfig) -> Self {
        Self {
            provider,
            sessions: RwLock::new(HashMap::new()),
            reserved: SyncMutex::new(HashSet::new()),
            allocator: SessionIdAllocator::new(config.max_allocation_attempts),
            config,
        }
    }

    /// Starts a new session with a fresh ID and an initial token pair.
    ///
    /// The session becomes visible to other callers only once generation 0
    /// is stored. Until then its ID is reserved (no other creation can draw
    /// it) but every lookup reports [`LedgerError::SessionNotFound`].
    ///
    /// # Errors
    /// - [`LedgerError::AllocationExhausted`]: no free ID found
    /// - [`LedgerError::Token`]: the provider failed to mint; the ID is
    ///   released and nothing is stored
    pub async fn create_session(
        &self,
    ) -> Result<(SessionId, Generation<P::Token>), LedgerError> {
        let reservation = self.reserve_id().await?;
        let session_id = reservation.session_id;

        // `reservation` is dropped on this early return, freeing the ID.
        let (refresh, auth) = match self.mint_pair(session_id).await {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(%session_id, error = %e, "session creation failed");
                return Err(e);
            }
        };

        let chain = SessionChain::new(refresh, auth);
        let generation = chain.current().clone();
        {
            let mut sessions = self.sessions.write().await;
            sessions.insert(session_id, Arc::new(Mutex::new(Slot::Active(chain))));
            // Released under the write lock: the ID is never both free and
            // unpublished.
            drop(reservation);
        }

        tracing::info!(%session_id, "session created");
        Ok((session_id, generation))
    }

    /// Exchanges the current refresh token for a new generation.
    ///
    /// # Errors
    /// - [`LedgerError::SessionNotFound`]: unknown or invalidated session
    /// - [`LedgerError::Token`]: the provider rejected `presented` (e.g.
    ///   expired) or failed to mint the new pair
    /// - [`LedgerError::TokenReuseDetected`]: `presented` belongs to a
    ///   superseded generation; with `revoke_on_reuse` the session is gone
    ///   afterwards
    /// - [`LedgerError::InvalidRefreshToken`]: `presented` was never issued
    ///   to this session, or the provider says it isn't a refresh token
    ///
    /// On every error path the chain is left exactly as it was (or, for
    /// reuse with revocation, removed as a whole).
    pub async fn rotate(
        &self,
        session_id: SessionId,
        presented: &P::Token,
    ) -> Result<Generation<P::Token>, LedgerError> {
        let slot = self.slot(session_id).await?;
        let mut guard = slot.lock().await;
        let chain = guard.chain_mut(session_id)?;

        if !self.provider.is_refresh_valid(presented).await? {
            tracing::debug!(%session_id, "provider rejected refresh token");
            return Err(LedgerError::InvalidRefreshToken(session_id));
        }

        if !chain.is_current(presented, TokenKind::Refresh) {
            let stale = chain
                .search(presented, TokenKind::Refresh)
                .map(Generation::sequence);
            let current = chain.current().sequence();

            // `let ... else` binds on a match and must diverge otherwise.
            let Some(stale) = stale else {
                tracing::debug!(%session_id, "refresh token not issued to this session");
                return Err(LedgerError::InvalidRefreshToken(session_id));
            };

            tracing::warn!(
                %session_id,
                presented_generation = stale,
                current_generation = current,
                "refresh token reuse detected"
            );
            if self.config.revoke_on_reuse {
                // Unpublish first, then poison the slot, both under the slot
                // lock: no caller sees a live entry for a revoked chain.
                self.remove_entry(session_id, &slot).await;
                *guard = Slot::Revoked;
                tracing::warn!(%session_id, "session revoked after refresh token reuse");
            }
            return Err(LedgerError::TokenReuseDetected(session_id));
        }

        let (refresh, auth) = self.mint_pair(session_id).await?;
        let generation = chain.append(refresh, auth).clone();
        tracing::info!(%session_id, generation = generation.sequence(), "session rotated");
        Ok(generation)
    }

    /// Returns `true` if `token` is the current generation's token of the
    /// given kind.
    ///
    /// # Errors
    /// [`LedgerError::SessionNotFound`] for an unknown session.
    pub async fn is_current(
        &self,
        session_id: SessionId,
        token: &P::Token,
        kind: TokenKind,
    ) -> Result<bool, LedgerError> {
        let slot = self.slot(session_id).await?;
        let guard = slot.lock().await;
        Ok(guard.chain(session_id)?.is_current(token, kind))
    }

    /// Like [`TokenLedger::is_current`], reading the session ID from the
    /// token's `id` claim.
    pub async fn is_current_by_claim(
        &self,
        token: &P::Token,
        kind: TokenKind,
    ) -> Result<bool, LedgerError> {
        let session_id = claimed_session(token)?;
        self.is_current(session_id, token, kind).await
    }

    /// Finds the generation whose token of the given kind is `token`,
    /// current or not.
    ///
    /// Answers "was this ever issued to this session?", which is what a
    /// caller needs to tell a stale credential from a forged one.
    pub async fn find_any(
        &self,
        session_id: SessionId,
        token: &P::Token,
        kind: TokenKind,
    ) -> Result<Option<Generation<P::Token>>, LedgerError> {
        let slot = self.slot(session_id).await?;
        let guard = slot.lock().await;
        Ok(guard.chain(session_id)?.search(token, kind).cloned())
    }

    /// Full check for a presented credential: the provider must accept it
    /// and it must be the session's current token of that kind.
    ///
    /// # Errors
    /// - [`LedgerError::SessionNotFound`]: unknown session
    /// - [`LedgerError::Token`]: provider error, e.g. expiry
    pub async fn validate(
        &self,
        session_id: SessionId,
        token: &P::Token,
        kind: TokenKind,
    ) -> Result<bool, LedgerError> {
        let slot = self.slot(session_id).await?;

        let intrinsically_valid = match kind {
            TokenKind::Refresh => self.provider.is_refresh_valid(token).await?,
            TokenKind::Auth => self.provider.is_auth_valid(token).await?,
        };
        if !intrinsically_valid {
            return Ok(false);
        }

        let guard = slot.lock().await;
        Ok(guard.chain(session_id)?.is_current(token, kind))
    }

    /// The session's current generation.
    pub async fn current(
        &self,
        session_id: SessionId,
    ) -> Result<Generation<P::Token>, LedgerError> {
        let slot = self.slot(session_id).await?;
        let guard = slot.lock().await;
        Ok(guard.chain(session_id)?.current().clone())
    }

    /// Number of generations issued to the session so far.
    pub async fn generation_count(&self, session_id: SessionId) -> Result<usize, LedgerError> {
        let slot = self.slot(session_id).await?;
        let guard = slot.lock().await;
        Ok(guard.chain(session_id)?.len())
    }

    /// Removes the session and its whole chain.
    ///
    /// # Errors
    /// [`LedgerError::SessionNotFound`] if it was already gone.
    pub async fn invalidate_session(&self, session_id: SessionId) -> Result<(), LedgerError> {
        let slot = self
            .sessions
            .write()
            .await
            .remove(&session_id)
            .ok_or(LedgerError::SessionNotFound(session_id))?;

        // Tasks that cloned the handle before the removal must see it dead.
        *slot.lock().await = Slot::Revoked;

        tracing::info!(%session_id, "session invalidated");
        Ok(())
    }

    /// Like [`TokenLedger::invalidate_session`], reading the session ID from
    /// the token's `id` claim.
    pub async fn invalidate_by_claim(&self, token: &P::Token) -> Result<(), LedgerError> {
        let session_id = claimed_session(token)?;
        self.invalidate_session(session_id).await
    }

    /// Returns `true` if the session is live.
    pub async fn contains(&self, session_id: SessionId) -> bool {
        self.sessions.read().await.contains_key(&session_id)
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns `true` if there are no live sessions.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// The provider this ledger mints through.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// The configuration this ledger was built with.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // -- internals --------------------------------------------------------

    /// Draws an ID that is neither live nor reserved, and reserves it.
    async fn reserve_id(&self) -> Result<Reservation<'_>, LedgerError> {
        // Publishing happens under the write lock, so a read lock is enough
        // to keep the live key set still while we draw.
        let sessions = self.sessions.read().await;
        let mut reserved = lock_reserved(&self.reserved);
        let session_id = self
            .allocator
            .next(|candidate| sessions.contains_key(&candidate) || reserved.contains(&candidate))?;
        reserved.insert(session_id);

        Ok(Reservation {
            reserved: &self.reserved,
            session_id,
        })
    }

    async fn slot(&self, session_id: SessionId) -> Result<SlotHandle<P::Token>, LedgerError> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .cloned()
            .ok_or(LedgerError::SessionNotFound(session_id))
    }

    /// Removes `session_id` only if it still maps to `slot`.
    async fn remove_entry(&self, session_id: SessionId, slot: &SlotHandle<P::Token>) {
        let mut sessions = self.sessions.write().await;
        if sessions
            .get(&session_id)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
        {
            sessions.remove(&session_id);
        }
    }

    async fn mint_pair(
        &self,
        session_id: SessionId,
    ) -> Result<(P::Token, P::Token), LedgerError> {
        let refresh = self.provider.generate_refresh_token(session_id).await?;
        let auth = self.provider.generate_auth_token(session_id).await?;
        Ok((refresh, auth))
    }
}

/// Locks the reservation set.
///
/// A poisoned lock only means another thread panicked mid-insert or
/// mid-remove on a `HashSet`, which leaves the set itself intact, so we
/// keep using it instead of propagating the panic.
fn lock_reserved(reserved: &SyncMutex<HashSet<SessionId>>) -> MutexGuard<'_, HashSet<SessionId>> {
    reserved.lock().unwrap_or_else(PoisonError::into_inner)
}

fn claimed_session<T: Token>(token: &T) -> Result<SessionId, LedgerError> {
    let raw = token.claim(SESSION_ID_CLAIM).ok_or_else(|| {
        LedgerError::InvalidClaim(format!("token has no `{SESSION_ID_CLAIM}` claim"))
    })?;
    SessionId::from_claim(raw)
        .ok_or_else(|| LedgerError::InvalidClaim(format!("malformed session id {raw:?}")))
}

// =========================================================================
// Tests
// =========================================================================
