//! Integration tests for the ledger under concurrent access.
//!
//! These run on the multi-threaded runtime so that racing tasks really do
//! run in parallel. A `Barrier` lines tasks up before the contended call.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rotor_ledger::{LedgerConfig, LedgerError, TokenLedger};
use rotor_token::{
    OpaqueToken, OpaqueTokenProvider, SessionId, Token, TokenError, TokenKind, TokenProvider,
};
use tokio::sync::{Barrier, Notify};

// =========================================================================
// Helpers
// =========================================================================

fn shared_ledger(revoke_on_reuse: bool) -> Arc<TokenLedger<OpaqueTokenProvider>> {
    Arc::new(TokenLedger::new(
        OpaqueTokenProvider::default(),
        LedgerConfig {
            revoke_on_reuse,
            ..LedgerConfig::default()
        },
    ))
}

/// Parks every refresh-token mint until the test calls `release`, so a
/// `create_session` can be held mid-flight. Optionally fails once released.
#[derive(Default)]
struct GatedProvider {
    inner: OpaqueTokenProvider,
    minting: Notify,
    released: Notify,
    minting_for: Mutex<Option<SessionId>>,
    fail: AtomicBool,
}

impl GatedProvider {
    /// Waits until a mint is parked, returning the session it is for.
    async fn wait_for_mint(&self) -> SessionId {
        self.minting.notified().await;
        let minting_for = *self.minting_for.lock().unwrap();
        minting_for.expect("session recorded before notifying")
    }

    fn release(&self) {
        self.released.notify_one();
    }
}

impl TokenProvider for GatedProvider {
    type Token = OpaqueToken;

    async fn generate_auth_token(&self, s: SessionId) -> Result<OpaqueToken, TokenError> {
        self.inner.generate_auth_token(s).await
    }

    async fn generate_refresh_token(&self, s: SessionId) -> Result<OpaqueToken, TokenError> {
        *self.minting_for.lock().unwrap() = Some(s);
        self.minting.notify_one();
        self.released.notified().await;
        if self.fail.load(Ordering::SeqCst) {
            return Err(TokenError::Generation("signer offline".into()));
        }
        self.inner.generate_refresh_token(s).await
    }

    async fn is_auth_valid(&self, t: &OpaqueToken) -> Result<bool, TokenError> {
        self.inner.is_auth_valid(t).await
    }

    async fn is_refresh_valid(&self, t: &OpaqueToken) -> Result<bool, TokenError> {
        self.inner.is_refresh_valid(t).await
    }
}

fn gated_ledger(fail: bool) -> Arc<TokenLedger<GatedProvider>> {
    let provider = GatedProvider {
        fail: AtomicBool::new(fail),
        ..GatedProvider::default()
    };
    Arc::new(TokenLedger::new(provider, LedgerConfig::default()))
}

/// Spawns readers that all look at `id` at once and asserts none of them
/// can see it.
async fn assert_readers_cannot_see(ledger: &Arc<TokenLedger<GatedProvider>>, id: SessionId) {
    let barrier = Arc::new(Barrier::new(8));
    let mut readers = Vec::new();
    for _ in 0..8 {
        let ledger = Arc::clone(ledger);
        let barrier = Arc::clone(&barrier);
        readers.push(tokio::spawn(async move {
            barrier.wait().await;
            (
                ledger.contains(id).await,
                ledger.len().await,
                ledger.current(id).await,
                ledger.generation_count(id).await,
            )
        }));
    }

    for reader in readers {
        let (contains, len, current, count) = reader.await.expect("reader panicked");
        assert!(!contains, "a session being created must not be live");
        assert_eq!(len, 0);
        assert_eq!(current, Err(LedgerError::SessionNotFound(id)));
        assert_eq!(count, Err(LedgerError::SessionNotFound(id)));
    }
}

// =========================================================================
// Rotation races
// =========================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_rotate_same_token_exactly_one_wins() {
    for _ in 0..50 {
        let ledger = shared_ledger(false);
        let (id, gen0) = ledger.create_session().await.unwrap();
        let barrier = Arc::new(Barrier::new(2));

        let mut tasks = Vec::new();
        for _ in 0..2 {
            let ledger = Arc::clone(&ledger);
            let barrier = Arc::clone(&barrier);
            let refresh = gen0.refresh().clone();
            tasks.push(tokio::spawn(async move {
                barrier.wait().await;
                ledger.rotate(id, &refresh).await
            }));
        }

        let mut successes = 0;
        for task in tasks {
            match task.await.expect("task panicked") {
                Ok(_) => successes += 1,
                Err(LedgerError::TokenReuseDetected(_) | LedgerError::InvalidRefreshToken(_)) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(successes, 1, "exactly one rotation may win");
        assert_eq!(
            ledger.generation_count(id).await.unwrap(),
            2,
            "chain must gain exactly one generation"
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_rotate_loser_revokes_session_by_default() {
    let ledger = shared_ledger(true);
    let (id, gen0) = ledger.create_session().await.unwrap();
    let barrier = Arc::new(Barrier::new(2));

    let mut tasks = Vec::new();
    for _ in 0..2 {
        let ledger = Arc::clone(&ledger);
        let barrier = Arc::clone(&barrier);
        let refresh = gen0.refresh().clone();
        tasks.push(tokio::spawn(async move {
            barrier.wait().await;
            ledger.rotate(id, &refresh).await
        }));
    }

    let mut results = Vec::new();
    for task in tasks {
        results.push(task.await.unwrap());
    }

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(LedgerError::TokenReuseDetected(_)))),
        "the loser replays a superseded token"
    );
    assert!(!ledger.contains(id).await, "reuse revokes the session");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_rotate_chain_of_clients() {
    // Many tasks each try to rotate whatever they believe is current.
    // Every success must extend the chain by one; no generation is lost.
    let ledger = shared_ledger(false);
    let (id, _) = ledger.create_session().await.unwrap();

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let ledger = Arc::clone(&ledger);
        tasks.push(tokio::spawn(async move {
            let mut wins = 0usize;
            for _ in 0..25 {
                let current = ledger.current(id).await.unwrap();
                if ledger.rotate(id, current.refresh()).await.is_ok() {
                    wins += 1;
                }
            }
            wins
        }));
    }

    let mut total_wins = 0;
    for task in tasks {
        total_wins += task.await.unwrap();
    }

    assert!(total_wins >= 1);
    assert_eq!(ledger.generation_count(id).await.unwrap(), total_wins + 1);
}

// =========================================================================
// Reads during rotation / invalidation
// =========================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_always_see_a_complete_current_generation() {
    let ledger = shared_ledger(false);
    let (id, gen0) = ledger.create_session().await.unwrap();

    let writer = {
        let ledger = Arc::clone(&ledger);
        tokio::spawn(async move {
            let mut current = gen0;
            for _ in 0..200 {
                current = ledger.rotate(id, current.refresh()).await.unwrap();
            }
        })
    };

    let reader = {
        let ledger = Arc::clone(&ledger);
        tokio::spawn(async move {
            for _ in 0..200 {
                let current = ledger.current(id).await.unwrap();
                // The auth token a reader saw was minted with that refresh token.
                let found = ledger
                    .find_any(id, current.auth(), TokenKind::Auth)
                    .await
                    .unwrap()
                    .expect("a current token is always in the chain");
                assert_eq!(found.refresh(), current.refresh());
                assert_eq!(found.sequence(), current.sequence());
                assert_eq!(current.refresh().session_id(), Some(id));
                assert_eq!(current.auth().session_id(), Some(id));
            }
        })
    };

    writer.await.unwrap();
    reader.await.unwrap();
    assert_eq!(ledger.generation_count(id).await.unwrap(), 201);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rotate_racing_invalidate_never_resurrects_session() {
    for _ in 0..50 {
        let ledger = shared_ledger(false);
        let (id, gen0) = ledger.create_session().await.unwrap();
        let barrier = Arc::new(Barrier::new(2));

        let rotate = {
            let ledger = Arc::clone(&ledger);
            let barrier = Arc::clone(&barrier);
            let refresh = gen0.refresh().clone();
            tokio::spawn(async move {
                barrier.wait().await;
                ledger.rotate(id, &refresh).await
            })
        };
        let invalidate = {
            let ledger = Arc::clone(&ledger);
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                ledger.invalidate_session(id).await
            })
        };

        let rotated = rotate.await.unwrap();
        invalidate.await.unwrap().expect("invalidate always finds the session");

        assert!(
            matches!(rotated, Ok(_) | Err(LedgerError::SessionNotFound(_))),
            "unexpected rotate result: {rotated:?}"
        );
        assert!(!ledger.contains(id).await);
        assert_eq!(
            ledger.generation_count(id).await,
            Err(LedgerError::SessionNotFound(id))
        );
    }
}

// =========================================================================
// Reads during creation
// =========================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_racing_creation_see_nothing_until_published() {
    let ledger = gated_ledger(false);
    let creator = {
        let ledger = Arc::clone(&ledger);
        tokio::spawn(async move { ledger.create_session().await })
    };

    let id = ledger.provider().wait_for_mint().await;
    assert_readers_cannot_see(&ledger, id).await;

    ledger.provider().release();
    let (created, gen0) = creator
        .await
        .expect("creator panicked")
        .expect("should create");

    assert_eq!(created, id);
    assert!(ledger.contains(id).await);
    assert_eq!(ledger.len().await, 1);
    assert_eq!(ledger.current(id).await.unwrap(), gen0);
    assert_eq!(gen0.sequence(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failed_creation_is_never_visible() {
    let ledger = gated_ledger(true);
    let creator = {
        let ledger = Arc::clone(&ledger);
        tokio::spawn(async move { ledger.create_session().await })
    };

    let id = ledger.provider().wait_for_mint().await;
    assert_readers_cannot_see(&ledger, id).await;

    ledger.provider().release();
    let result = creator.await.expect("creator panicked");

    assert!(
        matches!(result, Err(LedgerError::Token(TokenError::Generation(_)))),
        "mint failure should propagate, got {result:?}"
    );
    assert!(ledger.is_empty().await);
    assert_readers_cannot_see(&ledger, id).await;
}

// =========================================================================
// Allocation
// =========================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_create_session_100k_ids_are_distinct() {
    let ledger = shared_ledger(true);
    let mut ids = HashSet::with_capacity(100_000);

    for _ in 0..100_000 {
        let (id, _) = ledger.create_session().await.unwrap();
        assert!(ids.insert(id), "duplicate session id {id}");
    }

    assert_eq!(ledger.len().await, 100_000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_create_session_ids_are_distinct() {
    let ledger = shared_ledger(true);

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let ledger = Arc::clone(&ledger);
        tasks.push(tokio::spawn(async move {
            let mut ids = Vec::with_capacity(1_000);
            for _ in 0..1_000 {
                ids.push(ledger.create_session().await.unwrap().0);
            }
            ids
        }));
    }

    let mut all = HashSet::new();
    for task in tasks {
        for id in task.await.unwrap() {
            assert!(all.insert(id), "duplicate session id {id}");
        }
    }

    assert_eq!(all.len(), 8_000);
    assert_eq!(ledger.len().await, 8_000);
}
