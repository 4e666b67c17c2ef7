use std::sync::Arc;

use rotor::prelude::*;

// ---------------------------------------------------------------------------
// Walkthrough
// ---------------------------------------------------------------------------

/// One login, two refreshes, then an attacker replaying the first refresh
/// token. Run with `RUST_LOG=debug` to see the ledger's own logging.
async fn walkthrough(
    ledger: &TokenLedger<OpaqueTokenProvider>,
) -> Result<serde_json::Value, RotorError> {
    let (id, gen0) = ledger.create_session().await?;
    tracing::info!(%id, refresh = gen0.refresh().value(), "logged in");

    let gen1 = ledger.rotate(id, gen0.refresh()).await?;
    let gen2 = ledger.rotate(id, gen1.refresh()).await?;
    tracing::info!(%id, generation = gen2.sequence(), "client refreshed twice");

    let stale_auth_current = ledger.is_current(id, gen0.auth(), TokenKind::Auth).await?;
    let issued_before = ledger
        .find_any(id, gen0.auth(), TokenKind::Auth)
        .await?
        .map(|g| g.sequence());

    let replay = match ledger.rotate(id, gen0.refresh()).await {
        Ok(_) => "accepted".to_string(),
        Err(e) => {
            let e = RotorError::from(e);
            if e.is_reuse() {
                tracing::warn!(%id, "replay blocked, session revoked");
            }
            e.to_string()
        }
    };

    let still_live = ledger.contains(id).await;

    Ok(serde_json::json!({
        "session": id.to_string(),
        "generations_issued": gen2.sequence() + 1,
        "gen0_auth_is_current": stale_auth_current,
        "gen0_auth_issued_in_generation": issued_before,
        "replay_of_gen0_refresh": replay,
        "session_live_after_replay": still_live,
    }))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    rotor::init_tracing("info");

    let ledger = Arc::new(TokenLedger::new(
        OpaqueTokenProvider::new(ProviderConfig::default()),
        LedgerConfig::default(),
    ));

    let summary = walkthrough(&ledger).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    // A burst of clients racing the same refresh token: only one wins.
    let (id, gen0) = ledger.create_session().await?;
    let mut tasks = Vec::new();
    for _ in 0..8 {
        let ledger = Arc::clone(&ledger);
        let refresh = gen0.refresh().clone();
        tasks.push(tokio::spawn(async move { ledger.rotate(id, &refresh).await.is_ok() }));
    }
    let mut winners = 0;
    for task in tasks {
        if task.await? {
            winners += 1;
        }
    }
    println!("{winners} of 8 racing refreshes succeeded");

    Ok(())
}
