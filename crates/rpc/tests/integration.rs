//! Integration tests for the claim CLI
//!
//! Each participant gets its own context over a shared data directory, the
//! way separate `claim` invocations would.

use chrono::{Duration, Utc};
use claim_core::{Keypair, RecordKey};
use claim_engine::{ClaimError, InvoiceStatus};
use claim_rpc::{commands, AppConfig, AppContext};
use rust_decimal::Decimal;
use std::path::Path;
use tempfile::TempDir;

async fn context(data: &Path, keypair: &Keypair) -> AppContext {
    let keypair = Keypair::from_seed_hex(&keypair.seed_hex()).unwrap();
    AppContext::new(data, AppConfig::default(), Some(keypair)).await.unwrap()
}

fn tokens(value: i64) -> Decimal {
    Decimal::new(value, 0)
}

/// Test: org → vendor → submit → oracle → sample → pay → settle → close
#[tokio::test]
async fn test_full_workflow() {
    let temp_dir = TempDir::new().unwrap();
    let data = temp_dir.path();

    let authority = Keypair::generate();
    let oracle = Keypair::generate();
    let requester = Keypair::generate();
    let vendor_payout = Keypair::generate().identity();

    let admin = context(data, &authority).await;
    let org = commands::org_init(&admin, tokens(1_000), tokens(10_000), 0, Some(oracle.identity()))
        .await
        .unwrap();
    assert_eq!(org, RecordKey::org(&authority.identity()));
    commands::vendor_register(&admin, "Acme", vendor_payout).await.unwrap();

    let user = context(data, &requester).await;
    commands::submit(&user, authority.identity(), "QmInvoice1", None)
        .await
        .unwrap();

    let manifest = data.join("manifest.json");
    std::fs::write(
        &manifest,
        r#"{ "QmInvoice1": { "vendor_name": "Acme", "amount": 100000000, "due_date": "2099-01-01T00:00:00Z" } }"#,
    )
    .unwrap();

    let worker = context(data, &oracle).await;
    assert_eq!(commands::oracle_run(&worker, &manifest, true).await.unwrap(), 1);
    assert!(commands::requests(&worker, None).await.unwrap().is_empty());

    let invoice = commands::show(&user, authority.identity(), None).await.unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Validated);
    assert_eq!(invoice.amount.to_string(), "100.000000");

    commands::sample(&user, authority.identity(), 7).await.unwrap();
    assert_eq!(commands::vrf_fulfill(&worker).await.unwrap(), 1);
    // 0 bps never selects
    let invoice = commands::show(&user, authority.identity(), None).await.unwrap();
    assert_eq!(invoice.status, InvoiceStatus::ReadyForPayment);

    let escrowed = commands::pay(&user, authority.identity()).await.unwrap();
    assert_eq!(escrowed.status, InvoiceStatus::InEscrow);

    let settlement = commands::settle(&user, authority.identity()).await.unwrap();
    assert_eq!(settlement.payout_identity, vendor_payout);
    assert_eq!(settlement.amount.to_string(), "100.000000");

    let log = std::fs::read_to_string(data.join("payouts.jsonl")).unwrap();
    assert_eq!(log.lines().count(), 1);

    let vendors = commands::vendors(&admin, None).await.unwrap();
    assert_eq!(vendors[0].total_paid.to_string(), "100.000000");
    let config = commands::org_show(&admin, None).await.unwrap();
    assert_eq!(config.daily_spent.to_string(), "100.000000");

    let closed = commands::close_invoice(&user, authority.identity()).await.unwrap();
    assert!(closed.allocation > 0);
    commands::close_request(&user, authority.identity()).await.unwrap();

    let history = commands::history(&admin, 100).await.unwrap();
    assert_eq!(history.first().unwrap().event_type(), "org_initialized");
    assert_eq!(history.last().unwrap().event_type(), "record_closed");
}

/// Test: a sampled invoice is blocked until the audit is decided
#[tokio::test]
async fn test_audit_rejection_blocks_payment() {
    let temp_dir = TempDir::new().unwrap();
    let data = temp_dir.path();

    let authority = Keypair::generate();
    let requester = Keypair::generate();

    let admin = context(data, &authority).await;
    commands::org_init(&admin, tokens(1_000), tokens(10_000), 10_000, None)
        .await
        .unwrap();
    commands::vendor_register(&admin, "Acme", Keypair::generate().identity())
        .await
        .unwrap();

    let user = context(data, &requester).await;
    commands::submit(&user, authority.identity(), "QmInvoice2", Some(tokens(50)))
        .await
        .unwrap();

    // The authority doubles as oracle signer when none is configured
    commands::fulfill(
        &admin,
        authority.identity(),
        requester.identity(),
        "Acme",
        tokens(50),
        Utc::now() + Duration::days(30),
        None,
    )
    .await
    .unwrap();

    commands::sample(&user, authority.identity(), 0).await.unwrap();
    commands::vrf_fulfill(&admin).await.unwrap();
    let invoice = commands::show(&admin, authority.identity(), Some(requester.identity()))
        .await
        .unwrap();
    assert_eq!(invoice.status, InvoiceStatus::AuditPending);

    let err = commands::pay(&user, authority.identity()).await.unwrap_err();
    assert!(matches!(err.downcast_ref::<ClaimError>(), Some(ClaimError::InvalidState(_))));

    let status = commands::audit(&admin, authority.identity(), requester.identity(), false)
        .await
        .unwrap();
    assert_eq!(status, InvoiceStatus::AuditRejected);
    assert!(commands::pay(&user, authority.identity()).await.is_err());
}

/// Test: paused org rejects new work until resumed
#[tokio::test]
async fn test_pause_and_resume() {
    let temp_dir = TempDir::new().unwrap();
    let data = temp_dir.path();

    let authority = Keypair::generate();
    let requester = Keypair::generate();

    let admin = context(data, &authority).await;
    commands::org_init(&admin, tokens(10), tokens(100), 500, None)
        .await
        .unwrap();

    let config = commands::org_update(&admin, None, None, None, Some(true), None)
        .await
        .unwrap();
    assert!(config.paused);

    let user = context(data, &requester).await;
    let err = commands::submit(&user, authority.identity(), "QmPaused", None)
        .await
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<ClaimError>(), Some(ClaimError::OrgPaused)));

    commands::org_update(&admin, None, None, None, Some(false), None)
        .await
        .unwrap();
    commands::submit(&user, authority.identity(), "QmPaused", None)
        .await
        .unwrap();
}

/// Test: commands that act as the operator need a keypair
#[tokio::test]
async fn test_missing_keypair() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = AppContext::new(temp_dir.path(), AppConfig::default(), None)
        .await
        .unwrap();

    assert!(commands::org_init(&ctx, tokens(1), tokens(1), 0, None).await.is_err());
    assert!(commands::history(&ctx, 10).await.unwrap().is_empty());
}

#[test]
fn test_keygen_refuses_overwrite() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("keys").join("operator.key");

    let identity = commands::keygen(&path).unwrap();
    assert_eq!(Keypair::read_file(&path).unwrap().identity(), identity);
    assert!(commands::keygen(&path).is_err());
}
