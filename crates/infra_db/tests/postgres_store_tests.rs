//! PostgreSQL intent store tests
//!
//! Runs against a disposable PostgreSQL container (Docker required).

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use core_kernel::{BookingRef, Currency, Money};
use domain_payment::{
    InitiatePayment, IntentState, IntentStore, OrchestratorConfig, PaymentIntent, PaymentOrchestrator,
    ScriptedGateway, TransitionError,
};
use infra_db::{create_pool, DatabaseConfig, PostgresIntentStore};
use test_utils::database::shared_test_database;
use tokio::task::JoinSet;
use uuid::Uuid;

async fn store_with(max_connections: u32) -> PostgresIntentStore {
    let db = shared_test_database().await;
    let config = DatabaseConfig::new(db.connection_url())
        .max_connections(max_connections)
        .min_connections(0)
        .connect_timeout(Duration::from_secs(5));
    PostgresIntentStore::new(create_pool(config).await.unwrap())
}

async fn store() -> PostgresIntentStore {
    store_with(5).await
}

/// Unique per test so tests sharing the container do not collide
fn unique_booking() -> BookingRef {
    BookingRef::parse(format!("T-{}", Uuid::new_v4())).unwrap()
}

fn fresh(booking_ref: &BookingRef) -> PaymentIntent {
    PaymentIntent::new(booking_ref.clone(), Money::from_minor(2500, Currency::USD), "a@b.c", None)
}

#[tokio::test]
async fn test_get_or_create_keeps_one_live_intent() {
    let store = store().await;
    let booking_ref = unique_booking();

    let first = store.get_or_create(&booking_ref, &|| fresh(&booking_ref)).await.unwrap();
    let second = store.get_or_create(&booking_ref, &|| fresh(&booking_ref)).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.state, IntentState::Created);
}

#[tokio::test]
async fn test_guarded_transition_and_expiry_replacement() {
    let store = store().await;
    let booking_ref = unique_booking();
    let original = store.get_or_create(&booking_ref, &|| fresh(&booking_ref)).await.unwrap();

    let stale = store
        .transition(&booking_ref, &[IntentState::GatewayPending], IntentState::Verified, &|_| {})
        .await
        .unwrap_err();
    assert!(matches!(stale, TransitionError::Stale { current: IntentState::Created }));

    store
        .transition(&booking_ref, &[IntentState::Created], IntentState::Expired, &|_| {})
        .await
        .unwrap();
    let replacement = store.get_or_create(&booking_ref, &|| fresh(&booking_ref)).await.unwrap();

    assert_ne!(replacement.id, original.id);
    assert_eq!(replacement.state, IntentState::Created);
}

#[tokio::test]
async fn test_booking_lock_serializes_holders() {
    let store = Arc::new(store().await);
    let booking_ref = unique_booking();

    let held = store.lock_booking(&booking_ref).await.unwrap();
    let contender = {
        let store = store.clone();
        let booking_ref = booking_ref.clone();
        tokio::spawn(async move { store.lock_booking(&booking_ref).await.map(|_| Utc::now()) })
    };

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!contender.is_finished());

    let released_at = Utc::now();
    drop(held);
    let acquired_at = contender.await.unwrap().unwrap();
    assert!(acquired_at >= released_at);
}

#[tokio::test]
async fn test_booking_lock_excludes_other_store_instances() {
    let first = store().await;
    let second = Arc::new(store().await);
    let booking_ref = unique_booking();

    let held = first.lock_booking(&booking_ref).await.unwrap();
    let contender = {
        let second = second.clone();
        let booking_ref = booking_ref.clone();
        tokio::spawn(async move { second.lock_booking(&booking_ref).await.map(|_| ()) })
    };

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!contender.is_finished());

    drop(held);
    tokio::time::timeout(Duration::from_secs(5), contender)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_lock_holders_do_not_need_a_second_connection() {
    let store = Arc::new(store_with(2).await);
    let bookings: Vec<BookingRef> = (0..2).map(|_| unique_booking()).collect();

    let mut locks = Vec::new();
    for booking_ref in &bookings {
        locks.push(store.lock_booking(booking_ref).await.unwrap());
    }

    for booking_ref in &bookings {
        let created = tokio::time::timeout(
            Duration::from_secs(3),
            store.get_or_create(booking_ref, &|| fresh(booking_ref)),
        )
        .await
        .expect("store call waited on the pool while holding the lock")
        .unwrap();
        store
            .transition(booking_ref, &[IntentState::Created], IntentState::GatewayFailed, &|intent| {
                intent.attempts += 1;
            })
            .await
            .unwrap();
        assert_eq!(created.state, IntentState::Created);
    }
    drop(locks);
}

#[tokio::test]
async fn test_concurrent_initiates_for_different_bookings_share_a_small_pool() {
    let store = Arc::new(store_with(2).await);
    let gateway = Arc::new(ScriptedGateway::new().with_delay(Duration::from_millis(100)));
    let orchestrator = Arc::new(PaymentOrchestrator::new(
        store.clone(),
        gateway.clone(),
        OrchestratorConfig::default(),
    ));
    let bookings: Vec<BookingRef> = (0..4).map(|_| unique_booking()).collect();

    let mut tasks = JoinSet::new();
    for booking_ref in bookings.clone() {
        let orchestrator = orchestrator.clone();
        tasks.spawn(async move {
            orchestrator
                .initiate(InitiatePayment::new(
                    booking_ref.as_str(),
                    Money::from_minor(2500, Currency::USD),
                    "a@b.c",
                ))
                .await
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let outcome = joined.unwrap().unwrap();
        assert_eq!(outcome.intent.state, IntentState::GatewayPending);
        assert_eq!(outcome.intent.attempts, 1);
    }
    assert_eq!(gateway.initiate_calls(), 4);
}

#[tokio::test]
async fn test_concurrent_initiates_for_one_booking_open_one_session() {
    let store = Arc::new(store().await);
    let gateway = Arc::new(ScriptedGateway::new().with_delay(Duration::from_millis(50)));
    let orchestrator = Arc::new(PaymentOrchestrator::new(
        store.clone(),
        gateway.clone(),
        OrchestratorConfig::default(),
    ));
    let booking_ref = unique_booking();

    let mut tasks = JoinSet::new();
    for _ in 0..6 {
        let orchestrator = orchestrator.clone();
        let booking_ref = booking_ref.clone();
        tasks.spawn(async move {
            orchestrator
                .initiate(InitiatePayment::new(
                    booking_ref.as_str(),
                    Money::from_minor(2500, Currency::USD),
                    "a@b.c",
                ))
                .await
        });
    }

    let mut urls = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        urls.push(joined.unwrap().unwrap().payment_url);
    }

    assert!(urls.iter().all(|url| url == &urls[0]));
    assert_eq!(gateway.initiate_calls(), 1);

    let db = shared_test_database().await;
    let pool = db.pool(1).await.unwrap();
    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payment_intents WHERE booking_ref = $1")
        .bind(booking_ref.as_str())
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn test_flag_for_review_sets_reason() {
    let store = store().await;
    let booking_ref = unique_booking();
    store.get_or_create(&booking_ref, &|| fresh(&booking_ref)).await.unwrap();

    store.flag_for_review(&booking_ref, "conflicting callback").await.unwrap();

    let intent = store.get(&booking_ref).await.unwrap().unwrap();
    assert!(intent.needs_review);
    assert_eq!(intent.review_reason.as_deref(), Some("conflicting callback"));
}
