//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use chrono::Utc;
use common::{Currency, Money};
use domain::{
    Adjustment, AdjustmentKind, CheckoutSession, LineItem, Order, OrderState, Payment,
    PaymentState, RefundState, RefundType,
};
use serial_test::serial;
use sqlx::PgPool;
use store::{CheckoutStore, CheckoutStoreExt, PostgresCheckoutStore, StoreError};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for migrations
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_checkout_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresCheckoutStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE payments, orders, checkout_sessions")
        .execute(&pool)
        .await
        .unwrap();

    PostgresCheckoutStore::new(pool)
}

fn order_at_payment_step(number: &str) -> Order {
    let mut order = Order::new(number, Currency::usd());
    order.add_line_item(LineItem::new("SKU-001", "Widget", 2, Money::from_cents(2500)));
    order.add_adjustment(Adjustment::new(
        "Promo",
        Money::from_cents(-500),
        AdjustmentKind::Promotion,
    ));
    order.begin_payment().unwrap();
    order
}

#[tokio::test]
#[serial]
async fn test_order_round_trips_with_payments() {
    let store = get_test_store().await;
    let session = CheckoutSession::new("EC-PG-1", "PAYER-1");
    store.save_session(&session).await.unwrap();

    let mut order = order_at_payment_step("R-PG-1");
    let payment = Payment::new(order.outstanding_balance(), Currency::usd(), session.id, 7);
    let payment_id = payment.id;
    order.add_payment(payment).unwrap();
    store.save_order(&order).await.unwrap();

    let loaded = store.require_order("R-PG-1").await.unwrap();
    assert_eq!(loaded.number, "R-PG-1");
    assert_eq!(loaded.state, OrderState::Payment);
    assert_eq!(loaded.total().cents(), 4500);
    assert_eq!(loaded.payments.len(), 1);

    let stored = loaded.payment(payment_id).unwrap();
    assert_eq!(stored.amount.cents(), 4500);
    assert_eq!(stored.source_id, session.id);
    assert_eq!(stored.payment_method_id, 7);
    assert_eq!(stored.state, PaymentState::Checkout);
}

#[tokio::test]
#[serial]
async fn test_payment_state_updates_are_persisted() {
    let store = get_test_store().await;
    let session = CheckoutSession::new("EC-PG-2", "PAYER-2");
    store.save_session(&session).await.unwrap();

    let mut order = order_at_payment_step("R-PG-2");
    let payment = Payment::new(Money::from_cents(4500), Currency::usd(), session.id, 1);
    let payment_id = payment.id;
    order.add_payment(payment).unwrap();
    store.save_order(&order).await.unwrap();

    let payment = order.payment_mut(payment_id).unwrap();
    payment.start_processing().unwrap();
    payment.mark_authorized().unwrap();
    order.complete(Utc::now()).unwrap();
    store.save_order(&order).await.unwrap();

    let loaded = store.require_order("R-PG-2").await.unwrap();
    assert_eq!(loaded.state, OrderState::Complete);
    assert_eq!(loaded.payments.len(), 1);
    assert_eq!(loaded.payment(payment_id).unwrap().state, PaymentState::Pending);
}

#[tokio::test]
#[serial]
async fn test_session_settlement_and_refund_fields_persist() {
    let store = get_test_store().await;
    let mut session = CheckoutSession::new("EC-PG-3", "PAYER-3");
    store.save_session(&session).await.unwrap();

    session.record_transaction("TXN-3");
    session.record_refund("REF-3", RefundType::Partial, Utc::now());
    store.save_session(&session).await.unwrap();

    let loaded = store.find_session_by_token("EC-PG-3").await.unwrap().unwrap();
    assert_eq!(loaded.id, session.id);
    assert_eq!(loaded.payer_id(), "PAYER-3");
    assert_eq!(loaded.transaction_id.as_deref(), Some("TXN-3"));
    assert!(loaded.authorization_id.is_none());
    assert_eq!(loaded.refund_state, RefundState::Refunded);
    assert_eq!(loaded.refund_type, Some(RefundType::Partial));
    assert_eq!(loaded.refund_transaction_id.as_deref(), Some("REF-3"));
    assert!(loaded.refunded_at.is_some());
}

#[tokio::test]
#[serial]
async fn test_duplicate_token_is_rejected() {
    let store = get_test_store().await;
    store
        .save_session(&CheckoutSession::new("EC-PG-4", "PAYER-4"))
        .await
        .unwrap();

    let result = store
        .save_session(&CheckoutSession::new("EC-PG-4", "PAYER-4"))
        .await;
    assert!(matches!(result, Err(StoreError::DuplicateToken(t)) if t == "EC-PG-4"));
}

#[tokio::test]
#[serial]
async fn test_missing_records() {
    let store = get_test_store().await;
    assert!(store.get_order("missing").await.unwrap().is_none());
    assert!(store.find_session_by_token("missing").await.unwrap().is_none());

    let id = common::RecordId::new();
    assert!(matches!(
        store.require_session(id).await,
        Err(StoreError::SessionNotFound(missing)) if missing == id
    ));
}
