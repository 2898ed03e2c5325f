use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::RecordId;
use domain::{CheckoutSession, Order};
use tokio::sync::RwLock;

use crate::{CheckoutStore, Result, StoreError};

/// In-memory checkout store.
///
/// Provides the same interface and token-uniqueness guarantee as the
/// PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct InMemoryCheckoutStore {
    orders: Arc<RwLock<HashMap<String, Order>>>,
    sessions: Arc<RwLock<HashMap<RecordId, CheckoutSession>>>,
}

impl InMemoryCheckoutStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored checkout sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns the number of payments stored across all orders.
    pub async fn payment_count(&self) -> usize {
        self.orders
            .read()
            .await
            .values()
            .map(|o| o.payments.len())
            .sum()
    }

    /// Clears all records.
    pub async fn clear(&self) {
        self.orders.write().await.clear();
        self.sessions.write().await.clear();
    }
}

#[async_trait]
impl CheckoutStore for InMemoryCheckoutStore {
    async fn save_order(&self, order: &Order) -> Result<()> {
        self.orders
            .write()
            .await
            .insert(order.number.clone(), order.clone());
        Ok(())
    }

    async fn get_order(&self, number: &str) -> Result<Option<Order>> {
        Ok(self.orders.read().await.get(number).cloned())
    }

    async fn save_session(&self, session: &CheckoutSession) -> Result<()> {
        let mut sessions = self.sessions.write().await;

        // Unique token constraint simulation
        if sessions
            .values()
            .any(|s| s.token() == session.token() && s.id != session.id)
        {
            return Err(StoreError::DuplicateToken(session.token().to_string()));
        }

        sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn get_session(&self, id: RecordId) -> Result<Option<CheckoutSession>> {
        Ok(self.sessions.read().await.get(&id).cloned())
    }

    async fn find_session_by_token(&self, token: &str) -> Result<Option<CheckoutSession>> {
        Ok(self
            .sessions
            .read()
            .await
            .values()
            .find(|s| s.token() == token)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CheckoutStoreExt;
    use common::{Currency, Money};
    use domain::{LineItem, Payment};

    #[tokio::test]
    async fn test_save_and_get_order_with_payments() {
        let store = InMemoryCheckoutStore::new();
        let mut order = Order::new("R1", Currency::usd());
        order.add_line_item(LineItem::new("SKU", "Widget", 1, Money::from_cents(500)));
        order.begin_payment().unwrap();
        order
            .add_payment(Payment::new(Money::from_cents(500), Currency::usd(), RecordId::new(), 1))
            .unwrap();

        store.save_order(&order).await.unwrap();

        let loaded = store.require_order("R1").await.unwrap();
        assert_eq!(loaded, order);
        assert_eq!(store.payment_count().await, 1);
    }

    #[tokio::test]
    async fn test_missing_order_is_not_found() {
        let store = InMemoryCheckoutStore::new();
        assert!(store.get_order("nope").await.unwrap().is_none());
        assert!(matches!(
            store.require_order("nope").await,
            Err(StoreError::OrderNotFound(n)) if n == "nope"
        ));
    }

    #[tokio::test]
    async fn test_session_update_and_lookup_by_token() {
        let store = InMemoryCheckoutStore::new();
        let mut session = CheckoutSession::new("EC-1", "P-1");
        store.save_session(&session).await.unwrap();

        session.record_transaction("TXN-1");
        store.save_session(&session).await.unwrap();

        let found = store.find_session_by_token("EC-1").await.unwrap().unwrap();
        assert_eq!(found.transaction_id.as_deref(), Some("TXN-1"));
        assert_eq!(store.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_second_session_with_same_token_is_rejected() {
        let store = InMemoryCheckoutStore::new();
        store
            .save_session(&CheckoutSession::new("EC-1", "P-1"))
            .await
            .unwrap();

        let result = store.save_session(&CheckoutSession::new("EC-1", "P-1")).await;
        assert!(matches!(result, Err(StoreError::DuplicateToken(t)) if t == "EC-1"));
        assert_eq!(store.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let store = InMemoryCheckoutStore::new();
        store
            .save_order(&Order::new("R1", Currency::usd()))
            .await
            .unwrap();
        store
            .save_session(&CheckoutSession::new("EC-1", "P-1"))
            .await
            .unwrap();

        store.clear().await;
        assert!(store.get_order("R1").await.unwrap().is_none());
        assert_eq!(store.session_count().await, 0);
    }
}
