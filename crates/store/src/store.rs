use async_trait::async_trait;
use common::RecordId;
use domain::{CheckoutSession, Order};

use crate::{Result, StoreError};

/// Core trait for checkout persistence.
///
/// Orders are saved together with their payments. Sessions are saved on
/// their own because the gateway updates them independently of the order.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait CheckoutStore: Send + Sync {
    /// Inserts or replaces an order and all of its payments.
    async fn save_order(&self, order: &Order) -> Result<()>;

    /// Loads an order by its public number.
    ///
    /// Returns None if the order doesn't exist.
    async fn get_order(&self, number: &str) -> Result<Option<Order>>;

    /// Inserts or replaces a checkout session.
    ///
    /// Fails with `DuplicateToken` if another session already holds the token.
    async fn save_session(&self, session: &CheckoutSession) -> Result<()>;

    /// Loads a checkout session by id.
    async fn get_session(&self, id: RecordId) -> Result<Option<CheckoutSession>>;

    /// Loads the checkout session created for a provider token.
    async fn find_session_by_token(&self, token: &str) -> Result<Option<CheckoutSession>>;
}

/// Extension trait providing convenience methods for checkout stores.
#[async_trait]
pub trait CheckoutStoreExt: CheckoutStore {
    /// Loads an order, failing with `OrderNotFound` if it is missing.
    async fn require_order(&self, number: &str) -> Result<Order> {
        self.get_order(number)
            .await?
            .ok_or_else(|| StoreError::OrderNotFound(number.to_string()))
    }

    /// Loads a session, failing with `SessionNotFound` if it is missing.
    async fn require_session(&self, id: RecordId) -> Result<CheckoutSession> {
        self.get_session(id)
            .await?
            .ok_or(StoreError::SessionNotFound(id))
    }
}

// Blanket implementation for all CheckoutStore implementations
impl<T: CheckoutStore + ?Sized> CheckoutStoreExt for T {}
