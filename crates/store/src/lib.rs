//! Persistence for the records the express-checkout gateway writes.
//!
//! The [`CheckoutStore`] port has an in-memory implementation for tests and
//! single-process deployments, and a PostgreSQL implementation.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryCheckoutStore;
pub use postgres::PostgresCheckoutStore;
pub use store::{CheckoutStore, CheckoutStoreExt};
