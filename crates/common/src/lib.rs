//! Shared types for the express-checkout gateway workspace.

pub mod money;
pub mod types;

pub use money::{Currency, Money};
pub use types::{BusinessEntityId, RecordId};
