//! Host-side records for the express-checkout gateway.
//!
//! This crate provides the data the gateway reads and writes:
//! - Order with line items, adjustments and its payments
//! - Payment with its processing state
//! - CheckoutSession, the persisted record of one express-checkout attempt

pub mod checkout_session;
pub mod error;
pub mod order;
pub mod payment;

pub use checkout_session::{CheckoutSession, RefundState, RefundType};
pub use error::DomainError;
pub use order::{Address, Adjustment, AdjustmentKind, LineItem, Order, OrderState};
pub use payment::{Payment, PaymentState};
