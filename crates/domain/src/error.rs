//! Domain error types.

use common::RecordId;
use thiserror::Error;

use crate::order::OrderState;
use crate::payment::PaymentState;

/// Errors raised when a record is asked to make an illegal transition.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Order is not in a state that allows the action.
    #[error("Invalid order transition: cannot {action} from {current_state} state")]
    InvalidOrderTransition {
        current_state: OrderState,
        action: &'static str,
    },

    /// Payment is not in a state that allows the action.
    #[error("Invalid payment transition: cannot {action} from {current_state} state")]
    InvalidPaymentTransition {
        current_state: PaymentState,
        action: &'static str,
    },

    /// Payment does not belong to the order.
    #[error("Payment not found: {0}")]
    PaymentNotFound(RecordId),
}
