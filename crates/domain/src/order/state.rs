//! Order checkout state machine.

use serde::{Deserialize, Serialize};

/// The checkout state of an order.
///
/// State transitions owned by the host platform:
/// ```text
/// Cart ──► Address ──► Delivery ──► Payment ──► Confirm ──► Complete
///   │         │           │           │           │
///   └─────────┴───────────┴───────────┴───────────┴──► Canceled
/// ```
/// The gateway only ever drives `Payment`/`Confirm` to `Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    /// Items are still being added.
    #[default]
    Cart,

    /// Waiting for a bill/ship address.
    Address,

    /// Waiting for a shipping method.
    Delivery,

    /// Waiting for payment.
    Payment,

    /// Payment entered, waiting for the buyer to confirm.
    Confirm,

    /// Order placed (terminal state).
    Complete,

    /// Order was canceled (terminal state).
    Canceled,
}

impl OrderState {
    /// Returns true if payments may be attached in this state.
    pub fn accepts_payment(&self) -> bool {
        matches!(
            self,
            OrderState::Payment | OrderState::Confirm | OrderState::Complete
        )
    }

    /// Returns true if the order can be completed from this state.
    pub fn can_complete(&self) -> bool {
        matches!(self, OrderState::Payment | OrderState::Confirm)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderState::Complete | OrderState::Canceled)
    }

    /// Returns the state name as used in checkout URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::Cart => "cart",
            OrderState::Address => "address",
            OrderState::Delivery => "delivery",
            OrderState::Payment => "payment",
            OrderState::Confirm => "confirm",
            OrderState::Complete => "complete",
            OrderState::Canceled => "canceled",
        }
    }
}

impl std::fmt::Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cart" => Ok(OrderState::Cart),
            "address" => Ok(OrderState::Address),
            "delivery" => Ok(OrderState::Delivery),
            "payment" => Ok(OrderState::Payment),
            "confirm" => Ok(OrderState::Confirm),
            "complete" => Ok(OrderState::Complete),
            "canceled" => Ok(OrderState::Canceled),
            other => Err(format!("unknown order state: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_cart() {
        assert_eq!(OrderState::default(), OrderState::Cart);
    }

    #[test]
    fn test_payment_and_confirm_can_complete() {
        assert!(!OrderState::Cart.can_complete());
        assert!(!OrderState::Delivery.can_complete());
        assert!(OrderState::Payment.can_complete());
        assert!(OrderState::Confirm.can_complete());
        assert!(!OrderState::Complete.can_complete());
        assert!(!OrderState::Canceled.can_complete());
    }

    #[test]
    fn test_completed_orders_accept_additional_payments() {
        assert!(OrderState::Complete.accepts_payment());
        assert!(!OrderState::Canceled.accepts_payment());
        assert!(!OrderState::Address.accepts_payment());
    }

    #[test]
    fn test_display_round_trips_through_from_str() {
        for state in [
            OrderState::Cart,
            OrderState::Address,
            OrderState::Delivery,
            OrderState::Payment,
            OrderState::Confirm,
            OrderState::Complete,
            OrderState::Canceled,
        ] {
            assert_eq!(state.to_string().parse::<OrderState>().unwrap(), state);
        }
        assert!("shipped".parse::<OrderState>().is_err());
    }

    #[test]
    fn test_serialization_is_snake_case() {
        let json = serde_json::to_string(&OrderState::Payment).unwrap();
        assert_eq!(json, "\"payment\"");
    }
}
