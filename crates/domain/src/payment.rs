//! Payment record and its processing states.

use chrono::{DateTime, Utc};
use common::{Currency, Money, RecordId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// The processing state of a payment.
///
/// State transitions:
/// ```text
/// Checkout ──► Processing ──┬──► Pending ──┬──► Completed
///                           │              └──► Void
///                           ├──► Completed
///                           └──► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    /// Created during checkout, not yet sent to the gateway.
    #[default]
    Checkout,

    /// A gateway call is in flight.
    Processing,

    /// Funds authorized, awaiting capture.
    Pending,

    /// Funds captured (terminal unless refunded).
    Completed,

    /// Gateway rejected the payment (terminal state).
    Failed,

    /// Authorization voided (terminal state).
    Void,
}

impl PaymentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentState::Checkout => "checkout",
            PaymentState::Processing => "processing",
            PaymentState::Pending => "pending",
            PaymentState::Completed => "completed",
            PaymentState::Failed => "failed",
            PaymentState::Void => "void",
        }
    }
}

impl std::fmt::Display for PaymentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "checkout" => Ok(PaymentState::Checkout),
            "processing" => Ok(PaymentState::Processing),
            "pending" => Ok(PaymentState::Pending),
            "completed" => Ok(PaymentState::Completed),
            "failed" => Ok(PaymentState::Failed),
            "void" => Ok(PaymentState::Void),
            other => Err(format!("unknown payment state: {other}")),
        }
    }
}

/// A payment attached to an order, backed by a checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: RecordId,

    /// Amount in minor units.
    pub amount: Money,

    pub currency: Currency,
    pub state: PaymentState,

    /// The checkout session this payment settles against.
    pub source_id: RecordId,

    pub payment_method_id: i64,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// Creates a payment in the checkout state.
    pub fn new(amount: Money, currency: Currency, source_id: RecordId, payment_method_id: i64) -> Self {
        Self {
            id: RecordId::new(),
            amount,
            currency,
            state: PaymentState::Checkout,
            source_id,
            payment_method_id,
            created_at: Utc::now(),
        }
    }

    /// Returns true while the payment may still be captured.
    pub fn is_pending_or_checkout(&self) -> bool {
        matches!(self.state, PaymentState::Pending | PaymentState::Checkout)
    }

    pub fn start_processing(&mut self) -> Result<(), DomainError> {
        self.transition(
            matches!(self.state, PaymentState::Checkout | PaymentState::Pending),
            PaymentState::Processing,
            "start processing",
        )
    }

    /// Records that funds were reserved but not captured.
    pub fn mark_authorized(&mut self) -> Result<(), DomainError> {
        self.transition(
            self.state == PaymentState::Processing,
            PaymentState::Pending,
            "authorize",
        )
    }

    /// Records that funds were captured.
    pub fn mark_completed(&mut self) -> Result<(), DomainError> {
        self.transition(
            matches!(self.state, PaymentState::Processing | PaymentState::Pending),
            PaymentState::Completed,
            "complete",
        )
    }

    pub fn mark_failed(&mut self) -> Result<(), DomainError> {
        self.transition(
            self.state == PaymentState::Processing,
            PaymentState::Failed,
            "fail",
        )
    }

    pub fn mark_void(&mut self) -> Result<(), DomainError> {
        self.transition(
            matches!(
                self.state,
                PaymentState::Checkout | PaymentState::Pending | PaymentState::Processing
            ),
            PaymentState::Void,
            "void",
        )
    }

    fn transition(
        &mut self,
        allowed: bool,
        next: PaymentState,
        action: &'static str,
    ) -> Result<(), DomainError> {
        if !allowed {
            return Err(DomainError::InvalidPaymentTransition {
                current_state: self.state,
                action,
            });
        }
        self.state = next;
        Ok(())
    }
}
