//! Order record.

use chrono::{DateTime, Utc};
use common::{Currency, Money, RecordId};
use serde::{Deserialize, Serialize};

use super::state::OrderState;
use super::value_objects::{Address, Adjustment, AdjustmentKind, LineItem};
use crate::error::DomainError;
use crate::payment::{Payment, PaymentState};

/// An order as the host platform hands it to the gateway.
///
/// Totals are derived from line items and eligible adjustments rather than
/// stored, so they can never drift from their parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: RecordId,

    /// Public order number (e.g. `R123456789`), used as the invoice id.
    pub number: String,

    /// Token that grants guest access to the order.
    pub guest_token: String,

    pub currency: Currency,
    pub state: OrderState,
    pub line_items: Vec<LineItem>,
    pub adjustments: Vec<Adjustment>,
    pub bill_address: Option<Address>,
    pub payments: Vec<Payment>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Creates an empty order in the cart state.
    pub fn new(number: impl Into<String>, currency: Currency) -> Self {
        Self {
            id: RecordId::new(),
            number: number.into(),
            guest_token: RecordId::new().as_uuid().simple().to_string(),
            currency,
            state: OrderState::Cart,
            line_items: Vec::new(),
            adjustments: Vec::new(),
            bill_address: None,
            payments: Vec::new(),
            completed_at: None,
        }
    }

    pub fn add_line_item(&mut self, item: LineItem) {
        self.line_items.push(item);
    }

    pub fn add_adjustment(&mut self, adjustment: Adjustment) {
        self.adjustments.push(adjustment);
    }

    /// Iterates over adjustments that currently apply.
    pub fn eligible_adjustments(&self) -> impl Iterator<Item = &Adjustment> {
        self.adjustments.iter().filter(|a| a.eligible)
    }

    /// Sum of all line item amounts.
    pub fn item_total(&self) -> Money {
        self.line_items.iter().map(LineItem::amount).sum()
    }

    /// Sum of eligible shipping adjustments.
    pub fn ship_total(&self) -> Money {
        self.adjustment_total_of(AdjustmentKind::Shipping)
    }

    /// Sum of eligible tax adjustments.
    pub fn tax_total(&self) -> Money {
        self.adjustment_total_of(AdjustmentKind::Tax)
    }

    /// Sum of every eligible adjustment.
    pub fn adjustment_total(&self) -> Money {
        self.eligible_adjustments().map(|a| a.amount).sum()
    }

    /// Grand total: items plus eligible adjustments.
    pub fn total(&self) -> Money {
        self.item_total() + self.adjustment_total()
    }

    /// Sum of payments that hold funds (authorized or captured).
    pub fn authorized_payment_total(&self) -> Money {
        self.payments
            .iter()
            .filter(|p| matches!(p.state, PaymentState::Pending | PaymentState::Completed))
            .map(|p| p.amount)
            .sum()
    }

    /// Amount still owed after funds already held.
    pub fn outstanding_balance(&self) -> Money {
        self.total() - self.authorized_payment_total()
    }

    pub fn is_completed(&self) -> bool {
        self.state == OrderState::Complete
    }

    /// Attaches a payment to the order.
    pub fn add_payment(&mut self, payment: Payment) -> Result<(), DomainError> {
        if !self.state.accepts_payment() {
            return Err(DomainError::InvalidOrderTransition {
                current_state: self.state,
                action: "add payment",
            });
        }
        self.payments.push(payment);
        Ok(())
    }

    pub fn payment(&self, payment_id: RecordId) -> Result<&Payment, DomainError> {
        self.payments
            .iter()
            .find(|p| p.id == payment_id)
            .ok_or(DomainError::PaymentNotFound(payment_id))
    }

    pub fn payment_mut(&mut self, payment_id: RecordId) -> Result<&mut Payment, DomainError> {
        self.payments
            .iter_mut()
            .find(|p| p.id == payment_id)
            .ok_or(DomainError::PaymentNotFound(payment_id))
    }

    /// IDs of payments that have not been processed yet.
    pub fn unprocessed_payment_ids(&self) -> Vec<RecordId> {
        self.payments
            .iter()
            .filter(|p| p.state == PaymentState::Checkout)
            .map(|p| p.id)
            .collect()
    }

    /// Moves the order to the payment step.
    pub fn begin_payment(&mut self) -> Result<(), DomainError> {
        if self.state.is_terminal() {
            return Err(DomainError::InvalidOrderTransition {
                current_state: self.state,
                action: "begin payment",
            });
        }
        self.state = OrderState::Payment;
        Ok(())
    }

    /// Marks the order complete.
    pub fn complete(&mut self, at: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.state.can_complete() {
            return Err(DomainError::InvalidOrderTransition {
                current_state: self.state,
                action: "complete",
            });
        }
        self.state = OrderState::Complete;
        self.completed_at = Some(at);
        Ok(())
    }

    fn adjustment_total_of(&self, kind: AdjustmentKind) -> Money {
        self.eligible_adjustments()
            .filter(|a| a.kind == kind)
            .map(|a| a.amount)
            .sum()
    }
}
