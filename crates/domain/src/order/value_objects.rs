//! Value objects for the order record.

use common::Money;
use serde::{Deserialize, Serialize};

/// A purchased variant on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Variant SKU.
    pub sku: String,

    /// Human-readable product name.
    pub name: String,

    /// Quantity ordered.
    pub quantity: u32,

    /// Price per unit.
    pub price: Money,
}

impl LineItem {
    /// Creates a new line item.
    pub fn new(sku: impl Into<String>, name: impl Into<String>, quantity: u32, price: Money) -> Self {
        Self {
            sku: sku.into(),
            name: name.into(),
            quantity,
            price,
        }
    }

    /// Returns the line total (quantity * price).
    pub fn amount(&self) -> Money {
        self.price.multiply(self.quantity)
    }
}

/// What an adjustment represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    Tax,
    Shipping,
    Promotion,
    Other,
}

/// A charge or credit applied to an order on top of its line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    /// Label shown to the buyer (e.g. "Promo WELCOME10").
    pub label: String,

    /// Signed amount; credits are negative.
    pub amount: Money,

    pub kind: AdjustmentKind,

    /// Whether the adjustment currently applies to the order.
    pub eligible: bool,
}

impl Adjustment {
    /// Creates an eligible adjustment.
    pub fn new(label: impl Into<String>, amount: Money, kind: AdjustmentKind) -> Self {
        Self {
            label: label.into(),
            amount,
            kind,
            eligible: true,
        }
    }

    /// Returns true for adjustments that are neither tax nor shipping.
    pub fn is_itemizable(&self) -> bool {
        !matches!(self.kind, AdjustmentKind::Tax | AdjustmentKind::Shipping)
    }
}

/// Postal address attached to an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub first_name: String,
    pub last_name: String,
    pub address1: String,
    pub address2: Option<String>,
    pub city: String,
    /// State or province name (or abbreviation).
    pub state: String,
    /// ISO 3166-1 alpha-2 country code.
    pub country_iso: String,
    pub zipcode: String,
}

impl Address {
    /// Returns "first last", skipping blank parts.
    pub fn full_name(&self) -> String {
        [self.first_name.trim(), self.last_name.trim()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
