//! Request and response types of the provider's express-checkout protocol.

use common::Currency;
use domain::RefundType;
use rust_decimal::{Decimal, RoundingStrategy};

/// A remote operation, named as the provider names its methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    SetExpressCheckout,
    GetExpressCheckoutDetails,
    DoExpressCheckoutPayment,
    DoCapture,
    DoVoid,
    RefundTransaction,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::SetExpressCheckout => "SetExpressCheckout",
            Operation::GetExpressCheckoutDetails => "GetExpressCheckoutDetails",
            Operation::DoExpressCheckoutPayment => "DoExpressCheckoutPayment",
            Operation::DoCapture => "DoCapture",
            Operation::DoVoid => "DoVoid",
            Operation::RefundTransaction => "RefundTransaction",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Acknowledgement status of a remote response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    Success,
    SuccessWithWarning,
    Failure,
    FailureWithWarning,
}

impl Ack {
    /// Parses the provider's ACK value. Anything unrecognised counts as a failure.
    pub fn parse(value: &str) -> Self {
        match value {
            "Success" => Ack::Success,
            "SuccessWithWarning" => Ack::SuccessWithWarning,
            "FailureWithWarning" => Ack::FailureWithWarning,
            _ => Ack::Failure,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Ack::Success | Ack::SuccessWithWarning)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Ack::Success => "Success",
            Ack::SuccessWithWarning => "SuccessWithWarning",
            Ack::Failure => "Failure",
            Ack::FailureWithWarning => "FailureWithWarning",
        }
    }
}

/// One error entry reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteErrorEntry {
    pub code: Option<String>,
    pub short_message: String,
    pub long_message: String,
}

impl RemoteErrorEntry {
    /// Builds an entry carrying only a long message.
    pub fn message(long_message: impl Into<String>) -> Self {
        Self {
            code: None,
            short_message: String::new(),
            long_message: long_message.into(),
        }
    }
}

/// Joins the human-readable text of every error entry with single spaces.
///
/// Falls back to the short message for entries without a long one.
pub fn join_error_messages(errors: &[RemoteErrorEntry]) -> String {
    errors
        .iter()
        .map(|e| {
            if e.long_message.is_empty() {
                e.short_message.as_str()
            } else {
                e.long_message.as_str()
            }
        })
        .filter(|m| !m.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// A negative provider answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRejection {
    pub ack: Ack,
    pub errors: Vec<RemoteErrorEntry>,
}

impl RemoteRejection {
    pub fn message(&self) -> String {
        join_error_messages(&self.errors)
    }
}

/// A parsed remote response.
///
/// `details` is present whenever the acknowledgement is a success.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteResponse<T> {
    pub ack: Ack,
    pub errors: Vec<RemoteErrorEntry>,
    pub details: Option<T>,
}

impl<T> RemoteResponse<T> {
    pub fn success(details: T) -> Self {
        Self {
            ack: Ack::Success,
            errors: Vec::new(),
            details: Some(details),
        }
    }

    pub fn failure(errors: Vec<RemoteErrorEntry>) -> Self {
        Self {
            ack: Ack::Failure,
            errors,
            details: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.ack.is_success() && self.details.is_some()
    }

    /// Splits the response into its details or the rejection.
    pub fn into_result(self) -> Result<T, RemoteRejection> {
        match self.details {
            Some(details) if self.ack.is_success() => Ok(details),
            _ => Err(RemoteRejection {
                ack: self.ack,
                errors: self.errors,
            }),
        }
    }
}

/// A currency-qualified decimal amount in major units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Amount {
    pub currency: Currency,
    pub value: Decimal,
}

impl Amount {
    pub fn new(currency: Currency, value: Decimal) -> Self {
        Self { currency, value }
    }

    /// Renders the value rounded half away from zero to two decimal places.
    pub fn formatted(&self) -> String {
        let rounded = self
            .value
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        format!("{rounded:.2}")
    }
}

/// Whether settlement reserves funds or captures them immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentAction {
    Sale,
    Authorization,
}

impl PaymentAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentAction::Sale => "Sale",
            PaymentAction::Authorization => "Authorization",
        }
    }
}

impl std::fmt::Display for PaymentAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemCategory {
    Physical,
    Digital,
}

impl ItemCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemCategory::Physical => "Physical",
            ItemCategory::Digital => "Digital",
        }
    }
}

/// One priced entry of the order summary shown on the provider's page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentItem {
    pub name: String,
    pub number: Option<String>,
    pub quantity: u32,
    pub amount: Amount,
    pub category: Option<ItemCategory>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShipToAddress {
    pub name: String,
    pub street1: String,
    pub street2: Option<String>,
    pub city: String,
    pub state_or_province: String,
    pub country_code: String,
    pub postal_code: String,
}

/// Totals and items for one payment request.
///
/// When the item sum is zero only `order_total` is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentDetails {
    pub order_total: Amount,
    pub item_total: Option<Amount>,
    pub shipping_total: Option<Amount>,
    pub tax_total: Option<Amount>,
    pub ship_to: Option<ShipToAddress>,
    pub items: Vec<PaymentItem>,
    pub payment_action: PaymentAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetExpressCheckoutRequest {
    pub invoice_id: String,
    pub return_url: String,
    pub cancel_url: String,
    pub solution_type: String,
    pub landing_page: String,
    pub header_image: String,
    pub no_shipping: bool,
    pub payment_details: PaymentDetails,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetExpressCheckoutResponse {
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressCheckoutDetails {
    pub token: String,
    pub payer_id: Option<String>,
    pub order_total: Amount,
    pub notify_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoExpressCheckoutPaymentRequest {
    pub payment_action: PaymentAction,
    pub token: String,
    pub payer_id: String,
    pub order_total: Amount,
    pub notify_url: Option<String>,
}

/// Settlement result of a do-express-checkout-payment call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentInfo {
    pub transaction_id: String,
    pub payment_status: Option<String>,
    pub pending_reason: Option<String>,
}

impl PaymentInfo {
    /// True when the funds were only reserved.
    pub fn is_pending_authorization(&self) -> bool {
        self.pending_reason
            .as_deref()
            .is_some_and(|r| r.eq_ignore_ascii_case("authorization"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoCaptureRequest {
    pub authorization_id: String,
    pub amount: Amount,
    /// Always `Complete`: the authorization is closed after this capture.
    pub complete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureInfo {
    pub transaction_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoVoidRequest {
    pub authorization_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoidInfo {
    pub authorization_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundTransactionRequest {
    pub transaction_id: String,
    pub refund_type: RefundType,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundInfo {
    pub refund_transaction_id: String,
}
