//! Persisted record of one express-checkout attempt.

use chrono::{DateTime, Utc};
use common::RecordId;
use serde::{Deserialize, Serialize};

use crate::payment::Payment;

/// Whether the captured funds have been returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RefundState {
    #[default]
    None,
    Refunded,
}

impl RefundState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundState::None => "none",
            RefundState::Refunded => "refunded",
        }
    }
}

impl std::str::FromStr for RefundState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(RefundState::None),
            "refunded" => Ok(RefundState::Refunded),
            other => Err(format!("unknown refund state: {other}")),
        }
    }
}

/// How much of the captured amount a refund returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefundType {
    Full,
    Partial,
}

impl RefundType {
    /// Returns the provider's spelling ("Full" / "Partial").
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundType::Full => "Full",
            RefundType::Partial => "Partial",
        }
    }
}

impl std::fmt::Display for RefundType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RefundType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Full" => Ok(RefundType::Full),
            "Partial" => Ok(RefundType::Partial),
            other => Err(format!("unknown refund type: {other}")),
        }
    }
}

/// One express-checkout attempt, created when the buyer returns from the
/// provider with a token and payer id.
///
/// After the first successful settlement exactly one of `authorization_id`
/// and `transaction_id` is set; a later capture fills `transaction_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: RecordId,

    /// Provider-issued session token. Immutable.
    token: String,

    /// Provider-issued payer id, supplied on return.
    payer_id: String,

    pub authorization_id: Option<String>,
    pub transaction_id: Option<String>,
    pub refund_state: RefundState,
    pub refund_transaction_id: Option<String>,
    pub refund_type: Option<RefundType>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl CheckoutSession {
    pub fn new(token: impl Into<String>, payer_id: impl Into<String>) -> Self {
        Self {
            id: RecordId::new(),
            token: token.into(),
            payer_id: payer_id.into(),
            authorization_id: None,
            transaction_id: None,
            refund_state: RefundState::None,
            refund_transaction_id: None,
            refund_type: None,
            refunded_at: None,
            created_at: Utc::now(),
        }
    }

    /// Rebuilds a session from stored columns.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: RecordId,
        token: String,
        payer_id: String,
        authorization_id: Option<String>,
        transaction_id: Option<String>,
        refund_state: RefundState,
        refund_transaction_id: Option<String>,
        refund_type: Option<RefundType>,
        refunded_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            token,
            payer_id,
            authorization_id,
            transaction_id,
            refund_state,
            refund_transaction_id,
            refund_type,
            refunded_at,
            created_at,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn payer_id(&self) -> &str {
        &self.payer_id
    }

    /// Admin actions offered for payments backed by this session.
    pub fn actions(&self) -> &'static [&'static str] {
        &["capture"]
    }

    /// True once funds were reserved by an authorization.
    pub fn is_authorized(&self) -> bool {
        self.authorization_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty())
    }

    pub fn can_capture(&self, payment: &Payment) -> bool {
        payment.is_pending_or_checkout() && self.is_authorized()
    }

    pub fn is_refunded(&self) -> bool {
        self.refund_state == RefundState::Refunded
    }

    pub fn record_authorization(&mut self, authorization_id: impl Into<String>) {
        self.authorization_id = Some(authorization_id.into());
    }

    pub fn record_transaction(&mut self, transaction_id: impl Into<String>) {
        self.transaction_id = Some(transaction_id.into());
    }

    pub fn record_refund(
        &mut self,
        refund_transaction_id: impl Into<String>,
        refund_type: RefundType,
        at: DateTime<Utc>,
    ) {
        self.refund_state = RefundState::Refunded;
        self.refund_transaction_id = Some(refund_transaction_id.into());
        self.refund_type = Some(refund_type);
        self.refunded_at = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Currency, Money};

    #[test]
    fn test_new_session_has_no_settlement() {
        let session = CheckoutSession::new("EC-1", "PAYER-1");
        assert_eq!(session.token(), "EC-1");
        assert_eq!(session.payer_id(), "PAYER-1");
        assert!(session.authorization_id.is_none());
        assert!(session.transaction_id.is_none());
        assert_eq!(session.refund_state, RefundState::None);
    }

    #[test]
    fn test_blank_authorization_is_not_authorized() {
        let mut session = CheckoutSession::new("EC-1", "PAYER-1");
        session.record_authorization("  ");
        assert!(!session.is_authorized());

        session.record_authorization("AUTH-1");
        assert!(session.is_authorized());
    }

    #[test]
    fn test_can_capture_requires_authorization_and_open_payment() {
        let mut session = CheckoutSession::new("EC-1", "PAYER-1");
        let mut payment = Payment::new(Money::from_cents(100), Currency::usd(), session.id, 1);
        assert!(!session.can_capture(&payment));

        session.record_authorization("AUTH-1");
        assert!(session.can_capture(&payment));

        payment.start_processing().unwrap();
        payment.mark_completed().unwrap();
        assert!(!session.can_capture(&payment));
        assert_eq!(session.actions(), &["capture"]);
    }

    #[test]
    fn test_record_refund_sets_all_fields() {
        let mut session = CheckoutSession::new("EC-1", "PAYER-1");
        let at = Utc::now();
        session.record_refund("REF-1", RefundType::Partial, at);

        assert!(session.is_refunded());
        assert_eq!(session.refund_transaction_id.as_deref(), Some("REF-1"));
        assert_eq!(session.refund_type, Some(RefundType::Partial));
        assert_eq!(session.refunded_at, Some(at));
    }

    #[test]
    fn test_refund_type_uses_provider_spelling() {
        assert_eq!(RefundType::Full.to_string(), "Full");
        assert_eq!("Partial".parse::<RefundType>().unwrap(), RefundType::Partial);
        assert_eq!("refunded".parse::<RefundState>().unwrap(), RefundState::Refunded);
    }
}
