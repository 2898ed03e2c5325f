//! Scripted in-memory provider for tests and local runs.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use url::Url;

use super::types::*;
use super::{ExpressCheckoutApi, TransportError, express_checkout_url};

const SANDBOX_CHECKOUT: &str = "https://www.sandbox.paypal.com/cgi-bin/webscr";

/// A request received by [`InMemoryExpressCheckout`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    SetExpressCheckout(SetExpressCheckoutRequest),
    GetExpressCheckoutDetails { token: String },
    DoExpressCheckoutPayment(DoExpressCheckoutPaymentRequest),
    DoCapture(DoCaptureRequest),
    DoVoid(DoVoidRequest),
    RefundTransaction(RefundTransactionRequest),
}

impl RecordedCall {
    pub fn operation(&self) -> Operation {
        match self {
            RecordedCall::SetExpressCheckout(_) => Operation::SetExpressCheckout,
            RecordedCall::GetExpressCheckoutDetails { .. } => Operation::GetExpressCheckoutDetails,
            RecordedCall::DoExpressCheckoutPayment(_) => Operation::DoExpressCheckoutPayment,
            RecordedCall::DoCapture(_) => Operation::DoCapture,
            RecordedCall::DoVoid(_) => Operation::DoVoid,
            RecordedCall::RefundTransaction(_) => Operation::RefundTransaction,
        }
    }
}

#[derive(Debug, Default)]
struct InMemoryProviderState {
    /// Known session tokens and the order total they were started with.
    sessions: HashMap<String, Amount>,
    next_id: u32,
    pending_reason: Option<String>,
    rejections: HashMap<Operation, Vec<String>>,
    transport_faults: HashSet<Operation>,
    calls: Vec<RecordedCall>,
}

impl InMemoryProviderState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{:04}", self.next_id)
    }

    /// Records the call and applies any scripted outcome for its operation.
    fn receive(&mut self, call: RecordedCall) -> Result<Option<Vec<RemoteErrorEntry>>, TransportError> {
        let operation = call.operation();
        self.calls.push(call);

        if self.transport_faults.remove(&operation) {
            return Err(TransportError::Unavailable(format!(
                "scripted transport fault on {operation}"
            )));
        }

        Ok(self.rejections.remove(&operation).map(|messages| {
            messages
                .into_iter()
                .map(RemoteErrorEntry::message)
                .collect()
        }))
    }
}

fn invalid_token<T>() -> RemoteResponse<T> {
    RemoteResponse::failure(vec![RemoteErrorEntry {
        code: Some("10410".to_string()),
        short_message: "Invalid token".to_string(),
        long_message: "Invalid token.".to_string(),
    }])
}

/// In-memory express-checkout provider.
///
/// Sessions started through it (or registered with [`register_session`])
/// can be settled, captured, voided and refunded. Tests can script the next
/// call of an operation to be rejected or to fail in transport.
///
/// [`register_session`]: InMemoryExpressCheckout::register_session
#[derive(Debug, Clone, Default)]
pub struct InMemoryExpressCheckout {
    state: Arc<Mutex<InMemoryProviderState>>,
}

impl InMemoryExpressCheckout {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, InMemoryProviderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes a token known as if a session had been started with `order_total`.
    pub fn register_session(&self, token: impl Into<String>, order_total: Amount) {
        self.state().sessions.insert(token.into(), order_total);
    }

    /// Overrides the pending reason reported by settlement.
    ///
    /// By default an `Authorization` reports `authorization` and a `Sale`
    /// reports `None`.
    pub fn set_pending_reason(&self, reason: Option<&str>) {
        self.state().pending_reason = reason.map(str::to_string);
    }

    /// Rejects the next call of `operation` with the given error messages.
    pub fn reject_next(&self, operation: Operation, messages: &[&str]) {
        self.state().rejections.insert(
            operation,
            messages.iter().map(|m| m.to_string()).collect(),
        );
    }

    /// Fails the next call of `operation` with a transport fault.
    pub fn fail_transport_next(&self, operation: Operation) {
        self.state().transport_faults.insert(operation);
    }

    /// Number of calls received for `operation`.
    pub fn call_count(&self, operation: Operation) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.operation() == operation)
            .count()
    }

    /// Every call received so far, in order.
    pub fn recorded(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }
}

#[async_trait]
impl ExpressCheckoutApi for InMemoryExpressCheckout {
    async fn set_express_checkout(
        &self,
        request: SetExpressCheckoutRequest,
    ) -> Result<RemoteResponse<SetExpressCheckoutResponse>, TransportError> {
        let mut state = self.state();
        let order_total = request.payment_details.order_total.clone();
        if let Some(errors) = state.receive(RecordedCall::SetExpressCheckout(request))? {
            return Ok(RemoteResponse::failure(errors));
        }

        let token = state.next_id("EC");
        state.sessions.insert(token.clone(), order_total);
        Ok(RemoteResponse::success(SetExpressCheckoutResponse { token }))
    }

    async fn get_express_checkout_details(
        &self,
        token: &str,
    ) -> Result<RemoteResponse<ExpressCheckoutDetails>, TransportError> {
        let mut state = self.state();
        let call = RecordedCall::GetExpressCheckoutDetails {
            token: token.to_string(),
        };
        if let Some(errors) = state.receive(call)? {
            return Ok(RemoteResponse::failure(errors));
        }

        let Some(order_total) = state.sessions.get(token).cloned() else {
            return Ok(invalid_token());
        };

        Ok(RemoteResponse::success(ExpressCheckoutDetails {
            token: token.to_string(),
            payer_id: Some(format!("PAYER-{token}")),
            order_total,
            notify_url: None,
        }))
    }

    async fn do_express_checkout_payment(
        &self,
        request: DoExpressCheckoutPaymentRequest,
    ) -> Result<RemoteResponse<PaymentInfo>, TransportError> {
        let mut state = self.state();
        let known = state.sessions.contains_key(&request.token);
        let action = request.payment_action;
        if let Some(errors) = state.receive(RecordedCall::DoExpressCheckoutPayment(request))? {
            return Ok(RemoteResponse::failure(errors));
        }
        if !known {
            return Ok(invalid_token());
        }

        let default_reason = match action {
            PaymentAction::Authorization => "authorization",
            PaymentAction::Sale => "None",
        };
        let pending_reason = state
            .pending_reason
            .clone()
            .unwrap_or_else(|| default_reason.to_string());
        let payment_status = if pending_reason.eq_ignore_ascii_case("none") {
            "Completed"
        } else {
            "Pending"
        };

        Ok(RemoteResponse::success(PaymentInfo {
            transaction_id: state.next_id("TXN"),
            payment_status: Some(payment_status.to_string()),
            pending_reason: Some(pending_reason),
        }))
    }

    async fn do_capture(
        &self,
        request: DoCaptureRequest,
    ) -> Result<RemoteResponse<CaptureInfo>, TransportError> {
        let mut state = self.state();
        if let Some(errors) = state.receive(RecordedCall::DoCapture(request))? {
            return Ok(RemoteResponse::failure(errors));
        }
        Ok(RemoteResponse::success(CaptureInfo {
            transaction_id: state.next_id("CAP"),
        }))
    }

    async fn do_void(
        &self,
        request: DoVoidRequest,
    ) -> Result<RemoteResponse<VoidInfo>, TransportError> {
        let mut state = self.state();
        let authorization_id = request.authorization_id.clone();
        if let Some(errors) = state.receive(RecordedCall::DoVoid(request))? {
            return Ok(RemoteResponse::failure(errors));
        }
        Ok(RemoteResponse::success(VoidInfo { authorization_id }))
    }

    async fn refund_transaction(
        &self,
        request: RefundTransactionRequest,
    ) -> Result<RemoteResponse<RefundInfo>, TransportError> {
        let mut state = self.state();
        if let Some(errors) = state.receive(RecordedCall::RefundTransaction(request))? {
            return Ok(RemoteResponse::failure(errors));
        }
        Ok(RemoteResponse::success(RefundInfo {
            refund_transaction_id: state.next_id("REF"),
        }))
    }

    fn express_checkout_url(&self, token: &str) -> String {
        match Url::parse(SANDBOX_CHECKOUT) {
            Ok(base) => express_checkout_url(&base, token),
            Err(_) => format!("{SANDBOX_CHECKOUT}?token={token}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Currency;
    use rust_decimal_macros::dec;

    fn usd(value: rust_decimal::Decimal) -> Amount {
        Amount::new(Currency::usd(), value)
    }

    fn settle_request(token: &str, action: PaymentAction) -> DoExpressCheckoutPaymentRequest {
        DoExpressCheckoutPaymentRequest {
            payment_action: action,
            token: token.to_string(),
            payer_id: "PAYER".to_string(),
            order_total: usd(dec!(10.00)),
            notify_url: None,
        }
    }

    #[tokio::test]
    async fn test_registered_session_reports_details() {
        let provider = InMemoryExpressCheckout::new();
        provider.register_session("EC-1", usd(dec!(50.00)));

        let details = provider
            .get_express_checkout_details("EC-1")
            .await
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(details.order_total, usd(dec!(50.00)));

        let unknown = provider.get_express_checkout_details("EC-X").await.unwrap();
        assert_eq!(unknown.into_result().unwrap_err().message(), "Invalid token.");
    }

    #[tokio::test]
    async fn test_default_pending_reason_follows_action() {
        let provider = InMemoryExpressCheckout::new();
        provider.register_session("EC-1", usd(dec!(10.00)));

        let auth = provider
            .do_express_checkout_payment(settle_request("EC-1", PaymentAction::Authorization))
            .await
            .unwrap()
            .into_result()
            .unwrap();
        assert!(auth.is_pending_authorization());

        let sale = provider
            .do_express_checkout_payment(settle_request("EC-1", PaymentAction::Sale))
            .await
            .unwrap()
            .into_result()
            .unwrap();
        assert!(!sale.is_pending_authorization());
        assert_eq!(sale.payment_status.as_deref(), Some("Completed"));
        assert_ne!(auth.transaction_id, sale.transaction_id);
    }

    #[tokio::test]
    async fn test_scripted_rejection_applies_once() {
        let provider = InMemoryExpressCheckout::new();
        provider.reject_next(Operation::DoCapture, &["Insufficient funds", "Card declined"]);

        let request = DoCaptureRequest {
            authorization_id: "AUTH-1".to_string(),
            amount: usd(dec!(5.00)),
            complete: true,
        };
        let first = provider.do_capture(request.clone()).await.unwrap();
        assert_eq!(
            first.into_result().unwrap_err().message(),
            "Insufficient funds Card declined"
        );

        let second = provider.do_capture(request).await.unwrap();
        assert!(second.is_success());
        assert_eq!(provider.call_count(Operation::DoCapture), 2);
    }

    #[tokio::test]
    async fn test_scripted_transport_fault() {
        let provider = InMemoryExpressCheckout::new();
        provider.fail_transport_next(Operation::DoVoid);

        let result = provider
            .do_void(DoVoidRequest {
                authorization_id: "AUTH-1".to_string(),
            })
            .await;
        assert!(matches!(result, Err(TransportError::Unavailable(_))));
        assert_eq!(provider.recorded().len(), 1);
    }
}
