//! Gateway adapter: host payment operations on top of the remote client.

use std::future::Future;
use std::time::Instant;

use chrono::Utc;
use common::Money;
use domain::{CheckoutSession, Payment, RefundType};
use rust_decimal::Decimal;
use store::CheckoutStore;

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::outcome::PaymentOutcome;
use crate::remote::{
    Amount, DoCaptureRequest, DoExpressCheckoutPaymentRequest, DoVoidRequest, ExpressCheckoutApi,
    ExpressCheckoutDetails, Operation, PaymentAction, RefundTransactionRequest, RemoteRejection,
    RemoteResponse, SetExpressCheckoutRequest, TransportError,
};

/// A provider session started for an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedCheckout {
    pub token: String,
    /// Hosted checkout page the buyer is sent to.
    pub redirect_url: String,
}

/// Translates host payment operations into remote calls against a
/// [`CheckoutSession`].
///
/// Settlement operations return a [`PaymentOutcome`]: a negative provider
/// answer is `Ok` with `success == false` and leaves the session untouched.
/// Transport faults and precondition violations are returned as errors.
/// Nothing is retried. Successful mutations are persisted through the store.
pub struct GatewayAdapter<C, S>
where
    C: ExpressCheckoutApi,
    S: CheckoutStore,
{
    config: GatewayConfig,
    client: C,
    store: S,
}

impl<C, S> GatewayAdapter<C, S>
where
    C: ExpressCheckoutApi,
    S: CheckoutStore,
{
    pub fn new(config: GatewayConfig, client: C, store: S) -> Self {
        Self {
            config,
            client,
            store,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Starts a provider session and returns its token and redirect URL.
    #[tracing::instrument(skip(self, request), fields(invoice = %request.invoice_id))]
    pub async fn start_checkout(
        &self,
        request: SetExpressCheckoutRequest,
    ) -> Result<StartedCheckout, GatewayError> {
        let operation = Operation::SetExpressCheckout;
        let response = self
            .send(operation, self.client.set_express_checkout(request))
            .await?
            .map_err(|rejection| rejected(operation, &rejection))?;

        let redirect_url = self.client.express_checkout_url(&response.token);
        metrics::counter!("checkout_sessions_started_total").increment(1);
        tracing::info!(token = %response.token, "express checkout session started");

        Ok(StartedCheckout {
            token: response.token,
            redirect_url,
        })
    }

    /// Reserves `amount` (minor units) without capturing it.
    pub async fn authorize(
        &self,
        amount: Money,
        session: &mut CheckoutSession,
    ) -> Result<PaymentOutcome, GatewayError> {
        self.do_express_checkout_payment(amount, session, PaymentAction::Authorization)
            .await
    }

    /// Authorizes and captures `amount` (minor units) in one step.
    pub async fn purchase(
        &self,
        amount: Money,
        session: &mut CheckoutSession,
    ) -> Result<PaymentOutcome, GatewayError> {
        self.do_express_checkout_payment(amount, session, PaymentAction::Sale)
            .await
    }

    /// Captures a previous authorization. `amount` is in major units.
    #[tracing::instrument(skip(self, session), fields(token = %session.token()))]
    pub async fn capture(
        &self,
        amount: Decimal,
        session: &mut CheckoutSession,
    ) -> Result<PaymentOutcome, GatewayError> {
        let Some(authorization_id) = session.authorization_id.clone().filter(|_| session.is_authorized())
        else {
            return Err(GatewayError::PreconditionViolation(
                "capture requires a prior authorization".to_string(),
            ));
        };

        let details = match self.express_checkout_details(session.token()).await? {
            Ok(details) => details,
            Err(outcome) => return Ok(outcome),
        };

        let request = DoCaptureRequest {
            authorization_id,
            amount: Amount::new(details.order_total.currency, amount),
            complete: true,
        };

        match self
            .send(Operation::DoCapture, self.client.do_capture(request))
            .await?
        {
            Ok(info) => {
                session.record_transaction(info.transaction_id);
                self.store.save_session(session).await?;
                tracing::info!(transaction_id = ?session.transaction_id, "authorization captured");
                Ok(PaymentOutcome::success())
            }
            Err(rejection) => Ok(PaymentOutcome::failure(rejection.message())),
        }
    }

    /// Voids a previous authorization. The session itself is not changed.
    #[tracing::instrument(skip(self, session), fields(token = %session.token()))]
    pub async fn void(&self, session: &CheckoutSession) -> Result<PaymentOutcome, GatewayError> {
        let Some(authorization_id) = session.authorization_id.clone().filter(|_| session.is_authorized())
        else {
            return Err(GatewayError::PreconditionViolation(
                "void requires a prior authorization".to_string(),
            ));
        };

        let request = DoVoidRequest { authorization_id };
        match self
            .send(Operation::DoVoid, self.client.do_void(request))
            .await?
        {
            Ok(info) => {
                tracing::info!(authorization_id = %info.authorization_id, "authorization voided");
                Ok(PaymentOutcome::success())
            }
            Err(rejection) => Ok(PaymentOutcome::failure(rejection.message())),
        }
    }

    /// Refunds `amount` (major units) of a captured payment.
    ///
    /// `amount` is rounded half away from zero to cents. The refund is `Full`
    /// when the rounded amount equals the payment amount and `Partial`
    /// otherwise. An already refunded session is forwarded as is;
    /// callers check [`CheckoutSession::is_refunded`] first.
    #[tracing::instrument(skip(self, payment, session), fields(payment_id = %payment.id, token = %session.token()))]
    pub async fn refund(
        &self,
        payment: &Payment,
        amount: Decimal,
        session: &mut CheckoutSession,
    ) -> Result<PaymentOutcome, GatewayError> {
        let Some(transaction_id) = session.transaction_id.clone() else {
            return Err(GatewayError::PreconditionViolation(
                "refund requires a captured transaction".to_string(),
            ));
        };

        // Classify on the cent amount that goes on the wire.
        let Some(amount) = Money::from_decimal(amount) else {
            return Err(GatewayError::PreconditionViolation(format!(
                "refund amount {amount} is out of range"
            )));
        };
        let refund_type = if payment.amount == amount {
            RefundType::Full
        } else {
            RefundType::Partial
        };

        let request = RefundTransactionRequest {
            transaction_id,
            refund_type,
            amount: Amount::new(payment.currency.clone(), amount.to_decimal()),
        };

        match self
            .send(
                Operation::RefundTransaction,
                self.client.refund_transaction(request),
            )
            .await?
        {
            Ok(info) => {
                session.record_refund(info.refund_transaction_id, refund_type, Utc::now());
                self.store.save_session(session).await?;
                tracing::info!(%refund_type, "payment refunded");
                Ok(PaymentOutcome::success())
            }
            Err(rejection) => Ok(PaymentOutcome::failure(rejection.message())),
        }
    }

    #[tracing::instrument(skip(self, session), fields(token = %session.token()))]
    async fn do_express_checkout_payment(
        &self,
        amount: Money,
        session: &mut CheckoutSession,
        action: PaymentAction,
    ) -> Result<PaymentOutcome, GatewayError> {
        let details = match self.express_checkout_details(session.token()).await? {
            Ok(details) => details,
            Err(outcome) => return Ok(outcome),
        };

        let request = DoExpressCheckoutPaymentRequest {
            payment_action: action,
            token: session.token().to_string(),
            payer_id: session.payer_id().to_string(),
            order_total: Amount::new(details.order_total.currency, amount.to_decimal()),
            notify_url: details.notify_url,
        };

        match self
            .send(
                Operation::DoExpressCheckoutPayment,
                self.client.do_express_checkout_payment(request),
            )
            .await?
        {
            Ok(info) => {
                if info.is_pending_authorization() {
                    session.record_authorization(info.transaction_id);
                } else {
                    session.record_transaction(info.transaction_id);
                }
                self.store.save_session(session).await?;
                tracing::info!(
                    %action,
                    authorization_id = ?session.authorization_id,
                    transaction_id = ?session.transaction_id,
                    "express checkout settled"
                );
                Ok(PaymentOutcome::success())
            }
            Err(rejection) => Ok(PaymentOutcome::failure(rejection.message())),
        }
    }

    /// Fetches session details, turning a rejection into a failed outcome.
    async fn express_checkout_details(
        &self,
        token: &str,
    ) -> Result<Result<ExpressCheckoutDetails, PaymentOutcome>, GatewayError> {
        Ok(self
            .send(
                Operation::GetExpressCheckoutDetails,
                self.client.get_express_checkout_details(token),
            )
            .await?
            .map_err(|rejection| PaymentOutcome::failure(rejection.message())))
    }

    /// Awaits one remote call, recording metrics and logging failures.
    ///
    /// The outer result is a transport fault, the inner one a provider rejection.
    async fn send<T>(
        &self,
        operation: Operation,
        call: impl Future<Output = Result<RemoteResponse<T>, TransportError>>,
    ) -> Result<Result<T, RemoteRejection>, GatewayError> {
        let op = operation.as_str();
        metrics::counter!("gateway_requests_total", "operation" => op).increment(1);
        let started = Instant::now();

        let result = call.await;
        metrics::histogram!("gateway_request_duration_seconds", "operation" => op)
            .record(started.elapsed().as_secs_f64());

        match result {
            Ok(response) => {
                let response = response.into_result();
                if let Err(rejection) = &response {
                    metrics::counter!("gateway_rejections_total", "operation" => op).increment(1);
                    tracing::warn!(
                        %operation,
                        ack = rejection.ack.as_str(),
                        message = %rejection.message(),
                        "provider rejected request"
                    );
                }
                Ok(response)
            }
            Err(source) => {
                metrics::counter!("gateway_transport_faults_total", "operation" => op).increment(1);
                tracing::error!(%operation, error = %source, "provider transport fault");
                Err(GatewayError::transport(operation, source))
            }
        }
    }
}

fn rejected(operation: Operation, rejection: &RemoteRejection) -> GatewayError {
    GatewayError::ProviderRejected {
        operation,
        message: rejection.message(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{InMemoryExpressCheckout, PaymentDetails, RecordedCall};
    use common::{BusinessEntityId, Currency};
    use rust_decimal_macros::dec;
    use store::InMemoryCheckoutStore;

    fn minimal_request() -> SetExpressCheckoutRequest {
        SetExpressCheckoutRequest {
            invoice_id: "R100".to_string(),
            return_url: "http://shop.test/paypal/confirm".to_string(),
            cancel_url: "http://shop.test/paypal/cancel".to_string(),
            solution_type: "Mark".to_string(),
            landing_page: "Billing".to_string(),
            header_image: String::new(),
            no_shipping: true,
            payment_details: PaymentDetails {
                order_total: Amount::new(Currency::usd(), dec!(10.00)),
                item_total: None,
                shipping_total: None,
                tax_total: None,
                ship_to: None,
                items: Vec::new(),
                payment_action: PaymentAction::Sale,
            },
        }
    }

    fn adapter() -> GatewayAdapter<InMemoryExpressCheckout, InMemoryCheckoutStore> {
        GatewayAdapter::new(
            GatewayConfig::sandbox(BusinessEntityId::new("acme")),
            InMemoryExpressCheckout::new(),
            InMemoryCheckoutStore::new(),
        )
    }

    #[tokio::test]
    async fn test_authorize_uses_the_session_currency() {
        let adapter = adapter();
        adapter
            .client()
            .register_session("EC-1", Amount::new(Currency::new("EUR"), dec!(25.00)));
        let mut session = CheckoutSession::new("EC-1", "PAYER-1");

        let outcome = adapter
            .authorize(Money::from_cents(2500), &mut session)
            .await
            .unwrap();
        assert!(outcome.is_success());

        let calls = adapter.client().recorded();
        let Some(RecordedCall::DoExpressCheckoutPayment(request)) = calls.last() else {
            panic!("expected a settlement call, got {calls:?}");
        };
        assert_eq!(request.order_total.currency.code(), "EUR");
        assert_eq!(request.payer_id, "PAYER-1");
        assert_eq!(request.payment_action, PaymentAction::Authorization);
    }

    #[tokio::test]
    async fn test_details_rejection_short_circuits_settlement() {
        let adapter = adapter();
        let mut session = CheckoutSession::new("EC-unknown", "PAYER-1");

        let outcome = adapter
            .purchase(Money::from_cents(100), &mut session)
            .await
            .unwrap();
        assert_eq!(outcome.error_message.as_deref(), Some("Invalid token."));
        assert_eq!(
            adapter.client().call_count(Operation::DoExpressCheckoutPayment),
            0
        );
    }

    #[tokio::test]
    async fn test_void_requires_authorization() {
        let adapter = adapter();
        let session = CheckoutSession::new("EC-1", "PAYER-1");

        let result = adapter.void(&session).await;
        assert!(matches!(result, Err(GatewayError::PreconditionViolation(_))));
        assert!(adapter.client().recorded().is_empty());
    }

    #[tokio::test]
    async fn test_start_checkout_returns_redirect() {
        let adapter = adapter();
        let started = adapter.start_checkout(minimal_request()).await.unwrap();
        assert_eq!(started.token, "EC-0001");
        assert!(started.redirect_url.contains("token=EC-0001"));
        assert!(started.redirect_url.contains("useraction=commit"));
    }

    #[tokio::test]
    async fn test_start_checkout_rejection_is_an_error() {
        let adapter = adapter();
        adapter
            .client()
            .reject_next(Operation::SetExpressCheckout, &["Invalid amount"]);

        let err = adapter
            .start_checkout(minimal_request())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::ProviderRejected { ref message, .. } if message == "Invalid amount"
        ));
    }
}
