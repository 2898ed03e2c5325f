//! The three buyer-facing checkout steps: initiate, confirm and cancel.

use std::sync::{Arc, OnceLock};

use common::{Money, RecordId};
use domain::{CheckoutSession, DomainError, Order, Payment, PaymentState};
use store::{CheckoutStore, CheckoutStoreExt, StoreError};
use thiserror::Error;
use url::form_urlencoded;

use super::request::{CheckoutUrls, build_set_express_checkout};
use crate::adapter::GatewayAdapter;
use crate::error::GatewayError;
use crate::pipeline::{OrderPipeline, PipelineError};
use crate::remote::ExpressCheckoutApi;

pub const ORDER_PROCESSED_NOTICE: &str = "Your order has been processed successfully";
pub const PAYMENT_ADDED_NOTICE: &str = "Payment successfully added";
pub const CONNECTION_FAILED_ERROR: &str = "Could not connect to PayPal. Please try again.";
pub const PAYMENT_FAILED_ERROR: &str =
    "This PayPal payment has already failed. Please choose another payment method.";

/// Buyer-facing message for a provider rejection.
pub fn checkout_failed_message(reasons: &str) -> String {
    format!("PayPal checkout failed: {reasons}")
}

/// Where to send the buyer next, with an optional flash message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowRedirect {
    pub location: String,
    pub notice: Option<String>,
    pub error: Option<String>,
}

impl FlowRedirect {
    pub fn to(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            notice: None,
            error: None,
        }
    }

    pub fn with_notice(mut self, notice: impl Into<String>) -> Self {
        self.notice = Some(notice.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Errors that stop a checkout step before it can redirect the buyer.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Access to order {0} denied")]
    Forbidden(String),

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Gateway error: {0}")]
    Gateway(GatewayError),

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for FlowError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::OrderNotFound(number) => FlowError::OrderNotFound(number),
            other => FlowError::Store(other),
        }
    }
}

impl From<GatewayError> for FlowError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Store(e) => e.into(),
            other => FlowError::Gateway(other),
        }
    }
}

/// Amount charged by one confirm request.
///
/// Computed from the order the first time it is asked for and returned
/// unchanged afterwards, even if the order's held funds change meanwhile.
#[derive(Debug, Default)]
pub struct ConfirmTotal {
    amount: OnceLock<Money>,
}

impl ConfirmTotal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn amount(&self, order: &Order) -> Money {
        *self.amount.get_or_init(|| order.outstanding_balance())
    }
}

/// `/checkout/{state}`
pub fn checkout_state_path(order: &Order) -> String {
    format!("/checkout/{}", order.state)
}

/// `/orders/{number}?token={guest_token}`
pub fn completion_path(order: &Order) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("token", &order.guest_token)
        .finish();
    format!("/orders/{}?{query}", order.number)
}

const PAYMENT_STEP_PATH: &str = "/checkout/payment";

/// Drives the express-checkout steps for one gateway.
pub struct CheckoutFlow<C, S, P>
where
    C: ExpressCheckoutApi,
    S: CheckoutStore,
    P: OrderPipeline,
{
    adapter: Arc<GatewayAdapter<C, S>>,
    pipeline: P,
    urls: CheckoutUrls,
}

impl<C, S, P> CheckoutFlow<C, S, P>
where
    C: ExpressCheckoutApi,
    S: CheckoutStore,
    P: OrderPipeline,
{
    pub fn new(adapter: Arc<GatewayAdapter<C, S>>, pipeline: P, urls: CheckoutUrls) -> Self {
        Self {
            adapter,
            pipeline,
            urls,
        }
    }

    pub fn adapter(&self) -> &GatewayAdapter<C, S> {
        &self.adapter
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    fn store(&self) -> &S {
        self.adapter.store()
    }

    /// Loads an order the caller holds the guest token for.
    pub async fn load_order(&self, number: &str, access_token: Option<&str>) -> Result<Order, FlowError> {
        let order = self.store().require_order(number).await?;
        if access_token != Some(order.guest_token.as_str()) {
            tracing::warn!(order = %number, "order access denied");
            return Err(FlowError::Forbidden(number.to_string()));
        }
        Ok(order)
    }

    /// Starts a provider session and redirects the buyer to it.
    ///
    /// Provider rejections and transport faults send the buyer back to the
    /// payment step with an error message.
    #[tracing::instrument(skip(self, access_token))]
    pub async fn initiate(
        &self,
        number: &str,
        access_token: Option<&str>,
        payment_method_id: i64,
    ) -> Result<FlowRedirect, FlowError> {
        let order = self.load_order(number, access_token).await?;
        let request =
            build_set_express_checkout(&order, self.adapter.config(), &self.urls, payment_method_id);

        match self.adapter.start_checkout(request).await {
            Ok(started) => Ok(FlowRedirect::to(started.redirect_url)),
            Err(GatewayError::ProviderRejected { message, .. }) => {
                tracing::error!(order = %order.number, reasons = %message, "express checkout rejected");
                Ok(FlowRedirect::to(PAYMENT_STEP_PATH).with_error(checkout_failed_message(&message)))
            }
            Err(err @ GatewayError::Transport { .. }) => {
                tracing::error!(order = %order.number, error = %err, "express checkout unreachable");
                Ok(FlowRedirect::to(PAYMENT_STEP_PATH).with_error(CONNECTION_FAILED_ERROR))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Records the buyer's approval as a payment and settles it.
    ///
    /// A repeated confirm for a token that already has a session reuses the
    /// session and its payment instead of creating new ones.
    #[tracing::instrument(skip(self, access_token, payer_id))]
    pub async fn confirm(
        &self,
        number: &str,
        access_token: Option<&str>,
        token: &str,
        payer_id: &str,
        payment_method_id: i64,
    ) -> Result<FlowRedirect, FlowError> {
        let mut order = self.load_order(number, access_token).await?;
        let total = ConfirmTotal::new();

        let existing = self.store().find_session_by_token(token).await?;
        let reused = existing.as_ref().and_then(|session| {
            order
                .payments
                .iter()
                .find(|p| p.source_id == session.id)
                .map(|p| p.id)
        });

        let payment_id = match (reused, existing) {
            (Some(payment_id), _) => {
                tracing::info!(order = %order.number, %payment_id, "confirm retried, reusing payment");
                payment_id
            }
            (None, existing) => {
                let session = match existing {
                    Some(session) => session,
                    None => {
                        let session = CheckoutSession::new(token, payer_id);
                        self.store().save_session(&session).await?;
                        session
                    }
                };

                let payment = Payment::new(
                    total.amount(&order),
                    order.currency.clone(),
                    session.id,
                    payment_method_id,
                );
                let payment_id = payment.id;
                order.add_payment(payment)?;
                self.store().save_order(&order).await?;
                payment_id
            }
        };
        metrics::counter!("checkout_confirmations_total").increment(1);

        let already_completed = order.is_completed();
        let result = if already_completed {
            self.pipeline.process_payment(&mut order, payment_id).await
        } else if order.unprocessed_payment_ids().contains(&payment_id) {
            self.pipeline.advance(&mut order).await
        } else {
            Ok(())
        };

        if let Err(err) = result {
            return Ok(self.pipeline_failed(&order, payment_id, total.amount(&order), err));
        }

        if order.is_completed() {
            let notice = if already_completed {
                PAYMENT_ADDED_NOTICE
            } else {
                ORDER_PROCESSED_NOTICE
            };
            Ok(FlowRedirect::to(completion_path(&order)).with_notice(notice))
        } else if order
            .payment(payment_id)
            .is_ok_and(|p| p.state == PaymentState::Failed)
        {
            tracing::warn!(order = %order.number, %payment_id, "confirm retried for a failed payment");
            Ok(FlowRedirect::to(PAYMENT_STEP_PATH).with_error(PAYMENT_FAILED_ERROR))
        } else {
            Ok(FlowRedirect::to(checkout_state_path(&order)))
        }
    }

    /// Sends the buyer back to checkout without settling anything.
    #[tracing::instrument(skip(self, access_token))]
    pub async fn cancel(
        &self,
        number: &str,
        access_token: Option<&str>,
        token: Option<&str>,
    ) -> Result<FlowRedirect, FlowError> {
        let order = self.load_order(number, access_token).await?;
        let mut location = checkout_state_path(&order);
        if let Some(token) = token {
            let query = form_urlencoded::Serializer::new(String::new())
                .append_pair("paypal_cancel_token", token)
                .finish();
            location = format!("{location}?{query}");
        }
        tracing::info!(order = %order.number, "express checkout cancelled");
        Ok(FlowRedirect::to(location))
    }

    /// Reports a pipeline failure after the payment was persisted.
    fn pipeline_failed(
        &self,
        order: &Order,
        payment_id: RecordId,
        amount: Money,
        err: PipelineError,
    ) -> FlowRedirect {
        metrics::counter!("checkout_pipeline_faults_total").increment(1);
        tracing::error!(
            order = %order.number,
            %payment_id,
            %amount,
            order_state = %order.state,
            error = %err,
            "order pipeline failed after payment was recorded"
        );

        let message = if let Some(reasons) = err.rejection_message() {
            checkout_failed_message(reasons)
        } else if err.is_transport() {
            CONNECTION_FAILED_ERROR.to_string()
        } else {
            checkout_failed_message(&err.to_string())
        };
        FlowRedirect::to(PAYMENT_STEP_PATH).with_error(message)
    }
}
