//! Host order pipeline: moves orders and payments through their states by
//! driving the gateway adapter.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::RecordId;
use domain::{CheckoutSession, DomainError, Order, PaymentState};
use rust_decimal::Decimal;
use store::{CheckoutStore, CheckoutStoreExt, StoreError};
use thiserror::Error;

use crate::adapter::GatewayAdapter;
use crate::error::GatewayError;
use crate::remote::{ExpressCheckoutApi, Operation};

/// Errors raised while advancing an order or processing its payments.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

impl PipelineError {
    /// The provider's joined messages when the provider said no.
    pub fn rejection_message(&self) -> Option<&str> {
        match self {
            PipelineError::Gateway(GatewayError::ProviderRejected { message, .. }) => Some(message),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, PipelineError::Gateway(e) if e.is_transport())
    }
}

/// Order and payment state transitions owned by the host platform.
///
/// Every method persists the order before returning, on success and on
/// payment failure alike.
#[async_trait]
pub trait OrderPipeline: Send + Sync {
    /// Processes every unprocessed payment, then completes the order once
    /// the funds held cover its total.
    async fn advance(&self, order: &mut Order) -> Result<(), PipelineError>;

    /// Settles one payment through the gateway.
    async fn process_payment(&self, order: &mut Order, payment_id: RecordId)
    -> Result<(), PipelineError>;

    /// Captures an authorized payment for its full amount.
    async fn capture_payment(&self, order: &mut Order, payment_id: RecordId)
    -> Result<(), PipelineError>;

    /// Voids an authorized payment.
    async fn void_payment(&self, order: &mut Order, payment_id: RecordId)
    -> Result<(), PipelineError>;

    /// Refunds `amount` (major units) of a captured payment and returns the
    /// updated checkout session.
    async fn refund_payment(
        &self,
        order: &mut Order,
        payment_id: RecordId,
        amount: Decimal,
    ) -> Result<CheckoutSession, PipelineError>;
}

/// Default [`OrderPipeline`] backed by a [`GatewayAdapter`].
pub struct PaymentPipeline<C, S>
where
    C: ExpressCheckoutApi,
    S: CheckoutStore,
{
    adapter: Arc<GatewayAdapter<C, S>>,
}

impl<C, S> Clone for PaymentPipeline<C, S>
where
    C: ExpressCheckoutApi,
    S: CheckoutStore,
{
    fn clone(&self) -> Self {
        Self {
            adapter: Arc::clone(&self.adapter),
        }
    }
}

impl<C, S> PaymentPipeline<C, S>
where
    C: ExpressCheckoutApi,
    S: CheckoutStore,
{
    pub fn new(adapter: Arc<GatewayAdapter<C, S>>) -> Self {
        Self { adapter }
    }

    pub fn adapter(&self) -> &GatewayAdapter<C, S> {
        &self.adapter
    }

    async fn session_for(&self, order: &Order, payment_id: RecordId) -> Result<CheckoutSession, PipelineError> {
        let source_id = order.payment(payment_id)?.source_id;
        Ok(self.adapter.store().require_session(source_id).await?)
    }

    /// Marks the payment failed and persists the order.
    async fn fail_payment(&self, order: &mut Order, payment_id: RecordId) -> Result<(), PipelineError> {
        order.payment_mut(payment_id)?.mark_failed()?;
        self.adapter.store().save_order(order).await?;
        Ok(())
    }
}

#[async_trait]
impl<C, S> OrderPipeline for PaymentPipeline<C, S>
where
    C: ExpressCheckoutApi,
    S: CheckoutStore,
{
    #[tracing::instrument(skip(self, order), fields(order = %order.number))]
    async fn advance(&self, order: &mut Order) -> Result<(), PipelineError> {
        if !order.state.can_complete() {
            return Err(DomainError::InvalidOrderTransition {
                current_state: order.state,
                action: "advance",
            }
            .into());
        }

        for payment_id in order.unprocessed_payment_ids() {
            self.process_payment(order, payment_id).await?;
        }

        if !order.outstanding_balance().is_positive() {
            order.complete(Utc::now())?;
            tracing::info!(total = %order.total(), "order completed");
        }

        self.adapter.store().save_order(order).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, order), fields(order = %order.number))]
    async fn process_payment(&self, order: &mut Order, payment_id: RecordId) -> Result<(), PipelineError> {
        let mut session = self.session_for(order, payment_id).await?;

        let payment = order.payment_mut(payment_id)?;
        payment.start_processing()?;
        let amount = payment.amount;

        let result = if self.adapter.config().auto_capture() {
            self.adapter.purchase(amount, &mut session).await
        } else {
            self.adapter.authorize(amount, &mut session).await
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                self.fail_payment(order, payment_id).await?;
                return Err(e.into());
            }
        };

        if !outcome.is_success() {
            self.fail_payment(order, payment_id).await?;
            outcome.into_result(Operation::DoExpressCheckoutPayment)?;
        }

        let payment = order.payment_mut(payment_id)?;
        if session.is_authorized() {
            payment.mark_authorized()?;
        } else {
            payment.mark_completed()?;
        }
        tracing::info!(%payment_id, state = %payment.state, "payment processed");

        self.adapter.store().save_order(order).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, order), fields(order = %order.number))]
    async fn capture_payment(&self, order: &mut Order, payment_id: RecordId) -> Result<(), PipelineError> {
        let mut session = self.session_for(order, payment_id).await?;
        let payment = order.payment(payment_id)?;
        if !session.can_capture(payment) {
            return Err(GatewayError::PreconditionViolation(format!(
                "payment {payment_id} in state {} cannot be captured",
                payment.state
            ))
            .into());
        }

        let amount = payment.amount.to_decimal();
        self.adapter
            .capture(amount, &mut session)
            .await?
            .into_result(Operation::DoCapture)?;

        order.payment_mut(payment_id)?.mark_completed()?;
        self.adapter.store().save_order(order).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, order), fields(order = %order.number))]
    async fn void_payment(&self, order: &mut Order, payment_id: RecordId) -> Result<(), PipelineError> {
        let session = self.session_for(order, payment_id).await?;
        let payment = order.payment(payment_id)?;
        if payment.state == PaymentState::Void {
            return Err(GatewayError::PreconditionViolation(format!(
                "payment {payment_id} is already void"
            ))
            .into());
        }

        self.adapter
            .void(&session)
            .await?
            .into_result(Operation::DoVoid)?;

        order.payment_mut(payment_id)?.mark_void()?;
        self.adapter.store().save_order(order).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, order), fields(order = %order.number))]
    async fn refund_payment(
        &self,
        order: &mut Order,
        payment_id: RecordId,
        amount: Decimal,
    ) -> Result<CheckoutSession, PipelineError> {
        let mut session = self.session_for(order, payment_id).await?;
        if session.is_refunded() {
            return Err(GatewayError::PreconditionViolation(format!(
                "payment {payment_id} has already been refunded"
            ))
            .into());
        }

        let payment = order.payment(payment_id)?;
        self.adapter
            .refund(payment, amount, &mut session)
            .await?
            .into_result(Operation::RefundTransaction)?;

        Ok(session)
    }
}
