//! Back-office payment actions: refund, capture and void.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::RecordId;
use domain::{CheckoutSession, Payment};
use gateway::{ExpressCheckoutApi, OrderPipeline};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use store::{CheckoutStore, CheckoutStoreExt};

use crate::error::ApiError;
use crate::state::AppState;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct RefundRequest {
    /// Major units, e.g. `"10.00"`.
    pub refund_amount: Decimal,
}

// -- Response types --

/// What the refund form needs to offer a refund.
#[derive(Debug, Serialize)]
pub struct RefundFormResponse {
    pub order_number: String,
    pub payment_id: RecordId,
    pub amount: Decimal,
    pub currency: String,
    pub transaction_id: Option<String>,
}

// -- Handlers --

/// GET /admin/orders/{number}/payments/{id}/paypal_refund: refund form data.
///
/// Answers 409 when the session was already refunded.
#[tracing::instrument(skip(state))]
pub async fn refund_form<C: ExpressCheckoutApi + 'static, S: CheckoutStore + 'static>(
    State(state): State<Arc<AppState<C, S>>>,
    Path((number, payment_id)): Path<(String, String)>,
) -> Result<Json<RefundFormResponse>, ApiError> {
    let payment_id = parse_record_id(&payment_id)?;
    let order = state.store().require_order(&number).await?;
    let payment = order.payment(payment_id)?;
    let session = state.store().require_session(payment.source_id).await?;

    if session.is_refunded() {
        return Err(ApiError::Conflict(format!(
            "Payment {payment_id} has already been refunded"
        )));
    }

    Ok(Json(RefundFormResponse {
        order_number: order.number.clone(),
        payment_id,
        amount: payment.amount.to_decimal(),
        currency: payment.currency.code().to_string(),
        transaction_id: session.transaction_id.clone(),
    }))
}

/// POST /admin/orders/{number}/payments/{id}/paypal_refund: refund a payment.
#[tracing::instrument(skip(state, req))]
pub async fn refund<C: ExpressCheckoutApi + 'static, S: CheckoutStore + 'static>(
    State(state): State<Arc<AppState<C, S>>>,
    Path((number, payment_id)): Path<(String, String)>,
    Json(req): Json<RefundRequest>,
) -> Result<Json<CheckoutSession>, ApiError> {
    let payment_id = parse_record_id(&payment_id)?;
    if req.refund_amount <= Decimal::ZERO {
        return Err(ApiError::BadRequest(format!(
            "Refund amount must be positive, got {}",
            req.refund_amount
        )));
    }
    if req.refund_amount.scale() > 2 {
        return Err(ApiError::BadRequest(format!(
            "Refund amount must have at most two decimal places, got {}",
            req.refund_amount
        )));
    }

    let mut order = state.store().require_order(&number).await?;
    let session = state
        .pipeline()
        .refund_payment(&mut order, payment_id, req.refund_amount)
        .await?;

    metrics::counter!("admin_payment_actions_total", "action" => "refund").increment(1);
    tracing::info!(order = %number, %payment_id, amount = %req.refund_amount, "payment refunded");
    Ok(Json(session))
}

/// POST /admin/orders/{number}/payments/{id}/capture: capture an authorization.
#[tracing::instrument(skip(state))]
pub async fn capture<C: ExpressCheckoutApi + 'static, S: CheckoutStore + 'static>(
    State(state): State<Arc<AppState<C, S>>>,
    Path((number, payment_id)): Path<(String, String)>,
) -> Result<Json<Payment>, ApiError> {
    let payment_id = parse_record_id(&payment_id)?;
    let mut order = state.store().require_order(&number).await?;

    state
        .pipeline()
        .capture_payment(&mut order, payment_id)
        .await?;

    metrics::counter!("admin_payment_actions_total", "action" => "capture").increment(1);
    Ok(Json(order.payment(payment_id)?.clone()))
}

/// POST /admin/orders/{number}/payments/{id}/void: release an authorization.
#[tracing::instrument(skip(state))]
pub async fn void<C: ExpressCheckoutApi + 'static, S: CheckoutStore + 'static>(
    State(state): State<Arc<AppState<C, S>>>,
    Path((number, payment_id)): Path<(String, String)>,
) -> Result<Json<Payment>, ApiError> {
    let payment_id = parse_record_id(&payment_id)?;
    let mut order = state.store().require_order(&number).await?;

    state.pipeline().void_payment(&mut order, payment_id).await?;

    metrics::counter!("admin_payment_actions_total", "action" => "void").increment(1);
    Ok(Json(order.payment(payment_id)?.clone()))
}

fn parse_record_id(id: &str) -> Result<RecordId, ApiError> {
    id.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))
}
