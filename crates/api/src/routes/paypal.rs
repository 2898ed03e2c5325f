//! Buyer-facing express-checkout endpoints.
//!
//! Every step answers with `303 See Other`. Flash messages travel in the
//! `x-flash-notice` and `x-flash-error` headers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header::LOCATION;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use gateway::{ExpressCheckoutApi, FlowRedirect};
use serde::Deserialize;
use store::CheckoutStore;

use crate::error::ApiError;
use crate::state::AppState;

pub const FLASH_NOTICE: &str = "x-flash-notice";
pub const FLASH_ERROR: &str = "x-flash-error";

/// A checkout redirect rendered as an HTTP response.
#[derive(Debug)]
pub struct RedirectResponse(pub FlowRedirect);

impl IntoResponse for RedirectResponse {
    fn into_response(self) -> Response {
        let FlowRedirect {
            location,
            notice,
            error,
        } = self.0;

        let Ok(location) = HeaderValue::from_str(&location) else {
            tracing::error!(%location, "redirect target is not a valid header value");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        };

        let mut response = (StatusCode::SEE_OTHER, [(LOCATION, location)]).into_response();
        for (name, message) in [(FLASH_NOTICE, notice), (FLASH_ERROR, error)] {
            let Some(message) = message else { continue };
            match HeaderValue::from_str(&message) {
                Ok(value) => {
                    response.headers_mut().insert(name, value);
                }
                Err(_) => tracing::warn!(header = name, %message, "flash message dropped"),
            }
        }
        response
    }
}

// -- Query parameters --

#[derive(Debug, Deserialize)]
pub struct ExpressParams {
    pub order_id: String,
    pub access_token: Option<String>,
    pub payment_method_id: Option<i64>,
}

/// The provider appends `token` and `PayerID` to the return URL.
#[derive(Debug, Deserialize)]
pub struct ConfirmParams {
    pub order_id: String,
    pub access_token: Option<String>,
    pub token: String,
    #[serde(rename = "PayerID")]
    pub payer_id: String,
    pub payment_method_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CancelParams {
    pub order_id: String,
    pub access_token: Option<String>,
    pub token: Option<String>,
}

// -- Handlers --

/// GET /paypal/express: start a provider session and send the buyer to it.
#[tracing::instrument(skip(state, params), fields(order = %params.order_id))]
pub async fn express<C: ExpressCheckoutApi + 'static, S: CheckoutStore + 'static>(
    State(state): State<Arc<AppState<C, S>>>,
    Query(params): Query<ExpressParams>,
) -> Result<RedirectResponse, ApiError> {
    let payment_method_id = params.payment_method_id.unwrap_or(state.payment_method_id);
    let redirect = state
        .flow
        .initiate(
            &params.order_id,
            params.access_token.as_deref(),
            payment_method_id,
        )
        .await?;
    Ok(RedirectResponse(redirect))
}

/// GET /paypal/confirm: the provider's return callback after approval.
#[tracing::instrument(skip(state, params), fields(order = %params.order_id))]
pub async fn confirm<C: ExpressCheckoutApi + 'static, S: CheckoutStore + 'static>(
    State(state): State<Arc<AppState<C, S>>>,
    Query(params): Query<ConfirmParams>,
) -> Result<RedirectResponse, ApiError> {
    let payment_method_id = params.payment_method_id.unwrap_or(state.payment_method_id);
    let redirect = state
        .flow
        .confirm(
            &params.order_id,
            params.access_token.as_deref(),
            &params.token,
            &params.payer_id,
            payment_method_id,
        )
        .await?;
    Ok(RedirectResponse(redirect))
}

/// GET /paypal/cancel: the provider's cancel callback.
#[tracing::instrument(skip(state, params), fields(order = %params.order_id))]
pub async fn cancel<C: ExpressCheckoutApi + 'static, S: CheckoutStore + 'static>(
    State(state): State<Arc<AppState<C, S>>>,
    Query(params): Query<CancelParams>,
) -> Result<RedirectResponse, ApiError> {
    let redirect = state
        .flow
        .cancel(
            &params.order_id,
            params.access_token.as_deref(),
            params.token.as_deref(),
        )
        .await?;
    Ok(RedirectResponse(redirect))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_carries_flash_headers() {
        let redirect = FlowRedirect::to("/checkout/payment").with_error("PayPal checkout failed: Declined");
        let response = RedirectResponse(redirect).into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], "/checkout/payment");
        assert_eq!(
            response.headers()[FLASH_ERROR],
            "PayPal checkout failed: Declined"
        );
        assert!(response.headers().get(FLASH_NOTICE).is_none());
    }

    #[test]
    fn test_unprintable_flash_is_dropped() {
        let redirect = FlowRedirect::to("/orders/R1").with_notice("line\nbreak");
        let response = RedirectResponse(redirect).into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(response.headers().get(FLASH_NOTICE).is_none());
    }
}
