//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use gateway::{ExpressCheckoutApi, Mode};
use serde::Serialize;
use store::CheckoutStore;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Provider environment the gateway talks to.
    pub mode: &'static str,
}

/// GET /health: liveness plus the configured provider mode.
pub async fn check<C: ExpressCheckoutApi + 'static, S: CheckoutStore + 'static>(
    State(state): State<Arc<AppState<C, S>>>,
) -> Json<HealthResponse> {
    let mode = match state.flow.adapter().config().mode {
        Mode::Sandbox => "sandbox",
        Mode::Live => "live",
    };
    Json(HealthResponse { status: "ok", mode })
}
