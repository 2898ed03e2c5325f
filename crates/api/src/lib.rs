//! HTTP server for the express-checkout gateway.
//!
//! Provides the buyer-facing checkout callbacks and the back-office payment
//! actions, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use common::BusinessEntityId;
use gateway::{CheckoutUrls, ExpressCheckoutApi, GatewayConfig, InMemoryExpressCheckout};
use metrics_exporter_prometheus::PrometheusHandle;
use store::CheckoutStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<C, S>(state: Arc<AppState<C, S>>, metrics_handle: PrometheusHandle) -> Router
where
    C: ExpressCheckoutApi + 'static,
    S: CheckoutStore + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<C, S>))
        .route("/paypal/express", get(routes::paypal::express::<C, S>))
        .route("/paypal/confirm", get(routes::paypal::confirm::<C, S>))
        .route("/paypal/cancel", get(routes::paypal::cancel::<C, S>))
        .route(
            "/admin/orders/{number}/payments/{id}/paypal_refund",
            get(routes::admin::refund_form::<C, S>).post(routes::admin::refund::<C, S>),
        )
        .route(
            "/admin/orders/{number}/payments/{id}/capture",
            post(routes::admin::capture::<C, S>),
        )
        .route(
            "/admin/orders/{number}/payments/{id}/void",
            post(routes::admin::void::<C, S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state over `store` with the scripted in-memory
/// provider and sandbox settings.
pub fn create_default_state<S: CheckoutStore + 'static>(
    store: S,
    urls: CheckoutUrls,
) -> Arc<AppState<InMemoryExpressCheckout, S>> {
    Arc::new(AppState::new(
        GatewayConfig::sandbox(BusinessEntityId::new("default")),
        InMemoryExpressCheckout::new(),
        store,
        urls,
        config::Config::default().payment_method_id,
    ))
}
