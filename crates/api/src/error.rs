//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;
use gateway::{FlowError, GatewayError, PipelineError};
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// The request conflicts with the current record state.
    Conflict(String),
    /// Checkout step failed before it could redirect.
    Flow(FlowError),
    /// Payment pipeline error.
    Pipeline(PipelineError),
    /// Record lookup error.
    Store(StoreError),
    /// Illegal record transition.
    Domain(DomainError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Flow(err) => flow_error_to_response(err),
            ApiError::Pipeline(err) => pipeline_error_to_response(err),
            ApiError::Store(err) => store_error_to_response(err),
            ApiError::Domain(err) => domain_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn flow_error_to_response(err: FlowError) -> (StatusCode, String) {
    match err {
        err @ FlowError::OrderNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        err @ FlowError::Forbidden(_) => (StatusCode::FORBIDDEN, err.to_string()),
        FlowError::Domain(err) => domain_error_to_response(err),
        FlowError::Gateway(err) => gateway_error_to_response(err),
        FlowError::Store(err) => store_error_to_response(err),
    }
}

fn pipeline_error_to_response(err: PipelineError) -> (StatusCode, String) {
    match err {
        PipelineError::Gateway(err) => gateway_error_to_response(err),
        PipelineError::Store(err) => store_error_to_response(err),
        PipelineError::Domain(err) => domain_error_to_response(err),
    }
}

fn gateway_error_to_response(err: GatewayError) -> (StatusCode, String) {
    match err {
        GatewayError::ProviderRejected { message, .. } => (StatusCode::UNPROCESSABLE_ENTITY, message),
        GatewayError::Store(err) => store_error_to_response(err),
        err @ GatewayError::PreconditionViolation(_) => (StatusCode::CONFLICT, err.to_string()),
        err @ GatewayError::Transport { .. } => (StatusCode::BAD_GATEWAY, err.to_string()),
    }
}

fn store_error_to_response(err: StoreError) -> (StatusCode, String) {
    match &err {
        StoreError::OrderNotFound(_) | StoreError::SessionNotFound(_) => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        StoreError::DuplicateToken(_) => (StatusCode::CONFLICT, err.to_string()),
        _ => {
            tracing::error!(error = %err, "store failure");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    match &err {
        DomainError::PaymentNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        DomainError::InvalidOrderTransition { .. }
        | DomainError::InvalidPaymentTransition { .. } => (StatusCode::CONFLICT, err.to_string()),
    }
}

impl From<FlowError> for ApiError {
    fn from(err: FlowError) -> Self {
        ApiError::Flow(err)
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError::Pipeline(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}
