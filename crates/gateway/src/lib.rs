//! Express-checkout payment gateway.
//!
//! This crate provides:
//! - A remote client for the provider's express-checkout API, with an HTTP
//!   implementation and a scripted in-memory one
//! - [`GatewayAdapter`], which maps authorize, purchase, capture, void and
//!   refund onto remote calls against a checkout session
//! - [`PaymentPipeline`], the host-side order and payment transitions
//! - [`CheckoutFlow`], the initiate / confirm / cancel steps the buyer goes through

pub mod adapter;
pub mod checkout;
pub mod config;
pub mod error;
pub mod outcome;
pub mod pipeline;
pub mod remote;

pub use adapter::{GatewayAdapter, StartedCheckout};
pub use checkout::{CheckoutFlow, CheckoutUrls, ConfirmTotal, FlowError, FlowRedirect};
pub use config::{ConfigError, GatewayConfig, Mode};
pub use error::GatewayError;
pub use outcome::PaymentOutcome;
pub use pipeline::{OrderPipeline, PaymentPipeline, PipelineError};
pub use remote::{
    ExpressCheckoutApi, InMemoryExpressCheckout, NvpClient, Operation, RecordedCall,
    TransportError,
};
