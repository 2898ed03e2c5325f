//! Remote client for the provider's express-checkout API.

pub mod memory;
pub mod nvp;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::{InMemoryExpressCheckout, RecordedCall};
pub use nvp::NvpClient;
pub use types::*;

/// Failure to reach the provider or to understand its answer.
///
/// Distinct from a negative provider response, which arrives as a
/// [`RemoteResponse`] with a failure acknowledgement.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The HTTP request could not be sent or its body read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success HTTP status.
    #[error("Unexpected HTTP status {status}")]
    Status { status: u16 },

    /// The response body was missing a required field or was malformed.
    #[error("Malformed response: {0}")]
    Decode(String),

    /// The provider could not be reached.
    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

/// Trait for the provider operations the gateway uses.
///
/// Every method returns `Ok` for any answer the provider gave, positive or
/// negative, and `Err` only when no usable answer arrived.
#[async_trait]
pub trait ExpressCheckoutApi: Send + Sync {
    /// Starts a provider-hosted checkout session.
    async fn set_express_checkout(
        &self,
        request: SetExpressCheckoutRequest,
    ) -> Result<RemoteResponse<SetExpressCheckoutResponse>, TransportError>;

    /// Reads back what the provider knows about a session.
    async fn get_express_checkout_details(
        &self,
        token: &str,
    ) -> Result<RemoteResponse<ExpressCheckoutDetails>, TransportError>;

    /// Settles a session the buyer approved.
    async fn do_express_checkout_payment(
        &self,
        request: DoExpressCheckoutPaymentRequest,
    ) -> Result<RemoteResponse<PaymentInfo>, TransportError>;

    /// Captures a previous authorization.
    async fn do_capture(
        &self,
        request: DoCaptureRequest,
    ) -> Result<RemoteResponse<CaptureInfo>, TransportError>;

    /// Voids a previous authorization.
    async fn do_void(&self, request: DoVoidRequest)
    -> Result<RemoteResponse<VoidInfo>, TransportError>;

    /// Refunds a captured transaction.
    async fn refund_transaction(
        &self,
        request: RefundTransactionRequest,
    ) -> Result<RemoteResponse<RefundInfo>, TransportError>;

    /// URL of the hosted checkout page for a session token.
    fn express_checkout_url(&self, token: &str) -> String;
}

/// Builds the hosted checkout URL: `base?cmd=_express-checkout&token=..&useraction=commit`.
pub fn express_checkout_url(base: &url::Url, token: &str) -> String {
    let mut url = base.clone();
    url.query_pairs_mut()
        .append_pair("cmd", "_express-checkout")
        .append_pair("token", token)
        .append_pair("useraction", "commit");
    url.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_express_checkout_url_carries_token_and_commit() {
        let base = url::Url::parse("https://www.sandbox.paypal.com/cgi-bin/webscr").unwrap();
        assert_eq!(
            express_checkout_url(&base, "EC-123"),
            "https://www.sandbox.paypal.com/cgi-bin/webscr?cmd=_express-checkout&token=EC-123&useraction=commit"
        );
    }
}
