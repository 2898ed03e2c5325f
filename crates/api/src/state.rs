//! Shared application state.

use std::sync::Arc;

use gateway::{
    CheckoutFlow, CheckoutUrls, ExpressCheckoutApi, GatewayAdapter, GatewayConfig, PaymentPipeline,
};
use store::CheckoutStore;

/// The checkout flow wired over one gateway and its store.
pub type Flow<C, S> = CheckoutFlow<C, S, PaymentPipeline<C, S>>;

/// Shared application state accessible from all handlers.
pub struct AppState<C: ExpressCheckoutApi, S: CheckoutStore> {
    pub flow: Flow<C, S>,
    /// Payment method recorded on payments created by confirm.
    pub payment_method_id: i64,
}

impl<C: ExpressCheckoutApi, S: CheckoutStore> AppState<C, S> {
    /// Wires the adapter, the payment pipeline and the checkout flow together.
    pub fn new(
        config: GatewayConfig,
        client: C,
        store: S,
        urls: CheckoutUrls,
        payment_method_id: i64,
    ) -> Self {
        let adapter = Arc::new(GatewayAdapter::new(config, client, store));
        let pipeline = PaymentPipeline::new(adapter.clone());
        Self {
            flow: CheckoutFlow::new(adapter, pipeline, urls),
            payment_method_id,
        }
    }

    pub fn pipeline(&self) -> &PaymentPipeline<C, S> {
        self.flow.pipeline()
    }

    pub fn store(&self) -> &S {
        self.flow.adapter().store()
    }

    pub fn client(&self) -> &C {
        self.flow.adapter().client()
    }
}

