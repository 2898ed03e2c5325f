//! Buyer-facing express-checkout flow.

pub mod flow;
pub mod request;

pub use flow::{
    CONNECTION_FAILED_ERROR, CheckoutFlow, ConfirmTotal, FlowError, FlowRedirect,
    ORDER_PROCESSED_NOTICE, PAYMENT_ADDED_NOTICE, PAYMENT_FAILED_ERROR, checkout_failed_message, checkout_state_path,
    completion_path,
};
pub use request::{
    CheckoutUrls, EXISTING_PAYMENT_ITEM, build_line_items, build_payment_details,
    build_set_express_checkout,
};
