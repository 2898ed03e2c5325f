//! Order record and related types.

mod model;
mod state;
mod value_objects;

pub use model::Order;
pub use state::OrderState;
pub use value_objects::{Address, Adjustment, AdjustmentKind, LineItem};
