//! Custom Action Adapters
//!
//! Reference implementations of the CustomActionHandler port.

mod order_status;

pub use order_status::{CheckOrderStatus, InMemoryOrderStatusLookup, OrderStatusLookup, CHECK_ORDER_STATUS};
