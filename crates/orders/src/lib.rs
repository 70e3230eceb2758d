//! Orders domain module.
//!
//! This crate contains the business rules for turning an untrusted cart into
//! order lines and for pricing committed orders, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod cart;
pub mod details;
pub mod order;

pub use cart::{
    parse_order_request, plan_lines, requested_product_ids, CartItem, OrderRequest, OrderSubmission,
    PlannedLine,
};
pub use details::{total_price, LineDetails, OrderDetails};
pub use order::{Order, OrderError, OrderHeaderChanges, OrderLine, OrderScope};
