//! `freshfood-core` — shared domain building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod customer;
pub mod entity;
pub mod error;
pub mod id;

pub use customer::Customer;
pub use entity::{index_by_id, Entity};
pub use error::{DomainError, DomainResult};
pub use id::{CustomerId, OrderId, OrderLineId, ProductId};
