//! Storefront persistence.
//!
//! Three narrow traits split the storage surface by concern; [`Storefront`] is
//! the union the API layer depends on. Two backends implement all of them:
//! [`InMemoryStorefront`] for tests and local runs, [`PostgresStorefront`] for
//! deployments.
//!
//! Both backends uphold the same contract:
//! - `place_order` commits the header and every planned line together, or
//!   nothing at all.
//! - Products for a cart are resolved with one batch lookup inside the same
//!   atomic scope as the writes.
//! - Order listings are newest-first and come back fully joined, so callers
//!   never issue per-order or per-line queries.

mod in_memory;
mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use freshfood_catalog::{NewProduct, Product, ProductChanges, ProductFilter};
use freshfood_core::{Customer, CustomerId, DomainError, OrderId, ProductId};
use freshfood_orders::{
    Order, OrderDetails, OrderError, OrderHeaderChanges, OrderLine, OrderScope, OrderSubmission,
};

pub use in_memory::InMemoryStorefront;
pub use postgres::PostgresStorefront;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Order(#[from] OrderError),

    /// Unique constraint collision.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A referenced row does not exist.
    #[error("integrity violation: {0}")]
    Integrity(String),

    #[error("database error: {0}")]
    Database(String),
}

/// Result of a committed order: the header plus the lines actually written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn create_product(&self, new: NewProduct) -> Result<Product, StoreError>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    async fn update_product(
        &self,
        id: ProductId,
        changes: ProductChanges,
    ) -> Result<Product, StoreError>;

    /// Removes the product and every order line referencing it.
    async fn delete_product(&self, id: ProductId) -> Result<(), StoreError>;

    /// Matching products ordered by label, then id.
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, StoreError>;
}

#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Fails with [`StoreError::Conflict`] when the username is taken.
    async fn create_customer(&self, username: &str) -> Result<Customer, StoreError>;

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>, StoreError>;

    /// Get-or-create by username.
    async fn ensure_customer(&self, username: &str) -> Result<Customer, StoreError>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Validate the cart against the catalog and commit the order atomically.
    async fn place_order(&self, submission: OrderSubmission) -> Result<PlacedOrder, StoreError>;

    async fn list_orders(&self, scope: OrderScope) -> Result<Vec<OrderDetails>, StoreError>;

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderDetails>, StoreError>;

    async fn update_order(
        &self,
        id: OrderId,
        changes: OrderHeaderChanges,
    ) -> Result<Order, StoreError>;

    /// Removes the header and its lines.
    async fn delete_order(&self, id: OrderId) -> Result<(), StoreError>;
}

pub trait Storefront: CatalogStore + IdentityStore + OrderStore {}

impl<T> Storefront for T where T: CatalogStore + IdentityStore + OrderStore + ?Sized {}

/// Usernames are stored trimmed and must not be blank.
fn normalize_username(username: &str) -> Result<&str, StoreError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(DomainError::validation("username must not be empty").into());
    }
    Ok(username)
}
