//! Infrastructure layer: configuration, persistence and the order engine.

pub mod config;
pub mod engine;
pub mod store;


pub use config::{AppConfig, ConfigError, DatabaseConfig};
pub use engine::{GuestCheckout, OrderEngine, OrderReceipt, SubmitError};
pub use store::{
    CatalogStore, IdentityStore, InMemoryStorefront, OrderStore, PlacedOrder, PostgresStorefront,
    StoreError, Storefront,
};
