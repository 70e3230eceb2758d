//! Service wiring: store selection and the order engine.

use std::sync::Arc;

use tracing::info;

use freshfood_infra::{
    AppConfig, GuestCheckout, InMemoryStorefront, OrderEngine, PostgresStorefront, StoreError,
    Storefront,
};

/// Shared handler state, injected as an `Extension`.
pub struct AppServices {
    pub store: Arc<dyn Storefront>,
    pub engine: OrderEngine<dyn Storefront>,
    /// Authentication entry point for access-denied redirects.
    pub login_url: String,
}

impl AppServices {
    pub fn new(store: Arc<dyn Storefront>, guest: GuestCheckout, login_url: impl Into<String>) -> Self {
        let engine = OrderEngine::new(Arc::clone(&store), guest);
        Self {
            store,
            engine,
            login_url: login_url.into(),
        }
    }

    /// In-memory store; nothing survives a restart.
    pub fn in_memory(config: &AppConfig) -> Self {
        Self::new(
            Arc::new(InMemoryStorefront::new()),
            config.guest_checkout.clone(),
            config.login_url.clone(),
        )
    }

    /// Postgres when `DATABASE_URL` is configured (schema applied on startup),
    /// otherwise in-memory.
    pub async fn from_config(config: &AppConfig) -> Result<Self, StoreError> {
        let Some(database) = &config.database else {
            info!("DATABASE_URL not set; using in-memory store");
            return Ok(Self::in_memory(config));
        };

        let store = PostgresStorefront::connect(&database.url, database.max_connections).await?;
        store.migrate().await?;
        info!(max_connections = database.max_connections, "connected to postgres");

        Ok(Self::new(
            Arc::new(store),
            config.guest_checkout.clone(),
            config.login_url.clone(),
        ))
    }
}
