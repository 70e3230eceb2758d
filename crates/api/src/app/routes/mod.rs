use axum::{routing::get, Router};

pub mod catalog;
pub mod orders;
pub mod system;

/// Router for every endpoint. Access is decided per handler by the policy
/// guard, since anonymous callers may browse the catalog.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/whoami", get(system::whoami))
        .nest("/products", catalog::router())
        .nest("/orders", orders::router())
}
