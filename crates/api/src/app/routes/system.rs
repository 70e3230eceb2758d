use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::context::PrincipalContext;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

pub async fn whoami(Extension(principal): Extension<PrincipalContext>) -> impl IntoResponse {
    let identity = principal.principal().identity();
    Json(serde_json::json!({
        "authenticated": identity.is_some(),
        "customer_id": principal.customer_id(),
        "username": identity.map(|i| i.username.as_str()),
        "roles": principal.roles().iter().map(|r| r.as_str()).collect::<Vec<_>>(),
        "elevated": principal.principal().is_elevated(),
    }))
}
