use axum::http::{StatusCode, Uri};
use axum::response::IntoResponse;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::error;

use freshfood_core::DomainError;
use freshfood_infra::{StoreError, SubmitError};
use freshfood_orders::OrderError;

use crate::authz::redirect_to_login;

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        StoreError::Domain(e) => domain_error_to_response(e),
        StoreError::Order(e) => order_error_to_response(e),
        StoreError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        StoreError::Integrity(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "integrity_violation", msg)
        }
        StoreError::Database(msg) => {
            error!(error = %msg, "store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", "storage failure")
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
    }
}

/// Every order rejection is the client's to fix.
pub fn order_error_to_response(err: OrderError) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, err.code(), err.to_string())
}

pub fn submit_error_to_response(
    err: SubmitError,
    login_url: &str,
    uri: &Uri,
) -> axum::response::Response {
    match err {
        SubmitError::Order(e) => order_error_to_response(e),
        SubmitError::AccessDenied => redirect_to_login(login_url, uri),
        // Logged by the engine; the transaction was rolled back.
        SubmitError::Persistence(_) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "persistence_failure",
            "the order could not be saved; nothing was recorded",
        ),
    }
}

/// Decode a JSON request body. Handlers call this only after the policy guard,
/// so denied callers never see body errors.
pub fn decode_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, axum::response::Response> {
    serde_json::from_slice(body).map_err(|e| {
        json_error(
            StatusCode::BAD_REQUEST,
            "malformed_input",
            format!("request body is not valid JSON for this endpoint: {e}"),
        )
    })
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
