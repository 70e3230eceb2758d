//! API-side access-policy guard.
//!
//! Every catalog-management and order-management handler calls
//! [`authorize_operation`] before touching the store, while the domain crates
//! and infra stay transport-agnostic.

use std::fmt::Write;

use axum::http::Uri;
use axum::response::{IntoResponse, Redirect, Response};
use tracing::info;

use freshfood_auth::{authorize, explain_authorization, Operation};

use crate::context::PrincipalContext;

/// Check `operation` for the current principal.
///
/// Denials never produce an empty result: the caller is sent to the login
/// entry point with a `next` parameter pointing back at `uri`.
pub fn authorize_operation(
    principal: &PrincipalContext,
    operation: Operation,
    login_url: &str,
    uri: &Uri,
) -> Result<(), Response> {
    if authorize(principal.principal(), operation).is_ok() {
        return Ok(());
    }

    let explanation = explain_authorization(principal.principal(), operation);
    info!(
        operation = %operation,
        requirement = ?explanation.requirement,
        authenticated = explanation.principal.authenticated,
        customer_id = ?explanation.principal.customer_id,
        reason = %explanation.reason,
        "access denied"
    );
    Err(redirect_to_login(login_url, uri))
}

/// `303 See Other` to `login_url?next=<path and query>`.
pub fn redirect_to_login(login_url: &str, uri: &Uri) -> Response {
    let next = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    let separator = if login_url.contains('?') { '&' } else { '?' };
    let location = format!("{login_url}{separator}next={}", encode_query_value(next));
    Redirect::to(&location).into_response()
}

/// Percent-encode everything outside RFC 3986 unreserved characters, keeping
/// `/` readable.
fn encode_query_value(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for b in raw.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' => {
                out.push(b as char)
            }
            _ => {
                let _ = write!(out, "%{b:02X}");
            }
        }
    }
    out
}
