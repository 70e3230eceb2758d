use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use tracing::{info, info_span, warn, Instrument};

use freshfood_auth::{JwtValidator, Principal};
use freshfood_observability::{RequestId, REQUEST_ID_HEADER};

use crate::app::errors;
use crate::context::PrincipalContext;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

/// Resolve the request principal.
///
/// No `Authorization` header means an anonymous caller; the access policy
/// decides later whether that is enough. A header that is present but not a
/// valid bearer token is rejected outright.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let principal = match extract_bearer(req.headers()) {
        Ok(None) => Principal::Anonymous,
        Ok(Some(token)) => match state.jwt.validate(token, Utc::now()) {
            Ok(claims) => Principal::from(claims),
            Err(e) => {
                warn!(error = %e, "rejected bearer token");
                return errors::json_error(StatusCode::UNAUTHORIZED, "invalid_token", e.to_string());
            }
        },
        Err(msg) => {
            warn!(reason = msg, "rejected authorization header");
            return errors::json_error(StatusCode::UNAUTHORIZED, "invalid_token", msg);
        }
    };

    req.extensions_mut().insert(PrincipalContext::new(principal));
    next.run(req).await
}

fn extract_bearer(headers: &HeaderMap) -> Result<Option<&str>, &'static str> {
    let Some(header) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };

    let header = header
        .to_str()
        .map_err(|_| "authorization header is not valid ASCII")?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or("authorization header is not a bearer token")?
        .trim();
    if token.is_empty() {
        return Err("bearer token is empty");
    }

    Ok(Some(token))
}

/// Wrap each request in a span carrying its request id, and echo the id back.
pub async fn request_id_middleware(mut req: Request<Body>, next: Next) -> Response {
    let request_id = RequestId::from_inbound(
        req.headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok()),
    );
    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %req.method(),
        path = %req.uri().path(),
    );
    req.extensions_mut().insert(request_id.clone());

    let mut response = next.run(req).instrument(span.clone()).await;

    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    span.in_scope(|| info!(status = response.status().as_u16(), "request completed"));
    response
}
