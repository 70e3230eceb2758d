use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, OriginalUri, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tracing::info;

use freshfood_auth::Operation;
use freshfood_core::OrderId;
use freshfood_infra::OrderStore;
use freshfood_orders::OrderScope;

use crate::app::{dto, errors, services::AppServices};
use crate::authz::authorize_operation;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_all_orders).post(submit_order))
        .route("/mine", get(list_my_orders))
        .route(
            "/:id",
            get(get_order).patch(update_order).delete(delete_order),
        )
}

fn parse_order_id(id: &str) -> Result<OrderId, axum::response::Response> {
    id.parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid order id"))
}

/// Submit a cart.
///
/// The raw body is handed to the engine so malformed JSON is reported in the
/// same `{"error", "message"}` shape as cart rejections.
pub async fn submit_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    OriginalUri(uri): OriginalUri,
    body: Bytes,
) -> axum::response::Response {
    match services.engine.submit_request(principal.principal(), &body).await {
        Ok(receipt) => (
            StatusCode::CREATED,
            Json(dto::OrderCreatedResponse {
                message: "order placed",
                order_id: receipt.order_id,
            }),
        )
            .into_response(),
        Err(e) => errors::submit_error_to_response(e, &services.login_url, &uri),
    }
}

async fn list_scoped(services: &AppServices, scope: OrderScope) -> axum::response::Response {
    match services.store.list_orders(scope).await {
        Ok(orders) => {
            let body: Vec<dto::OrderResponse> = orders.iter().map(dto::OrderResponse::from).collect();
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

/// Every customer's orders, newest first.
pub async fn list_all_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    OriginalUri(uri): OriginalUri,
) -> axum::response::Response {
    if let Err(res) = authorize_operation(&principal, Operation::ViewAllOrders, &services.login_url, &uri) {
        return res;
    }
    list_scoped(&services, OrderScope::All).await
}

/// The caller's own orders, newest first.
pub async fn list_my_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    OriginalUri(uri): OriginalUri,
) -> axum::response::Response {
    if let Err(res) = authorize_operation(&principal, Operation::ViewOwnOrders, &services.login_url, &uri) {
        return res;
    }
    let Some(customer_id) = principal.customer_id() else {
        return crate::authz::redirect_to_login(&services.login_url, &uri);
    };
    list_scoped(&services, OrderScope::Customer(customer_id)).await
}

/// Order detail for its owner or an elevated principal. Other callers get a
/// 404 so order ids do not leak.
pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(res) = authorize_operation(&principal, Operation::ViewOwnOrders, &services.login_url, &uri) {
        return res;
    }
    let id = match parse_order_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    let details = match services.store.get_order(id).await {
        Ok(Some(d)) => d,
        Ok(None) => return errors::json_error(StatusCode::NOT_FOUND, "not_found", "order not found"),
        Err(e) => return errors::store_error_to_response(e),
    };

    let visible = principal.principal().is_elevated()
        || principal.customer_id() == Some(details.order.customer_id);
    if !visible {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "order not found");
    }

    (StatusCode::OK, Json(dto::OrderResponse::from(&details))).into_response()
}

pub async fn update_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    body: Bytes,
) -> axum::response::Response {
    if let Err(res) = authorize_operation(&principal, Operation::ManageOrders, &services.login_url, &uri) {
        return res;
    }
    let id = match parse_order_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let body: dto::UpdateOrderRequest = match errors::decode_json(&body) {
        Ok(b) => b,
        Err(res) => return res,
    };

    match services.store.update_order(id, body.into()).await {
        Ok(order) => (StatusCode::OK, Json(dto::OrderHeaderResponse::from(order))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(res) = authorize_operation(&principal, Operation::ManageOrders, &services.login_url, &uri) {
        return res;
    }
    let id = match parse_order_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match services.store.delete_order(id).await {
        Ok(()) => {
            info!(order_id = %id, "order deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}
