use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, OriginalUri, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tracing::info;

use freshfood_auth::Operation;
use freshfood_catalog::{Category, ProductFilter};
use freshfood_core::ProductId;
use freshfood_infra::CatalogStore;

use crate::app::{dto, errors, services::AppServices};
use crate::authz::authorize_operation;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/category/:category", get(list_category))
        .route(
            "/:id",
            get(get_product).patch(update_product).delete(delete_product),
        )
}

fn parse_product_id(id: &str) -> Result<ProductId, axum::response::Response> {
    id.parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id"))
}

async fn list_filtered(services: &AppServices, filter: ProductFilter) -> axum::response::Response {
    match services.store.list_products(&filter).await {
        Ok(products) => (StatusCode::OK, Json(products)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// Catalog listing ordered by label; `?search=` matches label substrings
/// case-insensitively, `?category=` narrows to one category.
pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<dto::ListProductsQuery>,
) -> axum::response::Response {
    if let Err(res) = authorize_operation(&principal, Operation::ViewCatalog, &services.login_url, &uri) {
        return res;
    }
    let filter = match query.into_filter() {
        Ok(f) => f,
        Err(e) => return errors::domain_error_to_response(e),
    };
    list_filtered(&services, filter).await
}

pub async fn list_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    OriginalUri(uri): OriginalUri,
    Path(category): Path<String>,
) -> axum::response::Response {
    if let Err(res) = authorize_operation(&principal, Operation::ViewCatalog, &services.login_url, &uri) {
        return res;
    }
    let category: Category = match category.parse() {
        Ok(c) => c,
        Err(_) => {
            return errors::json_error(
                StatusCode::NOT_FOUND,
                "unknown_category",
                format!("no category named '{category}'"),
            );
        }
    };
    list_filtered(&services, ProductFilter::category(category)).await
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(res) = authorize_operation(&principal, Operation::ViewProduct, &services.login_url, &uri) {
        return res;
    }
    let id = match parse_product_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match services.store.get_product(id).await {
        Ok(Some(product)) => (StatusCode::OK, Json(product)).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "product not found"),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    OriginalUri(uri): OriginalUri,
    body: Bytes,
) -> axum::response::Response {
    if let Err(res) = authorize_operation(&principal, Operation::ManageCatalog, &services.login_url, &uri) {
        return res;
    }
    let body: dto::CreateProductRequest = match errors::decode_json(&body) {
        Ok(b) => b,
        Err(res) => return res,
    };
    let new = match body.into_new_product() {
        Ok(n) => n,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.store.create_product(new).await {
        Ok(product) => {
            info!(product_id = %product.id, "product created");
            (StatusCode::CREATED, Json(product)).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    body: Bytes,
) -> axum::response::Response {
    if let Err(res) = authorize_operation(&principal, Operation::ManageCatalog, &services.login_url, &uri) {
        return res;
    }
    let id = match parse_product_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let body: dto::UpdateProductRequest = match errors::decode_json(&body) {
        Ok(b) => b,
        Err(res) => return res,
    };
    let changes = match body.into_changes() {
        Ok(c) => c,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.store.update_product(id, changes).await {
        Ok(product) => (StatusCode::OK, Json(product)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(res) = authorize_operation(&principal, Operation::ManageCatalog, &services.login_url, &uri) {
        return res;
    }
    let id = match parse_product_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match services.store.delete_product(id).await {
        Ok(()) => {
            info!(product_id = %id, "product deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}
