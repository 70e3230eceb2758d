use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use freshfood_api::app::services::AppServices;
use freshfood_auth::{Hs256JwtValidator, JwtClaims, Role};
use freshfood_core::Customer;
use freshfood_infra::{GuestCheckout, IdentityStore, InMemoryStorefront};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::json;

const JWT_SECRET: &str = "test-secret";
const LOGIN_URL: &str = "/accounts/login";

struct TestServer {
    base_url: String,
    services: Arc<AppServices>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(guest: GuestCheckout) -> Self {
        // Same router as prod over an in-memory store, bound to an ephemeral port.
        let services = Arc::new(AppServices::new(
            Arc::new(InMemoryStorefront::new()),
            guest,
            LOGIN_URL,
        ));
        let jwt = Arc::new(Hs256JwtValidator::new(JWT_SECRET));
        let app = freshfood_api::app::build_router(services.clone(), jwt);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            services,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn customer(&self, username: &str) -> Customer {
        self.services.store.create_customer(username).await.unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn client() -> reqwest::Client {
    // Redirects are assertions here, not something to follow.
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

fn mint_jwt(customer: &Customer, roles: Vec<Role>) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: customer.id,
        username: customer.username.clone(),
        roles,
        issued_at: now - ChronoDuration::seconds(5),
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn location(res: &reqwest::Response) -> String {
    res.headers()
        .get(reqwest::header::LOCATION)
        .expect("redirect without location")
        .to_str()
        .unwrap()
        .to_string()
}

async fn create_product(
    client: &reqwest::Client,
    srv: &TestServer,
    admin_token: &str,
    label: &str,
    category: &str,
    price: &str,
) -> i64 {
    let res = client
        .post(srv.url("/products"))
        .bearer_auth(admin_token)
        .json(&json!({ "label": label, "category": category, "price": price }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn health_is_public_and_tagged_with_request_id() {
    let srv = TestServer::spawn(GuestCheckout::Disabled).await;

    let res = client()
        .get(srv.url("/health"))
        .header("x-request-id", "probe-1")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-request-id"], "probe-1");
}

#[tokio::test]
async fn whoami_reflects_token_or_anonymous() {
    let srv = TestServer::spawn(GuestCheckout::Disabled).await;
    let client = client();

    let body: serde_json::Value = client
        .get(srv.url("/whoami"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["authenticated"], false);

    let sam = srv.customer("sam").await;
    let body: serde_json::Value = client
        .get(srv.url("/whoami"))
        .bearer_auth(mint_jwt(&sam, vec![Role::STAFF]))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["username"], "sam");
    assert_eq!(body["customer_id"], sam.id.get());
    assert_eq!(body["elevated"], true);
}

#[tokio::test]
async fn invalid_token_is_rejected() {
    let srv = TestServer::spawn(GuestCheckout::Disabled).await;

    let res = client()
        .get(srv.url("/products"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn anonymous_management_redirects_to_login() {
    let srv = TestServer::spawn(GuestCheckout::Disabled).await;
    let client = client();

    let res = client
        .post(srv.url("/products"))
        .json(&json!({ "label": "Lamb", "price": "9.00" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/accounts/login?next=/products");

    let res = client.get(srv.url("/orders")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/accounts/login?next=/orders");

    // Product detail needs a login too.
    let res = client.get(srv.url("/products/1")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn non_elevated_customer_cannot_manage_or_view_all() {
    let srv = TestServer::spawn(GuestCheckout::Disabled).await;
    let client = client();
    let alice = srv.customer("alice").await;
    let token = mint_jwt(&alice, vec![Role::new("customer")]);

    let res = client
        .get(srv.url("/orders"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);

    let res = client
        .delete(srv.url("/products/1"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn access_is_checked_before_the_body_is_read() {
    let srv = TestServer::spawn(GuestCheckout::Disabled).await;
    let client = client();
    let alice = srv.customer("alice").await;
    let token = mint_jwt(&alice, vec![Role::new("customer")]);

    // No content-type at all.
    let res = client
        .post(srv.url("/products"))
        .body("{}")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/accounts/login?next=/products");

    // No body at all.
    let res = client.patch(srv.url("/orders/1")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/accounts/login?next=/orders/1");

    // Authenticated but not elevated, with a body that would not decode.
    let res = client
        .patch(srv.url("/products/1"))
        .bearer_auth(&token)
        .json(&json!({ "price": "nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);

    // Elevated callers get the decode error as JSON.
    let admin = srv.customer("root").await;
    let res = client
        .post(srv.url("/products"))
        .bearer_auth(mint_jwt(&admin, vec![Role::ADMIN]))
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "malformed_input");
}

#[tokio::test]
async fn catalog_listing_search_and_category() {
    let srv = TestServer::spawn(GuestCheckout::Disabled).await;
    let client = client();
    let admin = srv.customer("root").await;
    let admin_token = mint_jwt(&admin, vec![Role::ADMIN]);

    create_product(&client, &srv, &admin_token, "Pears", "fruit", "2.00").await;
    create_product(&client, &srv, &admin_token, "Apples", "fruit", "3.50").await;
    create_product(&client, &srv, &admin_token, "Pineapple", "fruit", "4.00").await;
    create_product(&client, &srv, &admin_token, "Basmati", "dry-good", "10.00").await;

    // Anonymous browsing is allowed and ordered by label.
    let body: Vec<serde_json::Value> = client
        .get(srv.url("/products"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let labels: Vec<&str> = body.iter().map(|p| p["label"].as_str().unwrap()).collect();
    assert_eq!(labels, vec!["Apples", "Basmati", "Pears", "Pineapple"]);

    let body: Vec<serde_json::Value> = client
        .get(srv.url("/products?search=APPLE"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let labels: Vec<&str> = body.iter().map(|p| p["label"].as_str().unwrap()).collect();
    assert_eq!(labels, vec!["Apples", "Pineapple"]);

    let body: Vec<serde_json::Value> = client
        .get(srv.url("/products/category/Dry_Good"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body.len(), 1);
    assert_eq!(body[0]["price"], "10.00");

    let res = client
        .get(srv.url("/products/category/toys"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_product_input_is_a_validation_error() {
    let srv = TestServer::spawn(GuestCheckout::Disabled).await;
    let admin = srv.customer("root").await;

    let res = client()
        .post(srv.url("/products"))
        .bearer_auth(mint_jwt(&admin, vec![Role::ADMIN]))
        .json(&json!({ "label": "Lamb", "price": "-1.00" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn order_lifecycle_submit_list_reprice() {
    let srv = TestServer::spawn(GuestCheckout::Disabled).await;
    let client = client();
    let admin = srv.customer("root").await;
    let admin_token = mint_jwt(&admin, vec![Role::ADMIN]);
    let alice = srv.customer("alice").await;
    let alice_token = mint_jwt(&alice, vec![]);

    let apples = create_product(&client, &srv, &admin_token, "Apples", "fruit", "3.50").await;
    let rice = create_product(&client, &srv, &admin_token, "Rice", "dry-good", "10.00").await;

    let res = client
        .post(srv.url("/orders"))
        .bearer_auth(&alice_token)
        .json(&json!({
            "client_name": "Corner Shop",
            "cart_items": [
                { "product_id": apples, "quantity": 2 },
                { "product_id": 999, "quantity": 3 },
                { "product_id": rice, "quantity": 1 }
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: serde_json::Value = res.json().await.unwrap();
    assert!(created["message"].is_string());
    let order_id = created["order_id"].as_i64().unwrap();

    let mine: Vec<serde_json::Value> = client
        .get(srv.url("/orders/mine"))
        .bearer_auth(&alice_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["id"], order_id);
    assert_eq!(mine[0]["client_name"], "Corner Shop");
    assert_eq!(mine[0]["lines"].as_array().unwrap().len(), 2);
    assert_eq!(mine[0]["total_price"], "17.00");

    let res = client
        .patch(srv.url(&format!("/products/{apples}")))
        .bearer_auth(&admin_token)
        .json(&json!({ "price": "4.00" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let detail: serde_json::Value = client
        .get(srv.url(&format!("/orders/{order_id}")))
        .bearer_auth(&alice_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["total_price"], "18.00");
}

#[tokio::test]
async fn cart_rejections_are_distinguishable() {
    let srv = TestServer::spawn(GuestCheckout::Disabled).await;
    let client = client();
    let alice = srv.customer("alice").await;
    let token = mint_jwt(&alice, vec![]);

    let cases: [(&str, &str); 3] = [
        ("{oops", "malformed_input"),
        (r#"{"cart_items": []}"#, "empty_cart"),
        (r#"{"cart_items": [{"product_id": 999, "quantity": 1}]}"#, "no_valid_lines"),
    ];
    for (body, code) in cases {
        let res = client
            .post(srv.url("/orders"))
            .bearer_auth(&token)
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{body}");
        let json: serde_json::Value = res.json().await.unwrap();
        assert_eq!(json["error"], code);
        assert!(json["message"].is_string());
    }

    let admin = srv.customer("root").await;
    let all: Vec<serde_json::Value> = client
        .get(srv.url("/orders"))
        .bearer_auth(mint_jwt(&admin, vec![Role::ADMIN]))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(all.is_empty());
}

#[tokio::test]
async fn anonymous_submission_depends_on_guest_checkout() {
    let disabled = TestServer::spawn(GuestCheckout::Disabled).await;
    let res = client()
        .post(disabled.url("/orders"))
        .json(&json!({ "cart_items": [{ "product_id": 1, "quantity": 1 }] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/accounts/login?next=/orders");

    let enabled = TestServer::spawn(GuestCheckout::Enabled {
        username: "guest".into(),
    })
    .await;
    let client = client();
    let admin = enabled.customer("root").await;
    let admin_token = mint_jwt(&admin, vec![Role::ADMIN]);
    let rice = create_product(&client, &enabled, &admin_token, "Rice", "dry-good", "10.00").await;

    let res = client
        .post(enabled.url("/orders"))
        .json(&json!({ "cart_items": [{ "product_id": rice, "quantity": 1 }] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let all: Vec<serde_json::Value> = client
        .get(enabled.url("/orders"))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0]["customer"]["username"], "guest");
    assert_eq!(all[0]["client_name"], "guest");
}

#[tokio::test]
async fn order_visibility_and_administration() {
    let srv = TestServer::spawn(GuestCheckout::Disabled).await;
    let client = client();
    let admin = srv.customer("root").await;
    let admin_token = mint_jwt(&admin, vec![Role::ADMIN]);
    let alice = srv.customer("alice").await;
    let alice_token = mint_jwt(&alice, vec![]);
    let bob = srv.customer("bob").await;
    let bob_token = mint_jwt(&bob, vec![]);

    let rice = create_product(&client, &srv, &admin_token, "Rice", "dry-good", "10.00").await;
    let created: serde_json::Value = client
        .post(srv.url("/orders"))
        .bearer_auth(&alice_token)
        .json(&json!({ "cart_items": [{ "product_id": rice, "quantity": 2 }] }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let order_id = created["order_id"].as_i64().unwrap();
    let order_url = srv.url(&format!("/orders/{order_id}"));

    // Someone else's order is invisible, and their own list is empty.
    let res = client.get(&order_url).bearer_auth(&bob_token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let mine: Vec<serde_json::Value> = client
        .get(srv.url("/orders/mine"))
        .bearer_auth(&bob_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(mine.is_empty());

    // Staff can rename the order; a blank name falls back to the username.
    let res = client
        .patch(&order_url)
        .bearer_auth(&admin_token)
        .json(&json!({ "client_name": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let header: serde_json::Value = res.json().await.unwrap();
    assert_eq!(header["client_name"], "alice");

    let res = client.delete(&order_url).bearer_auth(&admin_token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let res = client.get(&order_url).bearer_auth(&alice_token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
