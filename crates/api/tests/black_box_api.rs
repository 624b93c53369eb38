//! Black-box HTTP tests over the in-memory store.
//!
//! Every test goes through the real router, middleware included; state is
//! seeded through the API itself.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use vexo_api::app::build_router;
use vexo_api::middleware::{USER_ID_HEADER, USER_ROLE_HEADER};
use vexo_core::UserId;
use vexo_infra::MemoryStore;

struct Caller {
    user_id: UserId,
    role: &'static str,
}

impl Caller {
    fn admin() -> Self {
        Self {
            user_id: UserId::new(),
            role: "admin",
        }
    }

    fn customer() -> Self {
        Self {
            user_id: UserId::new(),
            role: "customer",
        }
    }
}

fn app() -> Router {
    build_router(MemoryStore::with_default_timeout())
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    caller: Option<&Caller>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(caller) = caller {
        builder = builder
            .header(USER_ID_HEADER, caller.user_id.to_string())
            .header(USER_ROLE_HEADER, caller.role);
    }
    let request = match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

/// Create a product as admin and return its id.
async fn seed_product(app: &Router, admin: &Caller, price: u64, stock: i64) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/products",
        Some(admin),
        Some(json!({
            "name": "desk lamp",
            "description": null,
            "price": price,
            "stock": stock,
            "image_url": null,
            "category_id": null,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_str().unwrap().to_string()
}

async fn product_stock(app: &Router, caller: &Caller, product_id: &str) -> i64 {
    let (status, body) = send(
        app,
        Method::GET,
        &format!("/products/{product_id}"),
        Some(caller),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["stock"].as_i64().unwrap()
}

async fn place_order(app: &Router, caller: &Caller, product_id: &str, quantity: i64) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/orders",
        Some(caller),
        Some(json!({ "items": [{ "product_id": product_id, "quantity": quantity }] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

#[tokio::test]
async fn health_is_public() {
    let app = app();
    let (status, _) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn requests_without_a_resolvable_caller_are_rejected() {
    let app = app();

    let (status, body) = send(&app, Method::GET, "/orders", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let bogus = Caller {
        user_id: UserId::new(),
        role: "superuser",
    };
    let (status, _) = send(&app, Method::GET, "/orders", Some(&bogus), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn customers_cannot_use_admin_operations() {
    let app = app();
    let customer = Caller::customer();

    let (status, body) = send(
        &app,
        Method::POST,
        "/products",
        Some(&customer),
        Some(json!({
            "name": "x", "description": null, "price": 100, "stock": 1,
            "image_url": null, "category_id": null,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, _) = send(&app, Method::GET, "/admin/stats", Some(&customer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn whoami_echoes_the_resolved_caller() {
    let app = app();
    let admin = Caller::admin();

    let (status, body) = send(&app, Method::GET, "/whoami", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], admin.user_id.to_string());
    assert_eq!(body["role"], "admin");
}

#[tokio::test]
async fn placing_and_cancelling_an_order_round_trips_the_stock() {
    let app = app();
    let admin = Caller::admin();
    let customer = Caller::customer();
    let product_id = seed_product(&app, &admin, 500, 10).await;

    let order = place_order(&app, &customer, &product_id, 3).await;
    assert_eq!(order["status"], "pending");
    assert_eq!(order["total"], 1500);
    assert_eq!(order["items"][0]["unit_price"], 500);
    assert_eq!(product_stock(&app, &customer, &product_id).await, 7);

    let order_id = order["id"].as_str().unwrap();
    let (status, cancelled) = send(
        &app,
        Method::POST,
        &format!("/orders/{order_id}/cancel"),
        Some(&customer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");
    assert_eq!(product_stock(&app, &customer, &product_id).await, 10);
}

#[tokio::test]
async fn overselling_names_the_offending_product() {
    let app = app();
    let admin = Caller::admin();
    let customer = Caller::customer();
    let product_id = seed_product(&app, &admin, 500, 1).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/orders",
        Some(&customer),
        Some(json!({ "items": [{ "product_id": product_id, "quantity": 2 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "insufficient_stock");
    assert_eq!(body["product_id"], product_id);
    assert_eq!(product_stock(&app, &customer, &product_id).await, 1);
}

#[tokio::test]
async fn an_unknown_product_is_a_bad_request() {
    let app = app();
    let customer = Caller::customer();
    let ghost = uuid::Uuid::now_v7().to_string();

    let (status, body) = send(
        &app,
        Method::POST,
        "/orders",
        Some(&customer),
        Some(json!({ "items": [{ "product_id": ghost, "quantity": 1 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "unknown_product");
    assert_eq!(body["product_id"], ghost);
}

#[tokio::test]
async fn an_empty_order_is_a_validation_error() {
    let app = app();
    let customer = Caller::customer();

    let (status, body) = send(
        &app,
        Method::POST,
        "/orders",
        Some(&customer),
        Some(json!({ "items": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn unknown_body_fields_are_rejected() {
    let app = app();
    let customer = Caller::customer();

    // deny_unknown_fields surfaces as an unprocessable body, not a pass-through.
    let (status, _) = send(
        &app,
        Method::POST,
        "/orders",
        Some(&customer),
        Some(json!({ "items": [], "coupon": "WELCOME10" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn shipping_blocks_cancellation() {
    let app = app();
    let admin = Caller::admin();
    let customer = Caller::customer();
    let product_id = seed_product(&app, &admin, 900, 5).await;

    let order = place_order(&app, &customer, &product_id, 1).await;
    let order_id = order["id"].as_str().unwrap();

    let (status, shipment) = send(
        &app,
        Method::POST,
        &format!("/shipments/{order_id}"),
        Some(&admin),
        Some(json!({ "carrier": "dhl", "tracking_number": "JD014600003GB" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(shipment["status"], "label_created");

    let (status, details) = send(
        &app,
        Method::GET,
        &format!("/orders/{order_id}"),
        Some(&customer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["order"]["status"], "shipped");
    assert_eq!(details["shipment"]["carrier"], "dhl");

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/orders/{order_id}/cancel"),
        Some(&customer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
    assert_eq!(product_stock(&app, &customer, &product_id).await, 4);
}

#[tokio::test]
async fn shipment_progress_never_touches_the_order() {
    let app = app();
    let admin = Caller::admin();
    let customer = Caller::customer();
    let product_id = seed_product(&app, &admin, 900, 5).await;

    let order = place_order(&app, &customer, &product_id, 1).await;
    let order_id = order["id"].as_str().unwrap();
    send(
        &app,
        Method::POST,
        &format!("/shipments/{order_id}"),
        Some(&admin),
        Some(json!({ "carrier": "dhl", "tracking_number": "JD014600003GB" })),
    )
    .await;

    let (status, shipment) = send(
        &app,
        Method::PATCH,
        &format!("/shipments/{order_id}"),
        Some(&admin),
        Some(json!({ "status": "delivered", "delivered_at": "2026-08-29T12:00:00Z" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(shipment["status"], "delivered");

    // The order stays shipped; delivery of the parcel is not mirrored.
    let (_, details) = send(
        &app,
        Method::GET,
        &format!("/orders/{order_id}"),
        Some(&customer),
        None,
    )
    .await;
    assert_eq!(details["order"]["status"], "shipped");
}

#[tokio::test]
async fn updating_a_missing_shipment_is_not_found() {
    let app = app();
    let admin = Caller::admin();
    let order_id = uuid::Uuid::now_v7();

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/shipments/{order_id}"),
        Some(&admin),
        Some(json!({ "status": "in_transit" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn receipts_upsert_idempotently() {
    let app = app();
    let admin = Caller::admin();
    let customer = Caller::customer();
    let product_id = seed_product(&app, &admin, 700, 5).await;

    let order = place_order(&app, &customer, &product_id, 1).await;
    let order_id = order["id"].as_str().unwrap();

    for url in [
        "https://cdn.example.com/r/1.pdf",
        "https://cdn.example.com/r/1-final.pdf",
    ] {
        let (status, receipt) = send(
            &app,
            Method::POST,
            &format!("/receipts/{order_id}"),
            Some(&admin),
            Some(json!({ "pdf_url": url })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(receipt["pdf_url"], url);
    }

    // The owner reads back exactly one receipt, holding the latest URL.
    let (status, receipt) = send(
        &app,
        Method::GET,
        &format!("/receipts/{order_id}"),
        Some(&customer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["pdf_url"], "https://cdn.example.com/r/1-final.pdf");
}

#[tokio::test]
async fn customers_only_see_their_own_orders() {
    let app = app();
    let admin = Caller::admin();
    let owner = Caller::customer();
    let stranger = Caller::customer();
    let product_id = seed_product(&app, &admin, 500, 5).await;

    let order = place_order(&app, &owner, &product_id, 1).await;
    let order_id = order["id"].as_str().unwrap();

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/orders/{order_id}"),
        Some(&stranger),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, orders) = send(&app, Method::GET, "/orders", Some(&stranger), None).await;
    assert_eq!(orders.as_array().unwrap().len(), 0);
    let (_, orders) = send(&app, Method::GET, "/orders", Some(&owner), None).await;
    assert_eq!(orders.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn cart_lines_merge_and_stay_owner_scoped() {
    let app = app();
    let admin = Caller::admin();
    let customer = Caller::customer();
    let other = Caller::customer();
    let product_id = seed_product(&app, &admin, 500, 5).await;

    for _ in 0..2 {
        let (status, _) = send(
            &app,
            Method::POST,
            "/cart",
            Some(&customer),
            Some(json!({ "product_id": product_id, "quantity": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, cart) = send(&app, Method::GET, "/cart", Some(&customer), None).await;
    let entries = cart.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["item"]["quantity"], 2);
    let item_id = entries[0]["item"]["id"].as_str().unwrap().to_string();

    // Another user can neither see nor touch the line.
    let (_, cart) = send(&app, Method::GET, "/cart", Some(&other), None).await;
    assert_eq!(cart.as_array().unwrap().len(), 0);
    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/cart/{item_id}"),
        Some(&other),
        Some(json!({ "quantity": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, item) = send(
        &app,
        Method::PATCH,
        &format!("/cart/{item_id}"),
        Some(&customer),
        Some(json!({ "quantity": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item["quantity"], 5);

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/cart/{item_id}"),
        Some(&customer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn categories_rename_conflicts_and_deletion_detaches_products() {
    let app = app();
    let admin = Caller::admin();

    let (status, lighting) = send(
        &app,
        Method::POST,
        "/categories",
        Some(&admin),
        Some(json!({ "name": "lighting" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send(
        &app,
        Method::POST,
        "/categories",
        Some(&admin),
        Some(json!({ "name": "lighting" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let category_id = lighting["id"].as_str().unwrap();
    let (status, body) = send(
        &app,
        Method::POST,
        "/products",
        Some(&admin),
        Some(json!({
            "name": "desk lamp", "description": null, "price": 1999, "stock": 3,
            "image_url": null, "category_id": category_id,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let product_id = body["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/categories/{category_id}"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, product) = send(
        &app,
        Method::GET,
        &format!("/products/{product_id}"),
        Some(&admin),
        None,
    )
    .await;
    assert!(product["category_id"].is_null());
}

#[tokio::test]
async fn stats_reflect_orders_and_low_stock() {
    let app = app();
    let admin = Caller::admin();
    let customer = Caller::customer();
    let product_id = seed_product(&app, &admin, 500, 6).await;

    place_order(&app, &customer, &product_id, 2).await;

    let (status, stats) = send(&app, Method::GET, "/admin/stats", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_orders"], 1);
    assert_eq!(stats["total_revenue"], 1000);
    assert_eq!(stats["total_customers"], 1);
    // Stock dropped to 4, below the low-stock threshold of 5.
    assert_eq!(stats["low_stock"][0]["id"], product_id);
}
