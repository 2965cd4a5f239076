//! Integration tests for the API server.

use std::sync::OnceLock;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::InMemoryOrderStore;
use serde_json::{Value, json};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> axum::Router {
    setup_with_store().0
}

fn setup_with_store() -> (axum::Router, InMemoryOrderStore) {
    let store = InMemoryOrderStore::new();
    let state = api::create_state(store.clone(), Duration::from_secs(5));
    (api::create_app(state, get_metrics_handle()), store)
}

fn order_body(user_id: u32) -> Value {
    json!({
        "user_id": user_id,
        "currency": "CNY",
        "email": "buyer@example.com",
        "address": {
            "street_address": "88 Nanjing Rd",
            "city": "Shanghai",
            "state": "SH",
            "country": "CN",
            "zip_code": 200001
        },
        "items": [
            {
                "product_id": 1,
                "product_name": "Keyboard",
                "quantity": 1,
                "unit_price_cents": 5990,
                "cost_cents": 5990
            },
            {
                "product_id": 2,
                "product_name": "Mouse",
                "quantity": 2,
                "unit_price_cents": 3490
            }
        ]
    })
}

async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn create_order(app: &axum::Router, user_id: u32) -> String {
    let (status, json) = send(app, "POST", "/orders", Some(order_body(user_id))).await;
    assert_eq!(status, StatusCode::CREATED);
    json["order_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();

    let (status, json) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_create_order() {
    let app = setup();

    let (status, json) = send(&app, "POST", "/orders", Some(order_body(7))).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["status"], "pending");
    assert_eq!(json["total_cents"], 12970);
    assert_eq!(json["total"], "129.70");
    assert_eq!(json["item_count"], 2);
    assert_eq!(json["items"].as_array().unwrap().len(), 2);
    assert_eq!(json["items"][1]["cost_cents"], 6980);
    assert!(json["order_id"].as_str().is_some());
}

#[tokio::test]
async fn test_create_order_without_items_is_bad_request() {
    let (app, store) = setup_with_store();
    let mut body = order_body(7);
    body["items"] = json!([]);

    let (status, json) = send(&app, "POST", "/orders", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("at least one item"));
    assert_eq!(store.order_count().await, 0);
}

#[tokio::test]
async fn test_create_order_with_wrong_cost_is_bad_request() {
    let app = setup();
    let mut body = order_body(7);
    body["items"][0]["cost_cents"] = json!(1);

    let (status, _) = send(&app, "POST", "/orders", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_and_get_order() {
    let app = setup();
    let order_id = create_order(&app, 7).await;

    let (status, json) = send(&app, "GET", &format!("/orders/{order_id}"), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["order_id"], order_id.as_str());
    assert_eq!(json["user_id"], 7);
    assert_eq!(json["address"]["city"], "Shanghai");
    assert_eq!(json["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_get_nonexistent_order() {
    let app = setup();

    let (status, _) = send(&app, "GET", "/orders/does-not-exist", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_full_lifecycle() {
    let app = setup();
    let order_id = create_order(&app, 7).await;

    let (status, json) = send(
        &app,
        "POST",
        &format!("/orders/{order_id}/pay"),
        Some(json!({ "payment_method": "alipay" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "paid");
    assert_eq!(json["payment_method"], "alipay");
    assert!(json["paid_at"].is_string());

    let (status, json) = send(&app, "POST", &format!("/orders/{order_id}/ship"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "shipped");

    let (status, json) = send(&app, "POST", &format!("/orders/{order_id}/deliver"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "delivered");
    assert!(json["delivered_at"].is_string());
}

#[tokio::test]
async fn test_illegal_transition_is_conflict() {
    let app = setup();
    let order_id = create_order(&app, 7).await;

    let (status, json) = send(&app, "POST", &format!("/orders/{order_id}/ship"), None).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["current_status"], "pending");
}

#[tokio::test]
async fn test_cancel_and_refund() {
    let app = setup();

    let pending = create_order(&app, 7).await;
    let (status, json) = send(&app, "POST", &format!("/orders/{pending}/cancel"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "cancelled");

    let paid = create_order(&app, 7).await;
    send(
        &app,
        "POST",
        &format!("/orders/{paid}/pay"),
        Some(json!({ "payment_method": "card" })),
    )
    .await;
    let (status, json) = send(&app, "POST", &format!("/orders/{paid}/refund"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "refunded");
}

#[tokio::test]
async fn test_pay_without_method_is_bad_request() {
    let app = setup();
    let order_id = create_order(&app, 7).await;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/orders/{order_id}/pay"),
        Some(json!({ "payment_method": "" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_transition_on_missing_order_is_not_found() {
    let app = setup();

    let (status, _) = send(&app, "POST", "/orders/missing/cancel", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_user_orders() {
    let app = setup();
    let first = create_order(&app, 7).await;
    let second = create_order(&app, 7).await;
    create_order(&app, 8).await;
    send(&app, "POST", &format!("/orders/{first}/cancel"), None).await;

    let (status, json) = send(&app, "GET", "/users/7/orders", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 2);

    let (status, json) = send(&app, "GET", "/users/7/orders?status=pending", None).await;
    assert_eq!(status, StatusCode::OK);
    let orders = json.as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["order_id"], second.as_str());
    assert!(orders[0].get("items").is_none());
}

#[tokio::test]
async fn test_list_orders_rejects_unknown_status() {
    let app = setup();

    let (status, _) = send(&app, "GET", "/users/7/orders?status=lost", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_orders_for_user_zero_is_bad_request() {
    let app = setup();

    let (status, _) = send(&app, "GET", "/users/0/orders", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_store_outage_is_server_error() {
    let (app, store) = setup_with_store();
    store.set_unavailable(true);

    let (status, _) = send(&app, "POST", "/orders", Some(order_body(7))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup();
    create_order(&app, 7).await;

    let (status, _) = send(&app, "GET", "/metrics", None).await;

    assert_eq!(status, StatusCode::OK);
}
