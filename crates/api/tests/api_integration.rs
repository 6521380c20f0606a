//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::ProductId;
use domain::Product;
use metrics_exporter_prometheus::PrometheusHandle;
use saga::ServiceConfig;
use store::InMemoryDocumentStore;
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

type State = Arc<api::routes::documents::AppState<InMemoryDocumentStore>>;

async fn setup() -> (axum::Router, State, ProductId) {
    let state = api::create_default_state(InMemoryDocumentStore::new(), ServiceConfig::default());
    let product_id = ProductId::new();
    state
        .catalog
        .insert_product(Product::new(product_id, "Widget"))
        .await;
    let app = api::create_app(state.clone(), get_metrics_handle());
    (app, state, product_id)
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

fn create_body(product_id: ProductId, status: &str) -> serde_json::Value {
    serde_json::json!({
        "header": {
            "business_id": uuid::Uuid::new_v4(),
            "date": "2024-03-01",
            "status": status,
            "tax_rate": "0.18"
        },
        "items": [
            { "product_id": product_id, "quantity": 2, "unit_price": "10" },
            { "product_id": product_id, "quantity": 1, "unit_price": "5", "discount": "1" }
        ]
    })
}

#[tokio::test]
async fn test_health_check() {
    let (app, _, _) = setup().await;
    let (status, json) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_create_and_get_sale() {
    let (app, _, product_id) = setup().await;

    let (status, created) = send(&app, "POST", "/sales", Some(create_body(product_id, "draft"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "draft");
    assert_eq!(created["total_amount"], "28.32");
    let id = created["id"].as_str().unwrap();

    let (status, detail) = send(&app, "GET", &format!("/sales/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["lines"].as_array().unwrap().len(), 2);
    assert_eq!(detail["lines"][0]["product_name"], "Widget");
    assert_eq!(detail["totals"]["tax_amount"], "4.32");

    // Sales are not visible as purchases
    let (status, _) = send(&app, "GET", &format!("/purchases/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_collection_is_not_found() {
    let (app, _, product_id) = setup().await;
    let (status, _) = send(&app, "POST", "/orders", Some(create_body(product_id, "draft"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_validation_error_is_bad_request() {
    let (app, _, _) = setup().await;
    let body = serde_json::json!({
        "header": { "business_id": uuid::Uuid::new_v4(), "date": "2024-03-01" },
        "items": []
    });

    let (status, json) = send(&app, "POST", "/purchases", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("at least one item"));
}

#[tokio::test]
async fn test_unrepresentable_amount_is_bad_request() {
    let (app, _, product_id) = setup().await;
    let body = serde_json::json!({
        "header": { "business_id": uuid::Uuid::new_v4(), "date": "2024-03-01" },
        "items": [
            { "product_id": product_id, "quantity": 2, "unit_price": "79228162514264337593543950335" }
        ]
    });

    let (status, json) = send(&app, "POST", "/sales", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("line 1"));
}

#[tokio::test]
async fn test_list_rejects_unknown_sort_column() {
    let (app, _, _) = setup().await;
    let (status, _) = send(&app, "GET", "/sales?sort_by=drop_table", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_pages() {
    let (app, _, product_id) = setup().await;
    for _ in 0..3 {
        send(&app, "POST", "/purchases", Some(create_body(product_id, "draft"))).await;
    }

    let (status, page) = send(&app, "GET", "/purchases?page=2&page_size=2&sort_by=code&sort_direction=asc", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 3);
    assert_eq!(page["page"], 2);
    assert_eq!(page["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_status_change_and_delete() {
    let (app, state, product_id) = setup().await;
    let (_, created) = send(&app, "POST", "/purchases", Some(create_body(product_id, "pending"))).await;
    let id = created["id"].as_str().unwrap().to_string();

    let (status, completed) = send(
        &app,
        "POST",
        &format!("/purchases/{id}/status"),
        Some(serde_json::json!({ "status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["status"], "completed");
    assert_eq!(state.ledger.stock_level(product_id, None).await, 3);

    let (status, _) = send(&app, "DELETE", &format!("/purchases/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(state.ledger.stock_level(product_id, None).await, 0);

    let (status, _) = send(&app, "GET", &format!("/purchases/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ledger_failure_is_bad_gateway() {
    let (app, state, product_id) = setup().await;
    state.ledger.set_fail_on_apply(true).await;

    let (status, json) = send(&app, "POST", "/sales", Some(create_body(product_id, "completed"))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["step"], "apply_movement");

    let id = json["document_id"].as_str().unwrap();
    let (_, detail) = send(&app, "GET", &format!("/sales/{id}"), None).await;
    assert_eq!(detail["document"]["status"], "pending");
}

#[tokio::test]
async fn test_stale_update_is_conflict() {
    let (app, _, product_id) = setup().await;
    let (_, created) = send(&app, "POST", "/sales", Some(create_body(product_id, "draft"))).await;
    let id = created["id"].as_str().unwrap().to_string();

    let mut body = create_body(product_id, "draft");
    body["expected_version"] = serde_json::json!(1);
    let (status, updated) = send(&app, "PUT", &format!("/sales/{id}"), Some(body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["version"], 2);

    let (status, _) = send(&app, "PUT", &format!("/sales/{id}"), Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_invalid_id_is_bad_request() {
    let (app, _, _) = setup().await;
    let (status, _) = send(&app, "GET", "/sales/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _, _) = setup().await;
    let (status, _) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
