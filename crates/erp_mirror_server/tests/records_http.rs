//! HTTP-level tests for the record routes, backed by the in-memory stores.

use axum::body::Body;
use chrono::Utc;
use erp_mirror_core::catalog::CATALOG;
use erp_mirror_core::user::TokenClaims;
use erp_mirror_server::config::Environment;
use erp_mirror_server::middleware::jwt::JwtConfig;
use erp_mirror_server::{build_router, Stores};
use http_body_util::BodyExt;
use hyper::{Request, StatusCode};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

// ── Test JWT helpers ───────────────────────────────────────────

const TEST_JWT_SECRET: &[u8] = b"test-secret-for-http-tests";

fn make_jwt(secret: &[u8], exp_offset_secs: i64) -> String {
    let now = Utc::now().timestamp();
    let claims = TokenClaims {
        sub: Uuid::new_v4().to_string(),
        email: "ops@example.com".into(),
        iat: now,
        exp: now + exp_offset_secs,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
        .expect("failed to encode test JWT")
}

fn valid_jwt() -> String {
    make_jwt(TEST_JWT_SECRET, 3600)
}

// ── Test app builder ───────────────────────────────────────────

fn build_test_app() -> axum::Router {
    let stores = Stores::in_memory();
    build_router(
        stores.documents,
        stores.users,
        JwtConfig::from_secret(TEST_JWT_SECRET),
        Environment::Development,
    )
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    token: Option<&str>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header("authorization", format!("Bearer {token}"));
    }
    let req = match body {
        Some(body) => req
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => req.body(Body::empty()),
    }
    .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    (status, body_json(resp).await)
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| json!({ "raw": String::from_utf8_lossy(&bytes).to_string() }))
}

async fn create_item(app: &axum::Router, code: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/items",
        Some(json!({"ItemCode": code, "ItemName": format!("Item {code}")})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["_id"].as_str().unwrap().to_string()
}

// ── Tests ───────────────────────────────────────────────────────

#[tokio::test]
async fn root_banner_and_health() {
    let app = build_test_app();
    let (status, body) = send(&app, "GET", "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["raw"], json!("API is running... - Dev"));

    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn every_catalog_collection_is_mounted() {
    let app = build_test_app();
    for collection in CATALOG {
        let (status, body) = send(&app, "GET", &format!("/api/{}", collection.route), None, None).await;
        assert_eq!(status, StatusCode::OK, "{}", collection.route);
        assert_eq!(body, json!([]), "{}", collection.route);
    }
}

#[tokio::test]
async fn create_returns_document_with_identity_and_timestamps() {
    let app = build_test_app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/customers",
        Some(json!({"CardCode": "C001", "CardName": "Acme", "Unknown": 1})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(Uuid::parse_str(body["_id"].as_str().unwrap()).is_ok());
    assert_eq!(body["CardCode"], json!("C001"));
    assert!(body.get("Unknown").is_none());
    assert!(body.get("createdAt").is_some());
    assert!(body.get("updatedAt").is_some());
}

#[tokio::test]
async fn create_rejects_invalid_and_duplicate_bodies() {
    let app = build_test_app();
    let (status, _) = send(&app, "POST", "/api/items", Some(json!({"ItemName": "x"})), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    create_item(&app, "DUP").await;
    let (status, _) = send(
        &app,
        "POST",
        "/api/items",
        Some(json!({"ItemCode": "DUP", "ItemName": "again"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn invalid_select_lists_allowed_fields() {
    let app = build_test_app();
    let (status, body) = send(&app, "GET", "/api/items?select=ItemCode,Bogus", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("Invalid select field(s): Bogus"));
    let allowed = body["allowedFields"].as_array().unwrap();
    assert!(allowed.contains(&json!("ItemCode")));
    assert!(allowed.contains(&json!("_id")));
}

#[tokio::test]
async fn select_projects_fields() {
    let app = build_test_app();
    create_item(&app, "P1").await;
    let (status, body) = send(&app, "GET", "/api/items?select=ItemName", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let doc = &body[0];
    assert_eq!(doc["ItemName"], json!("Item P1"));
    assert!(doc.get("ItemCode").is_none());
}

#[tokio::test]
async fn pagination_and_filter_fallback() {
    let app = build_test_app();
    for i in 0..12 {
        create_item(&app, &format!("I{i:02}")).await;
    }

    let (status, body) = send(&app, "GET", "/api/items?page=2&per_page=5", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["pagination"],
        json!({"total": 12, "totalPages": 3, "currentPage": 2, "perPage": 5})
    );
    assert_eq!(body["data"][0]["ItemCode"], json!("I05"));

    let (_, body) = send(&app, "GET", "/api/items?page=1&per_page=5&ItemCode=I03", None, None).await;
    assert_eq!(body["pagination"]["total"], json!(1));

    // No match: the filter is dropped and the whole collection is paged.
    let (_, body) = send(&app, "GET", "/api/items?page=1&per_page=5&ItemCode=nope", None, None).await;
    assert_eq!(body["pagination"]["total"], json!(12));
    assert_eq!(body["data"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn repeated_query_parameter_uses_last_value() {
    let app = build_test_app();
    create_item(&app, "A").await;
    create_item(&app, "B").await;
    let (_, body) = send(&app, "GET", "/api/items?ItemCode=A&ItemCode=B", None, None).await;
    let docs = body.as_array().unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0]["ItemCode"], json!("B"));
}

#[tokio::test]
async fn uncastable_filter_is_bad_request() {
    let app = build_test_app();
    let (status, _) = send(&app, "GET", "/api/sales-employees?SalesEmployeeCode=abc", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn read_one_found_missing_and_malformed() {
    let app = build_test_app();
    let id = create_item(&app, "R1").await;

    let (status, body) = send(&app, "GET", &format!("/api/items/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ItemCode"], json!("R1"));

    let (status, body) = send(&app, "GET", &format!("/api/items/{}", Uuid::new_v4()), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], json!("Not found"));

    let (status, _) = send(&app, "GET", "/api/items/not-a-uuid", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_without_token_is_rejected_and_does_not_mutate() {
    let app = build_test_app();
    let id = create_item(&app, "U1").await;
    let uri = format!("/api/items/{id}");

    let (status, body) = send(&app, "PUT", &uri, Some(json!({"ItemName": "Changed"})), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], json!("Unauthorized"));

    let bad = make_jwt(b"some-other-secret", 3600);
    let (status, _) = send(&app, "PUT", &uri, Some(json!({"ItemName": "Changed"})), Some(&bad)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let expired = make_jwt(TEST_JWT_SECRET, -3600);
    let (status, _) = send(&app, "PUT", &uri, Some(json!({"ItemName": "Changed"})), Some(&expired)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, body) = send(&app, "GET", &uri, None, None).await;
    assert_eq!(body["ItemName"], json!("Item U1"));
}

#[tokio::test]
async fn update_with_token_merges_fields() {
    let app = build_test_app();
    let id = create_item(&app, "U2").await;
    let uri = format!("/api/items/{id}");
    let token = valid_jwt();

    let (status, body) = send(&app, "PUT", &uri, Some(json!({"SalesUnit": "Box"})), Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["SalesUnit"], json!("Box"));
    assert_eq!(body["ItemName"], json!("Item U2"));

    let (status, _) = send(&app, "PUT", &uri, Some(json!({"ItemCode": "OTHER"})), Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/items/{}", Uuid::new_v4()),
        Some(json!({"SalesUnit": "Box"})),
        Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/items/{}", Uuid::new_v4()),
        Some(json!({"ItemCode": ""})),
        Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_requires_token_and_reports_missing() {
    let app = build_test_app();
    let id = create_item(&app, "D1").await;
    let uri = format!("/api/items/{id}");

    let (status, _) = send(&app, "DELETE", &uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = valid_jwt();
    let (status, body) = send(&app, "DELETE", &uri, None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("Deleted successfully"));

    let (status, body) = send(&app, "DELETE", &uri, None, Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], json!("Not found"));
}

#[tokio::test]
async fn malformed_json_body_is_bad_request() {
    let app = build_test_app();
    let req = Request::builder()
        .method("POST")
        .uri("/api/items")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
