//! Service-layer client against a throwaway in-process HTTP server.

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::extract::Query;
use axum::http::{header::COOKIE, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use erp_mirror_core::error::MirrorError;
use erp_mirror_core::ports::{
    SessionCredential, SessionProvider, UpstreamCredentials, UpstreamFetcher,
};
use erp_mirror_upstream::{ServiceLayerClient, ServiceLayerConfig};
use serde_json::{json, Value};
use tokio::net::TcpListener;

const SESSION: &str = "4f1c-session";

async fn login(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["UserName"] == "manager" && body["Password"] == "secret" && body["CompanyDB"] == "SBODEMO"
    {
        (
            StatusCode::OK,
            Json(json!({"SessionId": SESSION, "Version": "1000190", "SessionTimeout": 30})),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": {"code": 100000027, "message": "Login failed"}})),
        )
    }
}

fn has_session(headers: &HeaderMap) -> bool {
    headers
        .get(COOKIE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("B1SESSION={SESSION}"))
}

async fn items(
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    if !has_session(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({})));
    }
    let skip: usize = params.get("$skip").and_then(|s| s.parse().ok()).unwrap_or(0);
    let top: usize = params.get("$top").and_then(|s| s.parse().ok()).unwrap_or(20);
    let all: Vec<Value> = (0..3)
        .map(|i| json!({"ItemCode": format!("A{i}"), "ItemName": format!("Item {i}")}))
        .collect();
    let page: Vec<Value> = all.into_iter().skip(skip).take(top).collect();
    (
        StatusCode::OK,
        Json(json!({"odata.metadata": "$metadata#Items", "value": page})),
    )
}

async fn spawn_service_layer() -> SocketAddr {
    let app = Router::new()
        .route("/b1s/v1/Login", post(login))
        .route("/b1s/v1/Items", get(items))
        .route("/b1s/v1/NoValue", get(|| async { Json(json!({})) }))
        .route(
            "/b1s/v1/Broken",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client(addr: SocketAddr) -> ServiceLayerClient {
    let config = ServiceLayerConfig::new(&format!("http://{addr}/b1s/v1")).unwrap();
    ServiceLayerClient::new(&config).unwrap()
}

fn credentials(password: &str) -> UpstreamCredentials {
    UpstreamCredentials {
        user_name: "manager".into(),
        password: password.into(),
        company_db: "SBODEMO".into(),
    }
}

#[tokio::test]
async fn login_returns_session_id() {
    let addr = spawn_service_layer().await;
    let session = client(addr).authenticate(&credentials("secret")).await.unwrap();
    assert_eq!(session.expose(), SESSION);
}

#[tokio::test]
async fn rejected_login_is_authentication_error() {
    let addr = spawn_service_layer().await;
    let err = client(addr)
        .authenticate(&credentials("wrong"))
        .await
        .unwrap_err();
    match err {
        MirrorError::Authentication(msg) => assert!(msg.contains("401")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_login_is_authentication_error() {
    let config = ServiceLayerConfig::new("http://127.0.0.1:1/b1s/v1").unwrap();
    let client = ServiceLayerClient::new(&config).unwrap();
    assert!(matches!(
        client.authenticate(&credentials("secret")).await,
        Err(MirrorError::Authentication(_))
    ));
}

#[tokio::test]
async fn fetch_pages_with_session_cookie() {
    let addr = spawn_service_layer().await;
    let client = client(addr);
    let session = client.authenticate(&credentials("secret")).await.unwrap();

    let first = client.fetch(&session, "/Items?$skip=0&$top=2").await.unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first[0]["ItemCode"], json!("A0"));

    let last = client.fetch(&session, "/Items?$skip=2&$top=2").await.unwrap();
    assert_eq!(last.len(), 1);

    let empty = client.fetch(&session, "/Items?$skip=4&$top=2").await.unwrap();
    assert!(empty.is_empty());
}

#[tokio::test]
async fn missing_value_is_an_empty_page() {
    let addr = spawn_service_layer().await;
    let records = client(addr)
        .fetch(&SessionCredential::new(SESSION), "/NoValue")
        .await
        .unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn expired_session_reports_401() {
    let addr = spawn_service_layer().await;
    let err = client(addr)
        .fetch(&SessionCredential::new("stale"), "/Items?$skip=0&$top=1")
        .await
        .unwrap_err();
    assert!(err.is_upstream_unauthorized());
}

#[tokio::test]
async fn non_success_status_is_upstream_error() {
    let addr = spawn_service_layer().await;
    let err = client(addr)
        .fetch(&SessionCredential::new(SESSION), "/Broken")
        .await
        .unwrap_err();
    match err {
        MirrorError::Upstream { status, message } => {
            assert_eq!(status, Some(500));
            assert_eq!(message, "Fetch failed /Broken: 500 Internal Server Error");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
