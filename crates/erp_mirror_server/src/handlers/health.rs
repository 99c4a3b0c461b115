use axum::{Extension, Json};
use serde_json::{json, Value};

use crate::config::Environment;

pub async fn banner(Extension(env): Extension<Environment>) -> String {
    format!("API is running... - {}", env.banner_label())
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
