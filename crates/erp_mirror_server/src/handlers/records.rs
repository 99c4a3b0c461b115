//! Record routes, one instantiation per catalog collection.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde_json::{json, Value};

use erp_mirror_core::catalog::Collection;
use erp_mirror_core::crud::{ListResponse, RecordHandler, RecordOp};
use erp_mirror_core::error::MirrorError;
use erp_mirror_core::query::ListQuery;
use erp_mirror_core::user::Principal;

use crate::error::AppError;

fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, MirrorError> {
    body.map(|Json(v)| v)
        .map_err(|rejection| MirrorError::Validation(rejection.body_text()))
}

pub async fn create<C: Collection>(
    Extension(handler): Extension<RecordHandler<C>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let body = json_body(body).map_err(AppError::during(RecordOp::Create))?;
    let created = handler
        .create(&body)
        .await
        .map_err(AppError::during(RecordOp::Create))?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list<C: Collection>(
    Extension(handler): Extension<RecordHandler<C>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<ListResponse>, AppError> {
    let query = ListQuery::from_pairs(pairs);
    handler
        .read_all(&query)
        .await
        .map(Json)
        .map_err(AppError::during(RecordOp::ReadAll))
}

pub async fn read_one<C: Collection>(
    Extension(handler): Extension<RecordHandler<C>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    handler
        .read_one(&id)
        .await
        .map(Json)
        .map_err(AppError::during(RecordOp::ReadOne))
}

pub async fn update<C: Collection>(
    Extension(handler): Extension<RecordHandler<C>>,
    caller: Option<Extension<Principal>>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let caller = caller.map(|Extension(p)| p);
    let body = json_body(body).map_err(AppError::during(RecordOp::Update))?;
    handler
        .update(caller.as_ref(), &id, &body)
        .await
        .map(Json)
        .map_err(AppError::during(RecordOp::Update))
}

pub async fn remove<C: Collection>(
    Extension(handler): Extension<RecordHandler<C>>,
    caller: Option<Extension<Principal>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let caller = caller.map(|Extension(p)| p);
    handler
        .remove(caller.as_ref(), &id)
        .await
        .map_err(AppError::during(RecordOp::Remove))?;
    Ok(Json(json!({ "message": "Deleted successfully" })))
}
