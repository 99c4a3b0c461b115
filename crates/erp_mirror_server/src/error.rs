//! HTTP error mapping.
//!
//! Client faults carry `{message}` (plus `allowedFields` for bad projections).
//! Server faults carry `{message: "Server error while <op>", error}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use erp_mirror_core::crud::RecordOp;
use erp_mirror_core::error::MirrorError;
use serde_json::json;

#[derive(Debug)]
pub struct AppError {
    error: MirrorError,
    op: Option<RecordOp>,
}

impl AppError {
    /// Tag an error with the record operation that produced it.
    pub fn during(op: RecordOp) -> impl FnOnce(MirrorError) -> AppError {
        move |error| AppError {
            error,
            op: Some(op),
        }
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.error.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<MirrorError> for AppError {
    fn from(error: MirrorError) -> Self {
        Self { error, op: None }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self.error {
            MirrorError::InvalidField {
                invalid_fields,
                allowed_fields,
            } => json!({
                "message": format!("Invalid select field(s): {}", invalid_fields.join(", ")),
                "allowedFields": allowed_fields,
            }),
            e if e.is_server_fault() => {
                tracing::error!(error = %e, op = ?self.op, "request failed");
                let message = match self.op {
                    Some(op) => format!("Server error while {}", op.describe()),
                    None => "Server error".to_string(),
                };
                json!({ "message": message, "error": e.to_string() })
            }
            MirrorError::Validation(message)
            | MirrorError::Authentication(message)
            | MirrorError::Unauthorized(message)
            | MirrorError::NotFound(message)
            | MirrorError::Conflict(message) => json!({ "message": message }),
            other => json!({ "message": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
