//! Registration, login and profile.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::json;

use erp_mirror_core::error::MirrorError;
use erp_mirror_core::ports::UserStore;
use erp_mirror_core::user::{NewUser, Principal, UserProfile};

use crate::error::AppError;
use crate::middleware::jwt::{bearer_token, JwtConfig};
use crate::password::{hash_password, verify_password};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Trimmed, non-empty value or `None`.
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub async fn register(
    Extension(users): Extension<Arc<dyn UserStore>>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let (Some(name), Some(email), Some(password)) =
        (present(req.name), present(req.email), req.password.filter(|p| !p.is_empty()))
    else {
        return Err(MirrorError::Validation("All fields are required".into()).into());
    };

    if users.find_user_by_email(&email).await?.is_some() {
        return Err(MirrorError::Conflict("Email already registered".into()).into());
    }

    let user = users
        .create_user(NewUser {
            name,
            email,
            password_hash: hash_password(&password)?,
        })
        .await?;
    tracing::info!(user_id = %user.id, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User registered successfully", "userId": user.id })),
    ))
}

pub async fn login(
    Extension(users): Extension<Arc<dyn UserStore>>,
    Extension(jwt): Extension<JwtConfig>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let (Some(email), Some(password)) = (present(req.email), req.password.filter(|p| !p.is_empty()))
    else {
        return Err(MirrorError::Validation("Email and password are required".into()).into());
    };

    let invalid = || MirrorError::Authentication("Invalid email or password".into());
    let user = users.find_user_by_email(&email).await?.ok_or_else(invalid)?;
    if !verify_password(&password, &user.password_hash) {
        return Err(invalid().into());
    }

    let token = jwt.issue(&user)?;
    Ok(Json(json!({ "token": token })))
}

pub async fn profile(
    Extension(users): Extension<Arc<dyn UserStore>>,
    Extension(jwt): Extension<JwtConfig>,
    headers: HeaderMap,
) -> Result<Json<UserProfile>, AppError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| MirrorError::Authentication("No token provided".into()))?;
    let principal = jwt
        .verify(token)
        .and_then(|claims| Principal::from_claims(&claims))?;

    let user = users
        .find_user_by_id(principal.user_id)
        .await?
        .ok_or_else(|| MirrorError::NotFound("User not found".into()))?;
    Ok(Json(UserProfile::from(user)))
}
