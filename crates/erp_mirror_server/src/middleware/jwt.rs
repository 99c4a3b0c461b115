//! Bearer-token handling.
//!
//! `optional_auth` runs on every route: a valid token attaches a
//! [`Principal`] to the request, anything else leaves it anonymous.
//! `require_caller` guards mutating routes and rejects anonymous requests
//! before the handler runs.

use axum::extract::Request;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Extension;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use erp_mirror_core::error::MirrorError;
use erp_mirror_core::user::{Principal, TokenClaims, User};

use crate::error::AppError;

/// HS256 signing and verification keys plus the issued-token lifetime.
#[derive(Clone)]
pub struct JwtConfig {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: chrono::Duration,
}

impl JwtConfig {
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: chrono::Duration::days(7),
        }
    }

    pub fn with_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn issue(&self, user: &User) -> Result<String, MirrorError> {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| MirrorError::Internal(anyhow::anyhow!("token signing failed: {e}")))
    }

    /// Signature and expiry are both checked.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, MirrorError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<TokenClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| MirrorError::Authentication("Invalid or expired token".into()))
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub async fn optional_auth(
    Extension(jwt): Extension<JwtConfig>,
    mut req: Request,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(req.headers()) {
        match jwt
            .verify(token)
            .and_then(|claims| Principal::from_claims(&claims))
        {
            Ok(principal) => {
                req.extensions_mut().insert(principal);
            }
            Err(e) => tracing::debug!(error = %e, "ignoring unusable bearer token"),
        }
    }
    next.run(req).await
}

pub async fn require_caller(req: Request, next: Next) -> Response {
    if req.extensions().get::<Principal>().is_none() {
        return AppError::from(MirrorError::Unauthorized("Unauthorized".into())).into_response();
    }
    next.run(req).await
}
