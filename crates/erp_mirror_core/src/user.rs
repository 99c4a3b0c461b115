//! Application users and authenticated callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{MirrorError, Result};

/// A registered user. `password_hash` never leaves the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// Profile view of a user, without the credential secret.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Bearer-token claims issued at login.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// An authenticated caller, constructed only from verified token claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
}

impl Principal {
    pub fn from_claims(claims: &TokenClaims) -> Result<Self> {
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| MirrorError::Authentication("malformed sub claim".into()))?;
        Ok(Self {
            user_id,
            email: claims.email.clone(),
        })
    }
}

/// Capability check for mutating operations.
pub fn require_caller(caller: Option<&Principal>) -> Result<&Principal> {
    caller.ok_or_else(|| MirrorError::Unauthorized("Unauthorized".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(sub: &str) -> TokenClaims {
        TokenClaims {
            sub: sub.into(),
            email: "a@example.com".into(),
            iat: 0,
            exp: 1,
        }
    }

    #[test]
    fn principal_from_valid_claims() {
        let id = Uuid::new_v4();
        let p = Principal::from_claims(&claims(&id.to_string())).unwrap();
        assert_eq!(p.user_id, id);
        assert_eq!(p.email, "a@example.com");
    }

    #[test]
    fn principal_rejects_malformed_sub() {
        assert!(matches!(
            Principal::from_claims(&claims("not-a-uuid")),
            Err(MirrorError::Authentication(_))
        ));
    }

    #[test]
    fn require_caller_without_principal_is_unauthorized() {
        assert!(matches!(
            require_caller(None),
            Err(MirrorError::Unauthorized(_))
        ));
        let p = Principal {
            user_id: Uuid::new_v4(),
            email: "b@example.com".into(),
        };
        assert_eq!(require_caller(Some(&p)).unwrap(), &p);
    }

    #[test]
    fn profile_omits_password_hash() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: "Ann".into(),
            email: "ann@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(UserProfile::from(user)).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "ann@example.com");
    }
}
