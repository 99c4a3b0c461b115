use thiserror::Error;

pub type Result<T> = std::result::Result<T, MirrorError>;

#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid field(s): {}", .invalid_fields.join(", "))]
    InvalidField {
        invalid_fields: Vec<String>,
        allowed_fields: Vec<String>,
    },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("upstream error{}: {message}", .status.map(|s| format!(" {s}")).unwrap_or_default())]
    Upstream { status: Option<u16>, message: String },

    #[error("store: {0}")]
    Store(#[source] anyhow::Error),

    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}

impl MirrorError {
    pub fn upstream(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
        }
    }

    pub fn store(err: impl Into<anyhow::Error>) -> Self {
        Self::Store(err.into())
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Authentication(_) => 401,
            Self::Unauthorized(_) => 401,
            Self::NotFound(_) => 404,
            Self::InvalidField { .. } => 400,
            Self::Conflict(_) => 409,
            Self::Upstream { .. } => 502,
            Self::Store(_) => 500,
            Self::Internal(_) => 500,
        }
    }

    /// True for faults on our side of the wire (reported as 5xx).
    pub fn is_server_fault(&self) -> bool {
        self.http_status() >= 500
    }

    /// Upstream 401 usually means the session credential expired mid-run.
    pub fn is_upstream_unauthorized(&self) -> bool {
        matches!(self, Self::Upstream { status: Some(401), .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_client_faults() {
        assert_eq!(MirrorError::Validation("x".into()).http_status(), 400);
        assert_eq!(MirrorError::Unauthorized("x".into()).http_status(), 401);
        assert_eq!(MirrorError::NotFound("x".into()).http_status(), 404);
        assert_eq!(MirrorError::Conflict("x".into()).http_status(), 409);
        let invalid = MirrorError::InvalidField {
            invalid_fields: vec!["bogus".into()],
            allowed_fields: vec!["a".into()],
        };
        assert_eq!(invalid.http_status(), 400);
    }

    #[test]
    fn http_status_server_faults() {
        assert_eq!(MirrorError::upstream(Some(503), "down").http_status(), 502);
        assert_eq!(
            MirrorError::store(anyhow::anyhow!("pool closed")).http_status(),
            500
        );
        assert!(MirrorError::Internal(anyhow::anyhow!("boom")).is_server_fault());
        assert!(!MirrorError::NotFound("x".into()).is_server_fault());
    }

    #[test]
    fn display_invalid_field_lists_all() {
        let e = MirrorError::InvalidField {
            invalid_fields: vec!["bogus".into(), "nope".into()],
            allowed_fields: vec![],
        };
        assert_eq!(e.to_string(), "invalid field(s): bogus, nope");
    }

    #[test]
    fn display_upstream_with_and_without_status() {
        assert_eq!(
            MirrorError::upstream(Some(404), "Fetch failed /Items").to_string(),
            "upstream error 404: Fetch failed /Items"
        );
        assert_eq!(
            MirrorError::upstream(None, "connection refused").to_string(),
            "upstream error: connection refused"
        );
    }

    #[test]
    fn upstream_unauthorized_detection() {
        assert!(MirrorError::upstream(Some(401), "expired").is_upstream_unauthorized());
        assert!(!MirrorError::upstream(Some(500), "boom").is_upstream_unauthorized());
        assert!(!MirrorError::Unauthorized("x".into()).is_upstream_unauthorized());
    }
}
