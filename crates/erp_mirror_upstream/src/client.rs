//! Service-layer HTTP client.
//!
//! Logs in with `POST /Login` and reads OData pages with the session carried
//! in the `B1SESSION` cookie.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, COOKIE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use erp_mirror_core::error::MirrorError;
use erp_mirror_core::ports::{
    SessionCredential, SessionProvider, UpstreamCredentials, UpstreamFetcher,
};
use erp_mirror_core::record::Record;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ServiceLayerConfig {
    /// Service root, e.g. `https://erp.local:50000/b1s/v1`.
    pub base_url: Url,
    pub timeout: Duration,
    /// Service-layer installs commonly run with self-signed certificates.
    pub accept_invalid_certs: bool,
}

impl ServiceLayerConfig {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid service layer URL: {base_url}"))?;
        Ok(Self {
            base_url,
            timeout: DEFAULT_TIMEOUT,
            accept_invalid_certs: false,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct LoginRequest<'a> {
    user_name: &'a str,
    password: &'a str,
    #[serde(rename = "CompanyDB")]
    company_db: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(rename = "SessionId")]
    session_id: Option<String>,
}

#[derive(Deserialize)]
struct ODataPage {
    #[serde(default)]
    value: Option<Vec<Record>>,
}

pub struct ServiceLayerClient {
    client: Client,
    base: String,
}

impl ServiceLayerClient {
    pub fn new(config: &ServiceLayerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base: config.base_url.as_str().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base, endpoint)
    }
}

fn status_line(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    }
}

#[async_trait]
impl SessionProvider for ServiceLayerClient {
    async fn authenticate(
        &self,
        credentials: &UpstreamCredentials,
    ) -> erp_mirror_core::Result<SessionCredential> {
        let body = LoginRequest {
            user_name: &credentials.user_name,
            password: &credentials.password,
            company_db: &credentials.company_db,
        };

        let response = self
            .client
            .post(self.url("/Login"))
            .json(&body)
            .send()
            .await
            .context("Login request failed")
            .map_err(|e| MirrorError::Authentication(format!("{e:#}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MirrorError::Authentication(format!(
                "Login failed: {}",
                status_line(status)
            )));
        }

        let login: LoginResponse = response
            .json()
            .await
            .context("Failed to parse login response")
            .map_err(|e| MirrorError::Authentication(format!("{e:#}")))?;

        let session_id = login
            .session_id
            .filter(|s| !s.is_empty())
            .ok_or_else(|| MirrorError::Authentication("Login response had no SessionId".into()))?;

        tracing::info!(company = %credentials.company_db, "logged in to service layer");
        Ok(SessionCredential::new(session_id))
    }
}

#[async_trait]
impl UpstreamFetcher for ServiceLayerClient {
    async fn fetch(
        &self,
        session: &SessionCredential,
        endpoint: &str,
    ) -> erp_mirror_core::Result<Vec<Record>> {
        let response = self
            .client
            .get(self.url(endpoint))
            .header(CONTENT_TYPE, "application/json")
            .header(COOKIE, format!("B1SESSION={}", session.expose()))
            .send()
            .await
            .with_context(|| format!("Fetch failed {endpoint}"))
            .map_err(|e| MirrorError::upstream(None, format!("{e:#}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MirrorError::upstream(
                Some(status.as_u16()),
                format!("Fetch failed {endpoint}: {}", status_line(status)),
            ));
        }

        let page: ODataPage = response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {endpoint}"))
            .map_err(|e| MirrorError::upstream(Some(status.as_u16()), format!("{e:#}")))?;

        let records = page.value.unwrap_or_default();
        tracing::debug!(%endpoint, records = records.len(), "fetched upstream page");
        Ok(records)
    }
}
