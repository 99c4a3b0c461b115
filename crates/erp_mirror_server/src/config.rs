//! Environment configuration for the server and the seed CLI.
//!
//! Values are read through a lookup function so tests can supply a map
//! instead of touching the process environment. Missing required variables
//! are collected and reported together.

use std::str::FromStr;
use std::time::Duration;

use erp_mirror_core::ports::UpstreamCredentials;
use erp_mirror_core::reconcile::{ReconcileOptions, DEFAULT_MAX_PAGES, DEFAULT_PAGE_SIZE};
use erp_mirror_postgres::DatabaseConfig;
use erp_mirror_upstream::ServiceLayerConfig;
use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";
pub const DEFAULT_TOKEN_TTL_DAYS: i64 = 7;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variables: {}", .0.join(", "))]
    Missing(Vec<String>),

    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Suffix for the root banner.
    pub fn banner_label(&self) -> &'static str {
        match self {
            Environment::Development => "Dev",
            Environment::Production => "Prod",
        }
    }
}

impl FromStr for Environment {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(()),
        }
    }
}

/// Accumulates lookups so every missing variable is reported at once.
struct EnvReader<F> {
    lookup: F,
    missing: Vec<String>,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<F> {
    fn new(lookup: F) -> Self {
        Self {
            lookup,
            missing: Vec::new(),
        }
    }

    fn optional(&self, var: &str) -> Option<String> {
        (self.lookup)(var).filter(|v| !v.trim().is_empty())
    }

    fn required(&mut self, var: &str) -> String {
        match self.optional(var) {
            Some(v) => v,
            None => {
                self.missing.push(var.to_string());
                String::new()
            }
        }
    }

    fn parsed<T: FromStr>(&self, var: &'static str, default: T) -> Result<T, ConfigError> {
        match self.optional(var) {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { var, value }),
            None => Ok(default),
        }
    }

    fn finish(self) -> Result<(), ConfigError> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Missing(self.missing))
        }
    }
}

/// Store selection shared by both binaries.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Present when `backend` is `Postgres`.
    pub database: Option<DatabaseConfig>,
}

impl StoreConfig {
    fn read<F: Fn(&str) -> Option<String>>(env: &mut EnvReader<F>) -> Result<Self, ConfigError> {
        let backend = env.parsed("MIRROR_STORE", StoreBackend::Postgres)?;
        let database = match backend {
            StoreBackend::Postgres => {
                let url = env.required("DATABASE_URL");
                let pool_size = env.parsed("DATABASE_POOL_SIZE", 10u32)?;
                Some(DatabaseConfig::new(url).with_max_connections(pool_size))
            }
            StoreBackend::Memory => None,
        };
        Ok(Self { backend, database })
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub environment: Environment,
    pub bind_addr: String,
    pub store: StoreConfig,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self, ConfigError> {
        let mut env = EnvReader::new(lookup);
        let environment = env.parsed("MIRROR_ENV", Environment::Development)?;
        let bind_addr = env
            .optional("MIRROR_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let store = StoreConfig::read(&mut env)?;
        let jwt_secret = env.required("MIRROR_JWT_SECRET");
        let ttl_days = env.parsed("MIRROR_TOKEN_TTL_DAYS", DEFAULT_TOKEN_TTL_DAYS)?;
        env.finish()?;

        Ok(Self {
            environment,
            bind_addr,
            store,
            jwt_secret,
            token_ttl: chrono::Duration::days(ttl_days),
        })
    }
}

#[derive(Debug, Clone)]
pub struct SeedConfig {
    pub store: StoreConfig,
    pub upstream: ServiceLayerConfig,
    pub credentials: UpstreamCredentials,
    pub options: ReconcileOptions,
}

impl SeedConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self, ConfigError> {
        let mut env = EnvReader::new(lookup);
        let store = StoreConfig::read(&mut env)?;
        let uri = env.required("SAP_URI");
        let credentials = UpstreamCredentials {
            user_name: env.required("SAP_USER"),
            password: env.required("SAP_PASSWORD"),
            company_db: env.required("SAP_COMPANY"),
        };
        let accept_invalid_certs = env.parsed("SAP_ACCEPT_INVALID_CERTS", false)?;
        let timeout_secs = env.parsed("SAP_TIMEOUT_SECS", 30u64)?;
        let options = ReconcileOptions {
            page_size: env.parsed("MIRROR_SYNC_PAGE_SIZE", DEFAULT_PAGE_SIZE)?,
            max_pages: env.parsed("MIRROR_SYNC_MAX_PAGES", DEFAULT_MAX_PAGES)?,
        };
        env.finish()?;

        let upstream = ServiceLayerConfig::new(&uri)?
            .with_timeout(Duration::from_secs(timeout_secs))
            .accept_invalid_certs(accept_invalid_certs);

        Ok(Self {
            store,
            upstream,
            credentials,
            options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn server_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/mirror"),
            ("MIRROR_JWT_SECRET", "s3cret"),
        ]))
        .unwrap();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.store.backend, StoreBackend::Postgres);
        assert_eq!(config.store.database.unwrap().max_connections, 10);
        assert_eq!(config.token_ttl, chrono::Duration::days(7));
    }

    #[test]
    fn missing_variables_are_reported_together() {
        let err = ServerConfig::from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing environment variables: DATABASE_URL, MIRROR_JWT_SECRET"
        );
    }

    #[test]
    fn memory_store_needs_no_database() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("MIRROR_STORE", "memory"),
            ("MIRROR_JWT_SECRET", "s3cret"),
            ("MIRROR_ENV", "production"),
        ]))
        .unwrap();
        assert!(config.store.database.is_none());
        assert_eq!(config.environment.banner_label(), "Prod");
    }

    #[test]
    fn invalid_number_is_rejected() {
        let err = ServerConfig::from_lookup(lookup(&[
            ("MIRROR_STORE", "memory"),
            ("MIRROR_JWT_SECRET", "s3cret"),
            ("MIRROR_TOKEN_TTL_DAYS", "seven"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                var: "MIRROR_TOKEN_TTL_DAYS",
                ..
            }
        ));
    }

    #[test]
    fn seed_config_reads_upstream_and_sync_options() {
        let config = SeedConfig::from_lookup(lookup(&[
            ("MIRROR_STORE", "memory"),
            ("SAP_URI", "https://erp.local:50000/b1s/v1"),
            ("SAP_USER", "manager"),
            ("SAP_PASSWORD", "pw"),
            ("SAP_COMPANY", "SBODEMO"),
            ("SAP_ACCEPT_INVALID_CERTS", "true"),
            ("MIRROR_SYNC_PAGE_SIZE", "50"),
        ]))
        .unwrap();
        assert!(config.upstream.accept_invalid_certs);
        assert_eq!(config.upstream.timeout, Duration::from_secs(30));
        assert_eq!(config.options.page_size, 50);
        assert_eq!(config.options.max_pages, DEFAULT_MAX_PAGES);
        assert_eq!(config.credentials.company_db, "SBODEMO");
    }

    #[test]
    fn seed_config_lists_every_missing_upstream_var() {
        let err = SeedConfig::from_lookup(lookup(&[("MIRROR_STORE", "memory")])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing environment variables: SAP_URI, SAP_USER, SAP_PASSWORD, SAP_COMPANY"
        );
    }
}
