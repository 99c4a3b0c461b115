//! erp_mirror_server: REST server over the mirrored ERP collections.
//!
//! Reads config from env vars (a `.env` file is honoured):
//!   DATABASE_URL      : Postgres connection string (required unless MIRROR_STORE=memory)
//!   MIRROR_JWT_SECRET : JWT HMAC secret (required)
//!   MIRROR_BIND_ADDR  : listen address (default: 0.0.0.0:5000)
//!   MIRROR_ENV        : development | production (default: development)

use erp_mirror_server::config::ServerConfig;
use erp_mirror_server::middleware::jwt::JwtConfig;
use erp_mirror_server::{build_router, open_stores};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,erp_mirror_server=debug".into()),
        )
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    };

    let stores = match open_stores(&config.store).await {
        Ok(stores) => stores,
        Err(e) => {
            tracing::error!("failed to open store: {e:#}");
            std::process::exit(1);
        }
    };

    let jwt_config = JwtConfig::from_secret(config.jwt_secret.as_bytes()).with_ttl(config.token_ttl);
    let app = build_router(stores.documents, stores.users, jwt_config, config.environment);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind to {}: {e}", config.bind_addr));
    tracing::info!(
        "erp_mirror_server listening on {} ({:?})",
        config.bind_addr,
        config.environment
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
        })
        .await
        .expect("server error");
}
