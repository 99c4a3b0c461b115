//! Store backend selection.

use std::sync::Arc;

use anyhow::Context;
use erp_mirror_core::memory::{MemoryDocumentStore, MemoryUserStore};
use erp_mirror_core::ports::{DocumentStore, UserStore};
use erp_mirror_postgres::{connect, mask_database_url, PgStores};

use crate::config::{StoreBackend, StoreConfig};

#[derive(Clone)]
pub struct Stores {
    pub documents: Arc<dyn DocumentStore>,
    pub users: Arc<dyn UserStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            documents: Arc::new(MemoryDocumentStore::new()),
            users: Arc::new(MemoryUserStore::new()),
        }
    }
}

pub async fn open_stores(config: &StoreConfig) -> anyhow::Result<Stores> {
    match config.backend {
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store; data is lost on exit");
            Ok(Stores::in_memory())
        }
        StoreBackend::Postgres => {
            let database = config
                .database
                .as_ref()
                .context("postgres backend selected without a database config")?;
            tracing::info!(url = %mask_database_url(&database.database_url), "connecting to postgres");
            let pool = connect(database).await?;
            let pg = PgStores::new(pool);
            Ok(Stores {
                documents: Arc::new(pg.documents),
                users: Arc::new(pg.users),
            })
        }
    }
}
