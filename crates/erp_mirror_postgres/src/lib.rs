//! PostgreSQL adapter for the ERP mirror: implements the core store ports
//! over a shared JSONB document table.

pub mod pool;
pub mod store;

use sqlx::PgPool;

pub use pool::{connect, ensure_schema, mask_database_url, DatabaseConfig};
pub use store::{PgDocumentStore, PgUserStore};

/// Every Postgres-backed port, sharing one pool.
pub struct PgStores {
    pub documents: PgDocumentStore,
    pub users: PgUserStore,
}

impl PgStores {
    pub fn new(pool: PgPool) -> Self {
        Self {
            documents: PgDocumentStore::new(pool.clone()),
            users: PgUserStore::new(pool),
        }
    }
}
