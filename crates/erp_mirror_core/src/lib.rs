//! ERP mirror core: pure domain types, port traits and the two engines that
//! sit on top of them.
//!
//! - [`crud::RecordHandler`] serves create/read/update/delete for any
//!   collection in the [`catalog`].
//! - [`reconcile::Reconciler`] pulls paged records from the ERP service layer
//!   and upserts them by natural key.
//!
//! Storage and upstream access go through the traits in [`ports`]; this crate
//! has no database or HTTP client dependency.

pub mod catalog;
pub mod crud;
pub mod error;
pub mod memory;
pub mod ports;
pub mod projection;
pub mod query;
pub mod reconcile;
pub mod record;
pub mod schema;
pub mod user;

pub use catalog::{Collection, CollectionDescriptor, CATALOG};
pub use error::{MirrorError, Result};
pub use record::{NaturalKey, Record, StoredDocument};
