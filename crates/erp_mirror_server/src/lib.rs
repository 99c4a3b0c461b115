//! ERP mirror REST server: generic record CRUD over the catalog, user
//! registration and login, and the configuration shared with the seed CLI.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod password;
pub mod router;
pub mod stores;

pub use router::build_router;
pub use stores::{open_stores, Stores};
