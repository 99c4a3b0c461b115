//! ERP service-layer adapter for the mirror's upstream ports.

pub mod client;

pub use client::{ServiceLayerClient, ServiceLayerConfig};
