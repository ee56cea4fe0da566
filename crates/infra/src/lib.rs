//! Infrastructure layer: storage adapters, configuration, and the product service.

pub mod config;
pub mod service;
pub mod store;

pub use config::{CatalogConfig, ConfigError, DatabaseConfig};
pub use service::{Clock, ProductService, ServiceError, SystemClock};
pub use store::{InMemoryProductStore, PostgresProductStore, ProductStore, StoreError};
