use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

use catalog_infra::{
    CatalogConfig, InMemoryProductStore, PostgresProductStore, ProductService, ProductStore,
    StoreError,
};

pub type DynProductStore = Arc<dyn ProductStore>;

/// Shared state handed to every handler.
pub struct AppServices {
    pub products: ProductService<DynProductStore>,
}

impl AppServices {
    pub fn new(store: DynProductStore) -> Self {
        Self {
            products: ProductService::new(store),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryProductStore::new()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("failed to connect to postgres: {0}")]
    Connect(#[from] sqlx::Error),

    #[error("failed to bootstrap schema: {0}")]
    Schema(#[from] StoreError),
}

/// Select the product store from configuration.
///
/// Postgres when a database is configured (schema is created if missing),
/// otherwise the in-memory store.
pub async fn build_services(config: &CatalogConfig) -> Result<AppServices, BuildError> {
    let Some(db) = &config.database else {
        tracing::info!("using in-memory product store");
        return Ok(AppServices::in_memory());
    };

    let pool = PgPoolOptions::new()
        .max_connections(db.max_connections)
        .connect(&db.url)
        .await?;

    let store = PostgresProductStore::new(pool);
    store.ensure_schema().await?;
    tracing::info!(max_connections = db.max_connections, "using postgres product store");

    Ok(AppServices::new(Arc::new(store)))
}
