//! Product storage boundary.
//!
//! The service layer talks to storage only through [`ProductStore`]. Two
//! implementations exist: an in-memory store for tests/dev and a Postgres
//! store for persistent deployments.
//!
//! ## Uniqueness
//!
//! Every implementation MUST enforce `code` uniqueness at write time and
//! report a collision as [`StoreError::UniqueViolation`]. The service's
//! existence pre-check is advisory; this constraint is what keeps two
//! concurrent writers from both succeeding with the same code.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use catalog_core::ProductId;
use catalog_products::{Page, PageRequest, Product, ProductDraft, ProductFilter, Sort};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryProductStore;
pub use postgres::PostgresProductStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A write collided with the uniqueness constraint on `code`.
    #[error("unique constraint violated for code '{code}'")]
    UniqueViolation { code: String },

    /// The row targeted by an update vanished (e.g. concurrent delete).
    #[error("product {0} does not exist")]
    Missing(ProductId),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Minimal query interface required from the persistence component.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// Exact, case-sensitive lookup by the unique code.
    async fn find_by_code(&self, code: &str) -> Result<Option<Product>, StoreError>;

    async fn exists_by_code(&self, code: &str) -> Result<bool, StoreError>;

    /// Persist a new product. Storage assigns the id; `created_at` and
    /// `updated_at` are both set to `at`.
    async fn insert(&self, draft: ProductDraft, at: DateTime<Utc>) -> Result<Product, StoreError>;

    /// Overwrite all mutable columns of an existing product.
    async fn update(&self, product: Product) -> Result<Product, StoreError>;

    /// Hard delete. Returns `false` when nothing was removed.
    async fn delete(&self, id: ProductId) -> Result<bool, StoreError>;

    /// Filtered, sorted, paginated listing.
    async fn find_page(
        &self,
        filter: &ProductFilter,
        request: &PageRequest,
    ) -> Result<Page<Product>, StoreError>;

    /// Filtered, sorted listing without pagination.
    async fn find_all(
        &self,
        filter: &ProductFilter,
        sort: Sort,
    ) -> Result<Vec<Product>, StoreError>;

    async fn count(&self, filter: &ProductFilter) -> Result<u64, StoreError>;

    /// Distinct non-null categories, ascending.
    async fn distinct_categories(&self) -> Result<Vec<String>, StoreError>;
}

#[async_trait]
impl<S> ProductStore for Arc<S>
where
    S: ProductStore + ?Sized,
{
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        (**self).find_by_id(id).await
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Product>, StoreError> {
        (**self).find_by_code(code).await
    }

    async fn exists_by_code(&self, code: &str) -> Result<bool, StoreError> {
        (**self).exists_by_code(code).await
    }

    async fn insert(&self, draft: ProductDraft, at: DateTime<Utc>) -> Result<Product, StoreError> {
        (**self).insert(draft, at).await
    }

    async fn update(&self, product: Product) -> Result<Product, StoreError> {
        (**self).update(product).await
    }

    async fn delete(&self, id: ProductId) -> Result<bool, StoreError> {
        (**self).delete(id).await
    }

    async fn find_page(
        &self,
        filter: &ProductFilter,
        request: &PageRequest,
    ) -> Result<Page<Product>, StoreError> {
        (**self).find_page(filter, request).await
    }

    async fn find_all(
        &self,
        filter: &ProductFilter,
        sort: Sort,
    ) -> Result<Vec<Product>, StoreError> {
        (**self).find_all(filter, sort).await
    }

    async fn count(&self, filter: &ProductFilter) -> Result<u64, StoreError> {
        (**self).count(filter).await
    }

    async fn distinct_categories(&self) -> Result<Vec<String>, StoreError> {
        (**self).distinct_categories().await
    }
}
