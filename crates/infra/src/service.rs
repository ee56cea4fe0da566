//! Product catalog service: validation, uniqueness, and query orchestration.
//!
//! Control flow for every operation:
//! request → validation → (mutations) uniqueness pre-check → storage → response mapping.
//!
//! The service holds no state between calls besides its store and clock.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::instrument;

use catalog_core::{DomainError, ProductId};
use catalog_products::{
    Page, PageRequest, ProductFilter, ProductRequest, ProductResponse, Sort, SortField,
};

use crate::store::{ProductStore, StoreError};

pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ServiceError {
    /// Constraint-level rejections surface exactly like the pre-check ones.
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation { code } => Self::Domain(DomainError::duplicate_code(code)),
            StoreError::Missing(id) => Self::Domain(not_found_id(id)),
            other => Self::Store(other),
        }
    }
}

fn not_found_id(id: ProductId) -> DomainError {
    DomainError::not_found(format!("Product not found with id: {id}"))
}

/// Source of mutation timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub struct ProductService<S> {
    store: S,
    clock: Arc<dyn Clock>,
}

impl<S> ProductService<S>
where
    S: ProductStore,
{
    pub fn new(store: S) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    #[instrument(skip(self, request))]
    pub async fn create(&self, request: ProductRequest) -> Result<ProductResponse, ServiceError> {
        let draft = request.validate()?;

        if self.store.exists_by_code(&draft.code).await? {
            tracing::debug!(code = %draft.code, "rejected duplicate product code");
            return Err(DomainError::duplicate_code(draft.code).into());
        }

        let product = self.store.insert(draft, self.clock.now()).await?;
        tracing::info!(id = %product.id, code = %product.code, "product created");
        Ok(product.into())
    }

    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: ProductId) -> Result<ProductResponse, ServiceError> {
        let Some(product) = self.store.find_by_id(id).await? else {
            tracing::debug!(%id, "product not found");
            return Err(not_found_id(id).into());
        };
        Ok(product.into())
    }

    #[instrument(skip(self))]
    pub async fn get_by_code(&self, code: &str) -> Result<ProductResponse, ServiceError> {
        let Some(product) = self.store.find_by_code(code).await? else {
            tracing::debug!(%code, "product not found");
            let msg = format!("Product not found with code: {code}");
            return Err(DomainError::not_found(msg).into());
        };
        Ok(product.into())
    }

    /// Replace every mutable field of an existing product.
    ///
    /// The uniqueness pre-check only runs when the code actually changes, so a
    /// product never conflicts with itself.
    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        id: ProductId,
        request: ProductRequest,
    ) -> Result<ProductResponse, ServiceError> {
        let Some(mut product) = self.store.find_by_id(id).await? else {
            tracing::debug!(%id, "update target not found");
            return Err(not_found_id(id).into());
        };

        let draft = request.validate()?;

        if draft.code != product.code && self.store.exists_by_code(&draft.code).await? {
            tracing::debug!(%id, code = %draft.code, "rejected duplicate product code");
            return Err(DomainError::duplicate_code(draft.code).into());
        }

        product.apply(draft, self.clock.now());
        let saved = self.store.update(product).await?;
        tracing::info!(id = %saved.id, code = %saved.code, "product updated");
        Ok(saved.into())
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<(), ServiceError> {
        if !self.store.delete(id).await? {
            tracing::debug!(%id, "delete target not found");
            return Err(not_found_id(id).into());
        }
        tracing::info!(%id, "product deleted");
        Ok(())
    }

    pub async fn list(&self, request: PageRequest) -> Result<Page<ProductResponse>, ServiceError> {
        self.page(ProductFilter::all(), request).await
    }

    /// Case-insensitive substring match on name or description.
    pub async fn search(
        &self,
        term: &str,
        request: PageRequest,
    ) -> Result<Page<ProductResponse>, ServiceError> {
        self.page(ProductFilter::search(term), request).await
    }

    /// Case-insensitive exact category match, optionally narrowed by active flag.
    pub async fn by_category(
        &self,
        category: &str,
        active: Option<bool>,
        request: PageRequest,
    ) -> Result<Page<ProductResponse>, ServiceError> {
        let filter = ProductFilter::category(category).with_active(active);
        self.page(filter, request).await
    }

    /// Inclusive price range.
    pub async fn by_price_range(
        &self,
        min_price: Decimal,
        max_price: Decimal,
        request: PageRequest,
    ) -> Result<Page<ProductResponse>, ServiceError> {
        let filter = ProductFilter::price_range(min_price, max_price)?;
        self.page(filter, request).await
    }

    pub async fn active_only(
        &self,
        request: PageRequest,
    ) -> Result<Page<ProductResponse>, ServiceError> {
        self.page(ProductFilter::active_only(), request).await
    }

    #[instrument(skip(self))]
    pub async fn all_categories(&self) -> Result<Vec<String>, ServiceError> {
        Ok(self.store.distinct_categories().await?)
    }

    /// Active products with stock at or below `threshold` (default 10), unpaged.
    #[instrument(skip(self))]
    pub async fn low_stock(
        &self,
        threshold: Option<i32>,
    ) -> Result<Vec<ProductResponse>, ServiceError> {
        let threshold = threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);
        let products = self
            .store
            .find_all(&ProductFilter::low_stock(threshold), Sort::asc(SortField::StockQuantity))
            .await?;
        Ok(products.into_iter().map(ProductResponse::from).collect())
    }

    /// Active products with stock strictly above `quantity`, unpaged.
    #[instrument(skip(self))]
    pub async fn in_stock(&self, quantity: i32) -> Result<Vec<ProductResponse>, ServiceError> {
        let products = self
            .store
            .find_all(
                &ProductFilter::in_stock_above(quantity),
                Sort::desc(SortField::StockQuantity),
            )
            .await?;
        Ok(products.into_iter().map(ProductResponse::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn count_active_in_category(&self, category: &str) -> Result<u64, ServiceError> {
        let filter = ProductFilter::category(category).with_active(Some(true));
        Ok(self.store.count(&filter).await?)
    }

    #[instrument(skip(self))]
    async fn page(
        &self,
        filter: ProductFilter,
        request: PageRequest,
    ) -> Result<Page<ProductResponse>, ServiceError> {
        let page = self.store.find_page(&filter, &request).await?;
        Ok(page.map(ProductResponse::from))
    }
}
