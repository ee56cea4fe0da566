use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use catalog_core::ProductId;
use catalog_products::{Page, PageRequest, Product, ProductDraft, ProductFilter, Sort};

use super::{ProductStore, StoreError};

#[derive(Debug, Default)]
struct Rows {
    by_id: BTreeMap<ProductId, Product>,
    last_id: i64,
}

impl Rows {
    fn code_taken(&self, code: &str, except: Option<ProductId>) -> bool {
        self.by_id
            .values()
            .any(|p| p.code == code && Some(p.id) != except)
    }

    fn select(&self, filter: &ProductFilter, sort: Sort) -> Vec<Product> {
        let mut hits: Vec<Product> = self
            .by_id
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        hits.sort_by(|a, b| sort.compare(a, b));
        hits
    }
}

/// In-memory product table.
///
/// Intended for tests/dev. Not optimized for performance. Ids are assigned
/// sequentially starting at 1 and never reused. The uniqueness check on
/// `code` runs under the same write lock as the insert/update, so it behaves
/// like a storage-level constraint.
#[derive(Debug, Default)]
pub struct InMemoryProductStore {
    rows: RwLock<Rows>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Rows>, StoreError> {
        self.rows
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Rows>, StoreError> {
        self.rows
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.read()?.by_id.get(&id).cloned())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Product>, StoreError> {
        Ok(self.read()?.by_id.values().find(|p| p.code == code).cloned())
    }

    async fn exists_by_code(&self, code: &str) -> Result<bool, StoreError> {
        Ok(self.read()?.code_taken(code, None))
    }

    async fn insert(&self, draft: ProductDraft, at: DateTime<Utc>) -> Result<Product, StoreError> {
        let mut rows = self.write()?;
        if rows.code_taken(&draft.code, None) {
            return Err(StoreError::UniqueViolation { code: draft.code });
        }

        rows.last_id += 1;
        let product = Product::from_draft(ProductId::new(rows.last_id), draft, at);
        rows.by_id.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update(&self, product: Product) -> Result<Product, StoreError> {
        let mut rows = self.write()?;
        if !rows.by_id.contains_key(&product.id) {
            return Err(StoreError::Missing(product.id));
        }
        if rows.code_taken(&product.code, Some(product.id)) {
            return Err(StoreError::UniqueViolation { code: product.code });
        }

        rows.by_id.insert(product.id, product.clone());
        Ok(product)
    }

    async fn delete(&self, id: ProductId) -> Result<bool, StoreError> {
        Ok(self.write()?.by_id.remove(&id).is_some())
    }

    async fn find_page(
        &self,
        filter: &ProductFilter,
        request: &PageRequest,
    ) -> Result<Page<Product>, StoreError> {
        let hits = self.read()?.select(filter, request.sort);
        let total = hits.len() as u64;
        let offset = usize::try_from(request.offset()).unwrap_or(usize::MAX);

        let items = hits
            .into_iter()
            .skip(offset)
            .take(request.size as usize)
            .collect();
        Ok(Page::new(items, request, total))
    }

    async fn find_all(
        &self,
        filter: &ProductFilter,
        sort: Sort,
    ) -> Result<Vec<Product>, StoreError> {
        Ok(self.read()?.select(filter, sort))
    }

    async fn count(&self, filter: &ProductFilter) -> Result<u64, StoreError> {
        let rows = self.read()?;
        Ok(rows.by_id.values().filter(|p| filter.matches(p)).count() as u64)
    }

    async fn distinct_categories(&self) -> Result<Vec<String>, StoreError> {
        let rows = self.read()?;
        let categories: BTreeSet<String> = rows
            .by_id
            .values()
            .filter_map(|p| p.category.clone())
            .collect();
        Ok(categories.into_iter().collect())
    }
}
