//! Postgres-backed product store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `UniqueViolation` | Another row already holds the code (lost check-then-write race) |
//! | Database (other) | Any other | `Backend` | Check constraint, type errors, etc. |
//! | PoolClosed / Io / other | N/A | `Backend` | Connection failures |
//!
//! ## Thread Safety
//!
//! `PostgresProductStore` is `Send + Sync`; SQLx's pool handles connection sharing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::instrument;

use catalog_core::ProductId;
use catalog_products::{Page, PageRequest, Product, ProductDraft, ProductFilter, Sort};

use super::{ProductStore, StoreError};

const COLUMNS: &str =
    "id, code, name, description, price, category, stock_quantity, is_active, created_at, updated_at";

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS products (
    id             BIGSERIAL PRIMARY KEY,
    code           VARCHAR(50)    NOT NULL,
    name           VARCHAR(100)   NOT NULL,
    description    VARCHAR(500),
    price          NUMERIC(10, 2) NOT NULL CHECK (price > 0),
    category       VARCHAR(50),
    stock_quantity INTEGER        NOT NULL DEFAULT 0,
    is_active      BOOLEAN        NOT NULL DEFAULT TRUE,
    created_at     TIMESTAMPTZ    NOT NULL,
    updated_at     TIMESTAMPTZ    NOT NULL,
    CONSTRAINT products_code_key UNIQUE (code)
)
"#;

/// Postgres product table.
///
/// Uniqueness of `code` is enforced by the `products_code_key` constraint;
/// violations surface as [`StoreError::UniqueViolation`].
pub struct PostgresProductStore {
    pool: PgPool,
}

impl PostgresProductStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `products` table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e, None))?;
        Ok(())
    }
}

#[derive(Debug)]
struct ProductRow {
    id: i64,
    code: String,
    name: String,
    description: Option<String>,
    price: Decimal,
    category: Option<String>,
    stock_quantity: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for ProductRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductRow {
            id: row.try_get("id")?,
            code: row.try_get("code")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: row.try_get("price")?,
            category: row.try_get("category")?,
            stock_quantity: row.try_get("stock_quantity")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: ProductId::new(row.id),
            code: row.code,
            name: row.name,
            description: row.description,
            price: row.price,
            category: row.category,
            stock_quantity: row.stock_quantity,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl ProductStore for PostgresProductStore {
    #[instrument(skip(self), fields(operation = "find_by_id"))]
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM products WHERE id = $1");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_by_id", e, None))?;
        Ok(row.map(Product::from))
    }

    #[instrument(skip(self), fields(operation = "find_by_code"))]
    async fn find_by_code(&self, code: &str) -> Result<Option<Product>, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM products WHERE code = $1");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_by_code", e, None))?;
        Ok(row.map(Product::from))
    }

    #[instrument(skip(self), fields(operation = "exists_by_code"))]
    async fn exists_by_code(&self, code: &str) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM products WHERE code = $1)")
            .bind(code)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("exists_by_code", e, None))
    }

    #[instrument(skip(self, draft), fields(operation = "insert", code = %draft.code))]
    async fn insert(&self, draft: ProductDraft, at: DateTime<Utc>) -> Result<Product, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO products (
                code, name, description, price, category,
                stock_quantity, is_active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING {COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(&draft.code)
            .bind(&draft.name)
            .bind(&draft.description)
            .bind(draft.price)
            .bind(&draft.category)
            .bind(draft.stock_quantity)
            .bind(draft.is_active)
            .bind(at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert", e, Some(&draft.code)))?;
        Ok(row.into())
    }

    #[instrument(skip(self, product), fields(operation = "update", id = %product.id))]
    async fn update(&self, product: Product) -> Result<Product, StoreError> {
        let sql = format!(
            r#"
            UPDATE products SET
                code = $2,
                name = $3,
                description = $4,
                price = $5,
                category = $6,
                stock_quantity = $7,
                is_active = $8,
                updated_at = $9
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(product.id.get())
            .bind(&product.code)
            .bind(&product.name)
            .bind(&product.description)
            .bind(product.price)
            .bind(&product.category)
            .bind(product.stock_quantity)
            .bind(product.is_active)
            .bind(product.updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update", e, Some(&product.code)))?;

        row.map(Product::from).ok_or(StoreError::Missing(product.id))
    }

    #[instrument(skip(self), fields(operation = "delete"))]
    async fn delete(&self, id: ProductId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete", e, None))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(operation = "find_page"))]
    async fn find_page(
        &self,
        filter: &ProductFilter,
        request: &PageRequest,
    ) -> Result<Page<Product>, StoreError> {
        let total = self.count(filter).await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM products"));
        push_where(&mut qb, filter);
        push_order_by(&mut qb, request.sort);
        qb.push(" LIMIT ")
            .push_bind(i64::from(request.size))
            .push(" OFFSET ")
            .push_bind(i64::try_from(request.offset()).unwrap_or(i64::MAX));

        let rows = qb
            .build_query_as::<ProductRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_page", e, None))?;

        let items = rows.into_iter().map(Product::from).collect();
        Ok(Page::new(items, request, total))
    }

    #[instrument(skip(self), fields(operation = "find_all"))]
    async fn find_all(
        &self,
        filter: &ProductFilter,
        sort: Sort,
    ) -> Result<Vec<Product>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM products"));
        push_where(&mut qb, filter);
        push_order_by(&mut qb, sort);

        let rows = qb
            .build_query_as::<ProductRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_all", e, None))?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    #[instrument(skip(self), fields(operation = "count"))]
    async fn count(&self, filter: &ProductFilter) -> Result<u64, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products");
        push_where(&mut qb, filter);

        let count: i64 = qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count", e, None))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    #[instrument(skip(self), fields(operation = "distinct_categories"))]
    async fn distinct_categories(&self) -> Result<Vec<String>, StoreError> {
        sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT category FROM products WHERE category IS NOT NULL ORDER BY category",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("distinct_categories", e, None))
    }
}

fn push_where(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    qb.push(" WHERE TRUE");

    if let Some(term) = &filter.search {
        let pattern = format!("%{}%", escape_like(term));
        qb.push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(category) = &filter.category {
        qb.push(" AND LOWER(category) = LOWER(")
            .push_bind(category.clone())
            .push(")");
    }
    if let Some(min) = filter.min_price {
        qb.push(" AND price >= ").push_bind(min);
    }
    if let Some(max) = filter.max_price {
        qb.push(" AND price <= ").push_bind(max);
    }
    if let Some(active) = filter.active {
        qb.push(" AND is_active = ").push_bind(active);
    }
    if let Some(max) = filter.max_stock {
        qb.push(" AND stock_quantity <= ").push_bind(max);
    }
    if let Some(min) = filter.min_stock_exclusive {
        qb.push(" AND stock_quantity > ").push_bind(min);
    }
}

// Column names come from the `SortField` whitelist, never from caller input.
fn push_order_by(qb: &mut QueryBuilder<'_, Postgres>, sort: Sort) {
    qb.push(format!(
        " ORDER BY {} {}, id ASC",
        sort.field.column(),
        sort.direction.as_sql()
    ));
}

/// Escape LIKE metacharacters so a search term matches literally.
/// Backslash is Postgres' default LIKE escape character.
fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn map_sqlx_error(operation: &str, err: sqlx::Error, code: Option<&str>) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23505") {
                return StoreError::UniqueViolation {
                    code: code.unwrap_or_default().to_string(),
                };
            }
            StoreError::Backend(format!("database error in {}: {}", operation, db_err.message()))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        other => StoreError::Backend(format!("error in {}: {}", operation, other)),
    }
}
