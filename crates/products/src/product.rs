use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use catalog_core::{DomainError, DomainResult, FieldViolation, ProductId};

pub const CODE_MAX_LEN: usize = 50;
pub const NAME_MAX_LEN: usize = 100;
pub const DESCRIPTION_MAX_LEN: usize = 500;
pub const CATEGORY_MAX_LEN: usize = 50;

/// Fractional digits kept for prices (storage column is NUMERIC(10,2)).
pub const PRICE_SCALE: u32 = 2;
/// Exclusive upper bound implied by NUMERIC(10,2).
const PRICE_CEILING: i64 = 100_000_000;

/// Inbound product shape, used for both create and update.
///
/// Everything is optional at the wire level so that missing fields are
/// reported by [`ProductRequest::validate`] alongside every other violation
/// instead of failing deserialization on the first one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRequest {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub stock_quantity: Option<i32>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Validated mutable product fields, ready to be written to storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub category: Option<String>,
    pub stock_quantity: i32,
    pub is_active: bool,
}

/// Persisted product record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub category: Option<String>,
    pub stock_quantity: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outbound, read-only view of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: ProductId,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub category: Option<String>,
    pub stock_quantity: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductRequest {
    /// Check every field constraint and collect all violations.
    ///
    /// On success the request is normalized into a [`ProductDraft`]
    /// (defaults applied, price rescaled to two fractional digits).
    pub fn validate(self) -> DomainResult<ProductDraft> {
        let mut violations = Vec::new();

        let code = required_text(self.code, "code", "Product code", CODE_MAX_LEN, &mut violations);
        let name = required_text(self.name, "name", "Product name", NAME_MAX_LEN, &mut violations);
        check_max_len(
            self.description.as_deref(),
            "description",
            "Description",
            DESCRIPTION_MAX_LEN,
            &mut violations,
        );
        check_max_len(
            self.category.as_deref(),
            "category",
            "Category",
            CATEGORY_MAX_LEN,
            &mut violations,
        );
        let price = check_price(self.price, &mut violations);

        match (code, name, price) {
            (Some(code), Some(name), Some(price)) if violations.is_empty() => Ok(ProductDraft {
                code,
                name,
                description: self.description,
                price,
                category: self.category,
                stock_quantity: self.stock_quantity.unwrap_or(0),
                is_active: self.is_active.unwrap_or(true),
            }),
            _ => Err(DomainError::Validation(violations)),
        }
    }
}

fn required_text(
    value: Option<String>,
    field: &str,
    label: &str,
    max_len: usize,
    violations: &mut Vec<FieldViolation>,
) -> Option<String> {
    match value {
        Some(v) if !v.trim().is_empty() => {
            if check_max_len(Some(&v), field, label, max_len, violations) {
                Some(v)
            } else {
                None
            }
        }
        _ => {
            violations.push(FieldViolation::new(field, format!("{label} is required")));
            None
        }
    }
}

fn check_max_len(
    value: Option<&str>,
    field: &str,
    label: &str,
    max_len: usize,
    violations: &mut Vec<FieldViolation>,
) -> bool {
    match value {
        Some(v) if v.chars().count() > max_len => {
            violations.push(FieldViolation::new(
                field,
                format!("{label} must not exceed {max_len} characters"),
            ));
            false
        }
        _ => true,
    }
}

fn check_price(price: Option<Decimal>, violations: &mut Vec<FieldViolation>) -> Option<Decimal> {
    let Some(price) = price else {
        violations.push(FieldViolation::new("price", "Price is required"));
        return None;
    };

    if price <= Decimal::ZERO {
        violations.push(FieldViolation::new("price", "Price must be greater than 0"));
        return None;
    }
    if price.normalize().scale() > PRICE_SCALE {
        violations.push(FieldViolation::new(
            "price",
            format!("Price must have at most {PRICE_SCALE} decimal places"),
        ));
        return None;
    }
    if price >= Decimal::from(PRICE_CEILING) {
        violations.push(FieldViolation::new(
            "price",
            "Price must be less than 100000000",
        ));
        return None;
    }

    let mut price = price;
    price.rescale(PRICE_SCALE);
    Some(price)
}

impl Product {
    /// Materialize a freshly inserted record.
    pub fn from_draft(id: ProductId, draft: ProductDraft, at: DateTime<Utc>) -> Self {
        Self {
            id,
            code: draft.code,
            name: draft.name,
            description: draft.description,
            price: draft.price,
            category: draft.category,
            stock_quantity: draft.stock_quantity,
            is_active: draft.is_active,
            created_at: at,
            updated_at: at,
        }
    }

    /// Overwrite every mutable field and refresh `updated_at`.
    ///
    /// `id` and `created_at` are never touched.
    pub fn apply(&mut self, draft: ProductDraft, at: DateTime<Utc>) {
        self.code = draft.code;
        self.name = draft.name;
        self.description = draft.description;
        self.price = draft.price;
        self.category = draft.category;
        self.stock_quantity = draft.stock_quantity;
        self.is_active = draft.is_active;
        self.updated_at = at;
    }
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            code: p.code,
            name: p.name,
            description: p.description,
            price: p.price,
            category: p.category,
            stock_quantity: p.stock_quantity,
            is_active: p.is_active,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}
