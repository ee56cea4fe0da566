//! Query contract: filtering, sorting, and pagination over products.
//!
//! These types are storage-agnostic. The in-memory store evaluates them
//! directly ([`ProductFilter::matches`], [`Sort::compare`]); SQL stores
//! translate them into `WHERE`/`ORDER BY`/`LIMIT` clauses.

use core::cmp::Ordering;
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;

use catalog_core::{DomainError, DomainResult};

use crate::product::Product;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Sortable product attributes.
///
/// Caller-supplied sort fields are checked against this set at the boundary
/// so an unknown name is a validation error rather than a storage failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortField {
    Id,
    Code,
    Name,
    Description,
    Price,
    Category,
    StockQuantity,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    pub const ALL: [SortField; 10] = [
        SortField::Id,
        SortField::Code,
        SortField::Name,
        SortField::Description,
        SortField::Price,
        SortField::Category,
        SortField::StockQuantity,
        SortField::IsActive,
        SortField::CreatedAt,
        SortField::UpdatedAt,
    ];

    /// Wire (camelCase) name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Code => "code",
            SortField::Name => "name",
            SortField::Description => "description",
            SortField::Price => "price",
            SortField::Category => "category",
            SortField::StockQuantity => "stockQuantity",
            SortField::IsActive => "isActive",
            SortField::CreatedAt => "createdAt",
            SortField::UpdatedAt => "updatedAt",
        }
    }

    /// Storage column name.
    pub fn column(&self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Code => "code",
            SortField::Name => "name",
            SortField::Description => "description",
            SortField::Price => "price",
            SortField::Category => "category",
            SortField::StockQuantity => "stock_quantity",
            SortField::IsActive => "is_active",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
        }
    }

    fn compare(&self, a: &Product, b: &Product) -> Ordering {
        match self {
            SortField::Id => a.id.cmp(&b.id),
            SortField::Code => a.code.cmp(&b.code),
            SortField::Name => a.name.cmp(&b.name),
            SortField::Description => nulls_last(&a.description, &b.description),
            SortField::Price => a.price.cmp(&b.price),
            SortField::Category => nulls_last(&a.category, &b.category),
            SortField::StockQuantity => a.stock_quantity.cmp(&b.stock_quantity),
            SortField::IsActive => a.is_active.cmp(&b.is_active),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        }
    }
}

// Matches Postgres: NULLS LAST ascending, NULLS FIRST descending.
fn nulls_last(a: &Option<String>, b: &Option<String>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(y),
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
    }
}

impl FromStr for SortField {
    type Err = DomainError;

    /// Accepts camelCase or snake_case, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_')
            .flat_map(char::to_lowercase)
            .collect();

        SortField::ALL
            .into_iter()
            .find(|f| f.as_str().to_lowercase() == key)
            .ok_or_else(|| {
                let allowed = SortField::ALL.map(|f| f.as_str()).join(", ");
                DomainError::invalid_field(
                    "sortBy",
                    format!("unknown sort field '{s}' (expected one of: {allowed})"),
                )
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// `"desc"` in any casing is descending; every other value is ascending.
    pub fn parse_lenient(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Sort {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    pub fn asc(field: SortField) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    pub fn desc(field: SortField) -> Self {
        Self::new(field, SortDirection::Desc)
    }

    /// Build from raw request parameters, falling back to `default_field`.
    pub fn parse(
        field: Option<&str>,
        direction: Option<&str>,
        default_field: SortField,
    ) -> DomainResult<Self> {
        let field = match field {
            Some(f) if !f.trim().is_empty() => f.parse()?,
            _ => default_field,
        };
        let direction = direction.map(SortDirection::parse_lenient).unwrap_or_default();
        Ok(Self { field, direction })
    }

    /// Total order: requested field/direction, ties broken by ascending id.
    pub fn compare(&self, a: &Product, b: &Product) -> Ordering {
        let ord = self.field.compare(a, b);
        let ord = match self.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        };
        ord.then_with(|| a.id.cmp(&b.id))
    }
}

/// Zero-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
    pub sort: Sort,
}

impl PageRequest {
    /// `size` must be at least 1 and is capped at [`MAX_PAGE_SIZE`].
    pub fn new(page: Option<u32>, size: Option<u32>, sort: Sort) -> DomainResult<Self> {
        let size = size.unwrap_or(DEFAULT_PAGE_SIZE);
        if size == 0 {
            return Err(DomainError::invalid_field("size", "Page size must be at least 1"));
        }
        Ok(Self {
            page: page.unwrap_or(0),
            size: size.min(MAX_PAGE_SIZE),
            sort,
        })
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }
}

/// A bounded slice of a larger result set plus its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: &PageRequest, total_elements: u64) -> Self {
        Self {
            items,
            page: request.page,
            size: request.size,
            total_elements,
            total_pages: total_pages(total_elements, request.size),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
        }
    }
}

pub fn total_pages(total_elements: u64, size: u32) -> u64 {
    if size == 0 {
        return 0;
    }
    total_elements.div_ceil(u64::from(size))
}

/// Conjunctive product filter. Unset criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    /// Case-insensitive substring of name or description.
    pub search: Option<String>,
    /// Case-insensitive category equality.
    pub category: Option<String>,
    /// Inclusive lower price bound.
    pub min_price: Option<Decimal>,
    /// Inclusive upper price bound.
    pub max_price: Option<Decimal>,
    pub active: Option<bool>,
    /// `stock_quantity <= max_stock`.
    pub max_stock: Option<i32>,
    /// `stock_quantity > min_stock_exclusive`.
    pub min_stock_exclusive: Option<i32>,
}

impl ProductFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: Some(term.into()),
            ..Self::default()
        }
    }

    pub fn category(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            ..Self::default()
        }
    }

    /// Inclusive price range; `min > max` is rejected.
    pub fn price_range(min: Decimal, max: Decimal) -> DomainResult<Self> {
        if min > max {
            return Err(DomainError::invalid_field(
                "minPrice",
                "minPrice must not be greater than maxPrice",
            ));
        }
        Ok(Self {
            min_price: Some(min),
            max_price: Some(max),
            ..Self::default()
        })
    }

    pub fn active_only() -> Self {
        Self {
            active: Some(true),
            ..Self::default()
        }
    }

    pub fn with_active(mut self, active: Option<bool>) -> Self {
        self.active = active;
        self
    }

    /// Active products with `stock_quantity <= threshold`.
    pub fn low_stock(threshold: i32) -> Self {
        Self {
            active: Some(true),
            max_stock: Some(threshold),
            ..Self::default()
        }
    }

    /// Active products with `stock_quantity > quantity`.
    pub fn in_stock_above(quantity: i32) -> Self {
        Self {
            active: Some(true),
            min_stock_exclusive: Some(quantity),
            ..Self::default()
        }
    }

    pub fn matches(&self, p: &Product) -> bool {
        if let Some(term) = &self.search {
            let term = term.to_lowercase();
            let in_name = p.name.to_lowercase().contains(&term);
            let in_description = p
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&term));
            if !in_name && !in_description {
                return false;
            }
        }
        if let Some(category) = &self.category {
            let hit = p
                .category
                .as_deref()
                .is_some_and(|c| c.to_lowercase() == category.to_lowercase());
            if !hit {
                return false;
            }
        }
        if self.min_price.is_some_and(|min| p.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| p.price > max) {
            return false;
        }
        if self.active.is_some_and(|a| p.is_active != a) {
            return false;
        }
        if self.max_stock.is_some_and(|max| p.stock_quantity > max) {
            return false;
        }
        if self.min_stock_exclusive.is_some_and(|min| p.stock_quantity <= min) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_core::ProductId;
    use chrono::Utc;

    fn product(id: i64, name: &str, price: &str) -> Product {
        let at = Utc::now();
        Product {
            id: ProductId::new(id),
            code: format!("SKU{id}"),
            name: name.to_string(),
            description: None,
            price: price.parse().unwrap(),
            category: None,
            stock_quantity: 0,
            is_active: true,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn sort_field_accepts_camel_and_snake_case() {
        assert_eq!("stockQuantity".parse::<SortField>().unwrap(), SortField::StockQuantity);
        assert_eq!("stock_quantity".parse::<SortField>().unwrap(), SortField::StockQuantity);
        assert_eq!("CREATEDAT".parse::<SortField>().unwrap(), SortField::CreatedAt);
        assert_eq!("name".parse::<SortField>().unwrap(), SortField::Name);
    }

    #[test]
    fn unknown_sort_field_is_a_validation_error() {
        let err = "password".parse::<SortField>().unwrap_err();
        assert_eq!(err.violations()[0].field, "sortBy");
        assert!(err.violations()[0].message.contains("password"));
    }

    #[test]
    fn sort_direction_defaults_to_ascending() {
        assert_eq!(SortDirection::parse_lenient("DESC"), SortDirection::Desc);
        assert_eq!(SortDirection::parse_lenient("desc"), SortDirection::Desc);
        assert_eq!(SortDirection::parse_lenient("asc"), SortDirection::Asc);
        assert_eq!(SortDirection::parse_lenient("sideways"), SortDirection::Asc);
    }

    #[test]
    fn sort_parse_uses_default_field_when_absent() {
        let sort = Sort::parse(None, Some("desc"), SortField::Price).unwrap();
        assert_eq!(sort, Sort::desc(SortField::Price));

        let sort = Sort::parse(Some(""), None, SortField::Name).unwrap();
        assert_eq!(sort, Sort::asc(SortField::Name));
    }

    #[test]
    fn descending_sort_breaks_ties_by_ascending_id() {
        let a = product(1, "Same", "5.00");
        let b = product(2, "Same", "5.00");
        let c = product(3, "Zeta", "1.00");

        let mut items = vec![b.clone(), c.clone(), a.clone()];
        let sort = Sort::desc(SortField::Name);
        items.sort_by(|x, y| sort.compare(x, y));

        let ids: Vec<i64> = items.iter().map(|p| p.id.get()).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn missing_categories_sort_last_ascending_first_descending() {
        let mut a = product(1, "A", "1.00");
        a.category = Some("tools".to_string());
        let b = product(2, "B", "1.00");

        assert_eq!(Sort::asc(SortField::Category).compare(&a, &b), Ordering::Less);
        assert_eq!(Sort::desc(SortField::Category).compare(&a, &b), Ordering::Greater);
    }

    #[test]
    fn page_request_rejects_zero_size_and_caps_large_sizes() {
        let sort = Sort::asc(SortField::Id);
        let err = PageRequest::new(Some(0), Some(0), sort).unwrap_err();
        assert_eq!(err.violations()[0].field, "size");

        let req = PageRequest::new(Some(2), Some(5000), sort).unwrap();
        assert_eq!(req.size, MAX_PAGE_SIZE);
        assert_eq!(req.offset(), 2000);

        let req = PageRequest::new(None, None, sort).unwrap();
        assert_eq!((req.page, req.size), (0, DEFAULT_PAGE_SIZE));
    }

    #[test]
    fn empty_result_has_zero_pages() {
        let req = PageRequest::new(Some(0), Some(10), Sort::asc(SortField::Id)).unwrap();
        let page: Page<Product> = Page::new(vec![], &req, 0);
        assert_eq!(page.total_pages, 0);
        assert!(page.items.is_empty());
    }

    #[test]
    fn search_matches_name_and_description_case_insensitively() {
        let widget = product(1, "Widget", "1.00");
        let mut gadget = product(2, "Gadget", "1.00");

        let filter = ProductFilter::search("wid");
        assert!(filter.matches(&widget));
        assert!(!filter.matches(&gadget));

        gadget.description = Some("Pairs well with a WIDGET".to_string());
        assert!(filter.matches(&gadget));
    }

    #[test]
    fn price_range_is_inclusive() {
        let filter =
            ProductFilter::price_range("10.00".parse().unwrap(), "20.00".parse().unwrap()).unwrap();

        assert!(filter.matches(&product(1, "a", "10.00")));
        assert!(filter.matches(&product(2, "b", "20.00")));
        assert!(!filter.matches(&product(3, "c", "9.99")));
        assert!(!filter.matches(&product(4, "d", "20.01")));
    }

    #[test]
    fn inverted_price_range_rejected() {
        let err =
            ProductFilter::price_range("20".parse().unwrap(), "10".parse().unwrap()).unwrap_err();
        assert_eq!(err.violations()[0].field, "minPrice");
    }

    #[test]
    fn category_match_ignores_case_and_skips_missing() {
        let mut tools = product(1, "Hammer", "1.00");
        tools.category = Some("Tools".to_string());
        let none = product(2, "Loose", "1.00");

        let filter = ProductFilter::category("tools");
        assert!(filter.matches(&tools));
        assert!(!filter.matches(&none));
    }

    #[test]
    fn low_stock_excludes_inactive_products() {
        let mut low = product(1, "low", "1.00");
        low.stock_quantity = 5;
        let mut inactive = product(2, "gone", "1.00");
        inactive.stock_quantity = 0;
        inactive.is_active = false;
        let mut plenty = product(3, "plenty", "1.00");
        plenty.stock_quantity = 6;

        let filter = ProductFilter::low_stock(5);
        assert!(filter.matches(&low));
        assert!(!filter.matches(&inactive));
        assert!(!filter.matches(&plenty));
    }

    #[test]
    fn in_stock_above_is_strict() {
        let mut p = product(1, "p", "1.00");
        p.stock_quantity = 3;
        assert!(ProductFilter::in_stock_above(2).matches(&p));
        assert!(!ProductFilter::in_stock_above(3).matches(&p));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: pages cover every element exactly once.
            #[test]
            fn total_pages_covers_all_elements(total in 0u64..100_000, size in 1u32..=1000) {
                let pages = total_pages(total, size);
                prop_assert!(pages * u64::from(size) >= total);
                if pages > 0 {
                    prop_assert!((pages - 1) * u64::from(size) < total);
                } else {
                    prop_assert_eq!(total, 0);
                }
            }
        }
    }
}
