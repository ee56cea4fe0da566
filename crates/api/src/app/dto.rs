use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use catalog_core::{DomainError, DomainResult};
use catalog_products::{PageRequest, Sort, SortField};

// -------------------------
// Query-string DTOs
// -------------------------

/// Paging and sorting parameters shared by every paged listing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
}

impl PageParams {
    pub fn into_request(self, default_sort: SortField) -> DomainResult<PageRequest> {
        let sort = Sort::parse(self.sort_by.as_deref(), self.sort_dir.as_deref(), default_sort)?;
        PageRequest::new(self.page, self.size, sort)
    }
}

/// `q` is required; a missing term is rejected rather than matching everything.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoryParams {
    pub active: Option<bool>,
}

/// Kept as raw strings so malformed amounts surface as field violations.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRangeParams {
    pub min_price: Option<String>,
    pub max_price: Option<String>,
}

impl PriceRangeParams {
    pub fn bounds(&self) -> DomainResult<(Decimal, Decimal)> {
        let min = parse_price("minPrice", self.min_price.as_deref());
        let max = parse_price("maxPrice", self.max_price.as_deref());
        match (min, max) {
            (Ok(min), Ok(max)) => Ok((min, max)),
            (Err(a), Err(b)) => {
                let mut violations = a.violations().to_vec();
                violations.extend_from_slice(b.violations());
                Err(DomainError::Validation(violations))
            }
            (Err(e), _) | (_, Err(e)) => Err(e),
        }
    }
}

fn parse_price(field: &str, raw: Option<&str>) -> DomainResult<Decimal> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| DomainError::invalid_field(field, format!("{field} is required")))?;
    Decimal::from_str(raw)
        .map_err(|_| DomainError::invalid_field(field, format!("{field} must be a decimal number")))
}

#[derive(Debug, Default, Deserialize)]
pub struct LowStockParams {
    pub threshold: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InStockParams {
    #[serde(default)]
    pub above: i32,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_products::SortDirection;

    #[test]
    fn page_params_fall_back_to_defaults() {
        let req = PageParams::default().into_request(SortField::Name).unwrap();
        assert_eq!(req.page, 0);
        assert_eq!(req.size, 10);
        assert_eq!(req.sort, Sort::asc(SortField::Name));
    }

    #[test]
    fn page_params_parse_sort() {
        let params = PageParams {
            page: Some(2),
            size: Some(5),
            sort_by: Some("stock_quantity".to_string()),
            sort_dir: Some("DESC".to_string()),
        };
        let req = params.into_request(SortField::Id).unwrap();
        assert_eq!(req.sort.field, SortField::StockQuantity);
        assert_eq!(req.sort.direction, SortDirection::Desc);
        assert_eq!(req.offset(), 10);
    }

    #[test]
    fn unknown_sort_field_is_a_violation() {
        let params = PageParams {
            sort_by: Some("password".to_string()),
            ..Default::default()
        };
        let err = params.into_request(SortField::Id).unwrap_err();
        assert_eq!(err.violations()[0].field, "sortBy");
    }

    #[test]
    fn price_bounds_report_both_missing_fields() {
        let err = PriceRangeParams::default().bounds().unwrap_err();
        let fields: Vec<&str> = err.violations().iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["minPrice", "maxPrice"]);
    }

    #[test]
    fn price_bounds_parse_decimals() {
        let params = PriceRangeParams {
            min_price: Some("10".to_string()),
            max_price: Some("20.50".to_string()),
        };
        let (min, max) = params.bounds().unwrap();
        assert_eq!(min, Decimal::from(10));
        assert_eq!(max, Decimal::from_str("20.50").unwrap());
    }

    #[test]
    fn malformed_price_is_rejected() {
        let params = PriceRangeParams {
            min_price: Some("ten".to_string()),
            max_price: Some("20".to_string()),
        };
        let err = params.bounds().unwrap_err();
        assert_eq!(err.violations()[0].field, "minPrice");
    }
}
