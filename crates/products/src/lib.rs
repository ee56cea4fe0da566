//! Products domain module.
//!
//! This crate contains the business rules for the product catalog: field
//! validation, the request/record/response shapes, and the query contract
//! (filtering, sorting, pagination). Pure domain logic (no IO, no HTTP, no storage).

pub mod product;
pub mod query;

pub use product::{Product, ProductDraft, ProductRequest, ProductResponse};
pub use query::{Page, PageRequest, ProductFilter, Sort, SortDirection, SortField};
