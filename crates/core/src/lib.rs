//! `catalog-core`: domain error model and identifiers.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult, FieldViolation};
pub use id::ProductId;
