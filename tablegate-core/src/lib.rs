//! # TableGate Core
//!
//! Core types, errors, and traits for the TableGate data-access layer.
//!
//! This crate provides the foundational building blocks used by all other TableGate crates:
//!
//! - **Types**: Records, filters, query options, and paginated results
//! - **Query**: Parsing of the textual `field:operator:value` filter syntax
//! - **Errors**: The uniform error taxonomy (`VALIDATION`, `NOT_FOUND`, `ADAPTER`, `UNKNOWN`)
//! - **Validation**: Table and record identifier rules
//! - **Traits**: The `DataAdapter` capability interface every backend implements
//!
//! ## Example
//!
//! ```rust
//! use tablegate_core::query::parse_filter;
//! use tablegate_core::FilterOperator;
//!
//! let filter = parse_filter("age:gte:18").unwrap();
//! assert_eq!(filter.operator, FilterOperator::Gte);
//! assert_eq!(filter.value, serde_json::json!(18));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod query;
pub mod traits;
pub mod types;
pub mod validation;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{AdapterError, AdapterResult, DataError, ErrorCode, Result};
pub use traits::*;
pub use types::*;
