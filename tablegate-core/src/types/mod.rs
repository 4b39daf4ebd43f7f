//! Core types for TableGate.

mod filter;
mod query;
mod record;

pub use filter::{compare_values, Filter, FilterOperator};
pub use query::{HealthStatus, OrderBy, PaginatedResult, QueryOptions, SortDirection};
pub use record::{record_id, Record};
