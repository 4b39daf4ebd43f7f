//! Query options and paginated results.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_LIMIT, MAX_LIMIT};
use crate::types::{Filter, Record};

/// Sort direction of an ordering directive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending (the default)
    #[default]
    Asc,
    /// Descending
    Desc,
}

impl SortDirection {
    /// Get the direction string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// A single `(field, direction)` sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    /// Field to sort on
    pub field: String,
    /// Sort direction
    pub direction: SortDirection,
}

impl OrderBy {
    /// Ascending sort on a field.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    /// Descending sort on a field.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Options for a list query.
///
/// Filters are combined with logical AND. Sort keys apply in listed priority
/// order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Filters combined by AND
    #[serde(default)]
    pub filters: Vec<Filter>,
    /// Sort keys, highest priority first
    #[serde(default)]
    pub order_by: Vec<OrderBy>,
    /// Page size
    #[serde(default)]
    pub limit: Option<usize>,
    /// Number of matching records to skip
    #[serde(default)]
    pub offset: Option<usize>,
    /// Columns to return (all when empty)
    #[serde(default)]
    pub select: Vec<String>,
}

impl QueryOptions {
    /// Creates empty options (no filters, default page).
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a filter.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Adds a sort key.
    pub fn order(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    /// Sets the page size.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the number of records to skip.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Sets the selected columns.
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Page size after defaulting and capping.
    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT)
    }

    /// Offset after defaulting.
    pub fn effective_offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }
}

/// One page of a list query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedResult {
    /// Records on this page
    pub data: Vec<Record>,
    /// Total number of matching records before pagination
    pub count: u64,
    /// Page size that was applied
    pub limit: usize,
    /// Offset that was applied
    pub offset: usize,
    /// Whether records remain after this page
    pub has_more: bool,
}

impl PaginatedResult {
    /// Builds a page, deriving `has_more` as `offset + returned < total`.
    pub fn new(data: Vec<Record>, count: u64, limit: usize, offset: usize) -> Self {
        let has_more = (offset.saturating_add(data.len()) as u64) < count;
        Self {
            data,
            count,
            limit,
            offset,
            has_more,
        }
    }

    /// An empty page.
    pub fn empty(limit: usize, offset: usize) -> Self {
        Self::new(Vec::new(), 0, limit, offset)
    }
}

/// Result of an adapter health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Whether the backend answered successfully
    pub ok: bool,
    /// Round-trip latency in milliseconds
    pub latency_ms: u64,
}
