//! DTOs for API requests and responses.

use serde::{Deserialize, Serialize};
use tablegate_core::types::{HealthStatus, PaginatedResult, Record};

/// Response for list queries.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    /// Records on this page
    pub data: Vec<Record>,
    /// Total matching records
    pub count: u64,
    /// Applied page size
    pub limit: usize,
    /// Applied offset
    pub offset: usize,
    /// Whether more records follow
    pub has_more: bool,
}

impl From<PaginatedResult> for ListResponse {
    fn from(page: PaginatedResult) -> Self {
        Self {
            data: page.data,
            count: page.count,
            limit: page.limit,
            offset: page.offset,
            has_more: page.has_more,
        }
    }
}

/// Response for `GET /:table/count`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CountResponse {
    /// Matching records
    pub count: u64,
}

/// Response for deletes.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    /// Always true on success
    pub ok: bool,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Backend reachable
    pub ok: bool,
    /// Probe round-trip in milliseconds
    pub latency_ms: u64,
}

impl From<HealthStatus> for HealthResponse {
    fn from(status: HealthStatus) -> Self {
        Self {
            ok: status.ok,
            latency_ms: status.latency_ms,
        }
    }
}
