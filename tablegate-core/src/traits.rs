//! Common traits for TableGate.
//!
//! These traits define the interfaces that different backends can satisfy,
//! enabling modularity and testing.

use async_trait::async_trait;

use crate::error::AdapterResult;
use crate::types::{Filter, HealthStatus, PaginatedResult, QueryOptions, Record};

// ═══════════════════════════════════════════════════════════════════════════════
// ADAPTER TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// CRUD capability interface every backend implements.
///
/// Implementations might use:
/// - In-memory storage (for testing/development)
/// - A PostgREST-compatible HTTP service (Supabase and friends)
/// - A direct database driver
///
/// "Not found" is reported as [`AdapterError::NotFound`](crate::AdapterError::NotFound)
/// (or `None` for [`find_one`](DataAdapter::find_one)), distinct from backend failures.
#[async_trait]
pub trait DataAdapter: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    /// Returns one page of records matching `options`, with the total match count.
    async fn find_many(&self, table: &str, options: &QueryOptions) -> AdapterResult<PaginatedResult>;

    /// Retrieves a single record by id.
    async fn find_one(&self, table: &str, id: &str) -> AdapterResult<Option<Record>>;

    /// Creates a record and returns it as stored.
    async fn create(&self, table: &str, data: Record) -> AdapterResult<Record>;

    /// Creates several records. Fails as a whole if any create fails.
    ///
    /// Returned records are in input order.
    async fn create_many(&self, table: &str, data: Vec<Record>) -> AdapterResult<Vec<Record>>;

    /// Merges `data` into an existing record and returns the result.
    async fn update(&self, table: &str, id: &str, data: Record) -> AdapterResult<Record>;

    /// Deletes a record.
    async fn delete(&self, table: &str, id: &str) -> AdapterResult<()>;

    /// Deletes every record matching all `filters`. Returns the number deleted.
    async fn delete_many(&self, table: &str, filters: &[Filter]) -> AdapterResult<u64>;

    /// Counts records matching all `filters`.
    async fn count(&self, table: &str, filters: &[Filter]) -> AdapterResult<u64>;

    /// Probes the backend.
    async fn health_check(&self) -> AdapterResult<HealthStatus>;
}
