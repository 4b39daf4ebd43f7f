//! TTL cache for TableGate records.
//!
//! Generic in-memory cache with configurable capacity and expiration, keyed by
//! `table` or `table:id`, with whole-table invalidation.

mod cache;

pub use cache::{record_key, table_prefix, CacheConfig, CacheStats, TtlCache, MAX_TTL};
