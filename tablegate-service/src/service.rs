//! The data service: validation, caching, and error normalization over an adapter.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use tablegate_cache::{record_key, CacheConfig, CacheStats, TtlCache};
use tablegate_core::error::{DataError, Result};
use tablegate_core::traits::DataAdapter;
use tablegate_core::types::{record_id, Filter, HealthStatus, PaginatedResult, QueryOptions, Record};
use tablegate_core::validation::{validate_filters, validate_id, validate_query, validate_table};

/// Service configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Record cache settings
    pub cache: CacheConfig,
    /// Tables callers may touch. `None` allows any valid name.
    pub allowed_tables: Option<Vec<String>>,
}

/// Validated, cached access to a single adapter.
///
/// Only [`find_one`](Self::find_one) reads through the cache. Writes keep it
/// coherent: creates and bulk deletes drop the whole table namespace, while
/// updates and deletes drop just the affected `table:id` entry.
pub struct DataService {
    adapter: Arc<dyn DataAdapter>,
    cache: TtlCache<Record>,
    allowed_tables: Option<Vec<String>>,
}

impl DataService {
    /// Creates a service over `adapter` with its own cache.
    pub fn new(adapter: Arc<dyn DataAdapter>, config: ServiceConfig) -> Self {
        Self {
            adapter,
            cache: TtlCache::with_config(config.cache),
            allowed_tables: config.allowed_tables,
        }
    }

    /// Name of the backing adapter.
    pub fn adapter_name(&self) -> &'static str {
        self.adapter.name()
    }

    /// Record cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn check_table(&self, table: &str) -> Result<()> {
        validate_table(table, self.allowed_tables.as_deref())
    }

    fn check_record(&self, table: &str, id: &str) -> Result<()> {
        self.check_table(table)?;
        validate_id(id)
    }

    /// Lists records. The limit is defaulted and capped before reaching the adapter.
    #[instrument(skip(self, options), fields(adapter = self.adapter.name()))]
    pub async fn find_many(&self, table: &str, options: QueryOptions) -> Result<PaginatedResult> {
        self.check_table(table)?;
        validate_query(&options)?;

        let options = QueryOptions {
            limit: Some(options.effective_limit()),
            offset: Some(options.effective_offset()),
            ..options
        };
        Ok(self.adapter.find_many(table, &options).await?)
    }

    /// Fetches one record, reading through the cache.
    #[instrument(skip(self), fields(adapter = self.adapter.name()))]
    pub async fn find_one(&self, table: &str, id: &str) -> Result<Option<Record>> {
        self.check_record(table, id)?;

        let key = record_key(table, id);
        if let Some(record) = self.cache.get(&key) {
            debug!(key = %key, "Cache hit");
            return Ok(Some(record));
        }
        debug!(key = %key, "Cache miss");

        let generation = self.cache.generation();
        let record = self.adapter.find_one(table, id).await?;
        if let Some(record) = &record {
            self.cache.set_if_generation(key, record.clone(), generation);
        }
        Ok(record)
    }

    /// Creates a record.
    #[instrument(skip(self, data), fields(adapter = self.adapter.name()))]
    pub async fn create(&self, table: &str, data: Record) -> Result<Record> {
        self.check_table(table)?;
        if let Some(id) = record_id(&data) {
            validate_id(&id)?;
        }

        let created = self.adapter.create(table, data).await?;
        self.cache.invalidate_table(table);
        Ok(created)
    }

    /// Creates several records, returned in input order. Fails as a whole.
    #[instrument(skip(self, data), fields(adapter = self.adapter.name(), count = data.len()))]
    pub async fn create_many(&self, table: &str, data: Vec<Record>) -> Result<Vec<Record>> {
        self.check_table(table)?;
        for id in data.iter().filter_map(record_id) {
            validate_id(&id)?;
        }

        let created = self.adapter.create_many(table, data).await;
        self.cache.invalidate_table(table);
        Ok(created?)
    }

    /// Applies a partial update to an existing record.
    #[instrument(skip(self, data), fields(adapter = self.adapter.name()))]
    pub async fn update(&self, table: &str, id: &str, data: Record) -> Result<Record> {
        self.check_record(table, id)?;
        if let Some(patch_id) = record_id(&data) {
            if patch_id != id {
                return Err(DataError::validation(format!(
                    "Record id '{}' does not match path id '{}'",
                    patch_id, id
                )));
            }
        }

        let updated = self.adapter.update(table, id, data).await?;
        self.cache.remove(&record_key(table, id));
        Ok(updated)
    }

    /// Deletes a record.
    #[instrument(skip(self), fields(adapter = self.adapter.name()))]
    pub async fn delete(&self, table: &str, id: &str) -> Result<()> {
        self.check_record(table, id)?;

        self.adapter.delete(table, id).await?;
        self.cache.remove(&record_key(table, id));
        Ok(())
    }

    /// Deletes every record matching `filters`. Refuses an empty filter set.
    #[instrument(skip(self, filters), fields(adapter = self.adapter.name()))]
    pub async fn delete_many(&self, table: &str, filters: &[Filter]) -> Result<u64> {
        self.check_table(table)?;
        validate_filters(filters)?;
        if filters.is_empty() {
            return Err(DataError::validation(
                "delete_many requires at least one filter",
            ));
        }

        let deleted = self.adapter.delete_many(table, filters).await?;
        self.cache.invalidate_table(table);
        Ok(deleted)
    }

    /// Counts records matching `filters`.
    #[instrument(skip(self, filters), fields(adapter = self.adapter.name()))]
    pub async fn count(&self, table: &str, filters: &[Filter]) -> Result<u64> {
        self.check_table(table)?;
        validate_filters(filters)?;
        Ok(self.adapter.count(table, filters).await?)
    }

    /// Probes the adapter. Never fails: adapter errors report as unhealthy.
    pub async fn health_check(&self) -> HealthStatus {
        match self.adapter.health_check().await {
            Ok(status) => status,
            Err(e) => {
                warn!(adapter = self.adapter.name(), error = %e, "Health check failed");
                HealthStatus {
                    ok: false,
                    latency_ms: 0,
                }
            }
        }
    }
}
