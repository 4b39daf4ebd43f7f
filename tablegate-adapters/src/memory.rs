//! In-memory adapter.
//!
//! Thread-safe storage suitable for development, testing, and single-process
//! deployments. Filters, ordering, and pagination are evaluated in process.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;
use tracing::{debug, instrument};
use uuid::Uuid;

use tablegate_core::constants::{CREATED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD};
use tablegate_core::error::{AdapterError, AdapterResult};
use tablegate_core::traits::DataAdapter;
use tablegate_core::types::{
    compare_values, record_id, Filter, HealthStatus, OrderBy, PaginatedResult, QueryOptions,
    Record, SortDirection,
};

/// In-memory adapter.
///
/// Each table is a vector of records kept in insertion order, so unsorted
/// queries return records in the order they were created.
///
/// # Thread Safety
///
/// All operations are thread-safe and can be called concurrently. Each call
/// locks only the table it touches.
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    /// table name → records
    tables: DashMap<String, Vec<Record>>,
}

impl MemoryAdapter {
    /// Creates a new empty adapter.
    pub fn new() -> Self {
        Self {
            tables: DashMap::new(),
        }
    }

    /// Creates an adapter pre-populated with `(table, records)` pairs.
    ///
    /// Records are stored as given: no ids or timestamps are added.
    pub fn with_seed<I>(seed: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<Record>)>,
    {
        let tables = DashMap::new();
        for (table, records) in seed {
            tables
                .entry(table)
                .or_insert_with(Vec::new)
                .extend(records);
        }
        Self { tables }
    }

    /// Returns the number of records in a table.
    pub fn len(&self, table: &str) -> usize {
        self.tables.get(table).map(|rows| rows.len()).unwrap_or(0)
    }

    /// Returns true if no table holds any record.
    pub fn is_empty(&self) -> bool {
        self.tables.iter().all(|entry| entry.value().is_empty())
    }

    /// Returns the names of all tables that have been written to.
    pub fn tables(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Removes every record from every table.
    pub fn clear(&self) {
        self.tables.clear();
    }

    fn matching(rows: &[Record], filters: &[Filter]) -> Vec<Record> {
        rows.iter()
            .filter(|r| filters.iter().all(|f| f.matches(r)))
            .cloned()
            .collect()
    }
}

/// Sorts by each key in priority order; the first differing key decides.
fn sort_records(records: &mut [Record], order_by: &[OrderBy]) {
    if order_by.is_empty() {
        return;
    }
    records.sort_by(|a, b| {
        for key in order_by {
            let ord = compare_values(a.get(&key.field), b.get(&key.field));
            let ord = match key.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

/// Keeps only the selected columns. An empty selection keeps everything.
fn project(record: Record, select: &[String]) -> Record {
    if select.is_empty() || select.iter().any(|c| c == "*") {
        return record;
    }
    record
        .into_iter()
        .filter(|(field, _)| select.iter().any(|c| c == field))
        .collect()
}

fn now_timestamp() -> Value {
    Value::String(Utc::now().to_rfc3339())
}

/// Assigns a UUID v4 `id` when the input has none and stamps the timestamps.
fn prepare(mut data: Record, now: &Value) -> (String, Record) {
    let id = match record_id(&data) {
        Some(id) => id,
        None => {
            let id = Uuid::new_v4().to_string();
            data.insert(ID_FIELD.to_string(), Value::String(id.clone()));
            id
        }
    };
    data.entry(CREATED_AT_FIELD.to_string()).or_insert_with(|| now.clone());
    data.insert(UPDATED_AT_FIELD.to_string(), now.clone());
    (id, data)
}

fn duplicate_id(table: &str, id: &str) -> AdapterError {
    AdapterError::InvalidInput(format!(
        "record with id '{}' already exists in table '{}'",
        id, table
    ))
}

#[async_trait]
impl DataAdapter for MemoryAdapter {
    fn name(&self) -> &'static str {
        "memory"
    }

    #[instrument(skip(self, options))]
    async fn find_many(&self, table: &str, options: &QueryOptions) -> AdapterResult<PaginatedResult> {
        let limit = options.effective_limit();
        let offset = options.effective_offset();

        let mut matching = match self.tables.get(table) {
            Some(rows) => Self::matching(&rows, &options.filters),
            None => return Ok(PaginatedResult::empty(limit, offset)),
        };

        sort_records(&mut matching, &options.order_by);

        let total = matching.len() as u64;
        let page: Vec<Record> = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|r| project(r, &options.select))
            .collect();

        debug!(total, returned = page.len(), "Listed records");
        Ok(PaginatedResult::new(page, total, limit, offset))
    }

    #[instrument(skip(self))]
    async fn find_one(&self, table: &str, id: &str) -> AdapterResult<Option<Record>> {
        Ok(self.tables.get(table).and_then(|rows| {
            rows.iter()
                .find(|r| record_id(r).as_deref() == Some(id))
                .cloned()
        }))
    }

    /// Creates a record.
    ///
    /// Assigns a UUID v4 `id` when the input has none, and stamps
    /// `created_at` / `updated_at`. Rejects a duplicate `id`.
    #[instrument(skip(self, data))]
    async fn create(&self, table: &str, data: Record) -> AdapterResult<Record> {
        let (id, data) = prepare(data, &now_timestamp());

        let mut rows = self.tables.entry(table.to_string()).or_default();
        if rows.iter().any(|r| record_id(r).as_deref() == Some(id.as_str())) {
            return Err(duplicate_id(table, &id));
        }
        rows.push(data.clone());

        debug!(id = %id, "Created record");
        Ok(data)
    }

    /// Creates records under a single table lock. Output order matches input order.
    ///
    /// Every id is checked against the table and the rest of the batch before
    /// anything is written, so a rejected batch leaves the table untouched.
    #[instrument(skip(self, data), fields(count = data.len()))]
    async fn create_many(&self, table: &str, data: Vec<Record>) -> AdapterResult<Vec<Record>> {
        let now = now_timestamp();
        let prepared: Vec<(String, Record)> =
            data.into_iter().map(|record| prepare(record, &now)).collect();

        let mut rows = self.tables.entry(table.to_string()).or_default();
        let mut taken: HashSet<String> = rows.iter().filter_map(record_id).collect();
        for (id, _) in &prepared {
            if !taken.insert(id.clone()) {
                return Err(duplicate_id(table, id));
            }
        }

        let created: Vec<Record> = prepared.into_iter().map(|(_, record)| record).collect();
        rows.extend(created.iter().cloned());

        debug!(count = created.len(), "Created records");
        Ok(created)
    }

    #[instrument(skip(self, data))]
    async fn update(&self, table: &str, id: &str, data: Record) -> AdapterResult<Record> {
        let mut rows = self
            .tables
            .get_mut(table)
            .ok_or_else(|| AdapterError::not_found(table, id))?;
        let record = rows
            .iter_mut()
            .find(|r| record_id(r).as_deref() == Some(id))
            .ok_or_else(|| AdapterError::not_found(table, id))?;

        for (field, value) in data {
            if field != ID_FIELD {
                record.insert(field, value);
            }
        }
        record.insert(UPDATED_AT_FIELD.to_string(), now_timestamp());

        debug!("Updated record");
        Ok(record.clone())
    }

    #[instrument(skip(self))]
    async fn delete(&self, table: &str, id: &str) -> AdapterResult<()> {
        let mut rows = self
            .tables
            .get_mut(table)
            .ok_or_else(|| AdapterError::not_found(table, id))?;
        let position = rows
            .iter()
            .position(|r| record_id(r).as_deref() == Some(id))
            .ok_or_else(|| AdapterError::not_found(table, id))?;
        rows.remove(position);

        debug!("Deleted record");
        Ok(())
    }

    #[instrument(skip(self, filters))]
    async fn delete_many(&self, table: &str, filters: &[Filter]) -> AdapterResult<u64> {
        let Some(mut rows) = self.tables.get_mut(table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|r| !filters.iter().all(|f| f.matches(r)));
        let deleted = (before - rows.len()) as u64;

        debug!(deleted, "Deleted matching records");
        Ok(deleted)
    }

    async fn count(&self, table: &str, filters: &[Filter]) -> AdapterResult<u64> {
        Ok(self
            .tables
            .get(table)
            .map(|rows| rows.iter().filter(|r| filters.iter().all(|f| f.matches(r))).count() as u64)
            .unwrap_or(0))
    }

    async fn health_check(&self) -> AdapterResult<HealthStatus> {
        let start = Instant::now();
        debug!(tables = self.tables.len(), "Memory adapter health check");
        Ok(HealthStatus {
            ok: true,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    async fn seeded() -> MemoryAdapter {
        let users = [("1", "alice", 30), ("2", "bob", 17), ("3", "carol", 42)]
            .into_iter()
            .map(|(id, name, age)| record(json!({"id": id, "name": name, "age": age})))
            .collect();
        MemoryAdapter::with_seed([("users".to_string(), users)])
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_timestamps() {
        let adapter = MemoryAdapter::new();
        let created = adapter
            .create("users", record(json!({"name": "alice"})))
            .await
            .unwrap();

        let id = record_id(&created).unwrap();
        assert!(Uuid::parse_str(&id).is_ok());
        assert!(created.contains_key(CREATED_AT_FIELD));
        assert!(created.contains_key(UPDATED_AT_FIELD));

        let found = adapter.find_one("users", &id).await.unwrap().unwrap();
        assert_eq!(found, created);
    }

    #[tokio::test]
    async fn test_create_keeps_given_id_and_rejects_duplicates() {
        let adapter = MemoryAdapter::new();
        let created = adapter
            .create("users", record(json!({"id": "u1"})))
            .await
            .unwrap();
        assert_eq!(created["id"], json!("u1"));

        let err = adapter
            .create("users", record(json!({"id": "u1"})))
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::InvalidInput(_)));
        assert_eq!(adapter.len("users"), 1);
    }

    #[tokio::test]
    async fn test_find_many_pagination() {
        let adapter = seeded().await;
        let page = adapter
            .find_many("users", &QueryOptions::new().limit(2).offset(1))
            .await
            .unwrap();

        assert_eq!(page.data.len(), 2);
        assert_eq!(page.count, 3);
        assert_eq!(page.limit, 2);
        assert_eq!(page.offset, 1);
        // offset 1 + 2 returned == 3 total
        assert!(!page.has_more);
        assert_eq!(page.data[0]["id"], json!("2"));

        let first = adapter
            .find_many("users", &QueryOptions::new().limit(2))
            .await
            .unwrap();
        assert!(first.has_more);
    }

    #[tokio::test]
    async fn test_find_many_offset_past_end() {
        let adapter = seeded().await;
        let page = adapter
            .find_many("users", &QueryOptions::new().offset(10))
            .await
            .unwrap();
        assert!(page.data.is_empty());
        assert_eq!(page.count, 3);
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn test_find_many_filters_and_order() {
        let adapter = seeded().await;
        let options = QueryOptions::new()
            .filter(Filter::new("age", tablegate_core::FilterOperator::Gte, json!(18)))
            .order(OrderBy::desc("age"));
        let page = adapter.find_many("users", &options).await.unwrap();

        let names: Vec<&str> = page.data.iter().map(|r| r["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["carol", "alice"]);
        assert_eq!(page.count, 2);
    }

    #[tokio::test]
    async fn test_sort_first_difference_wins() {
        let adapter = MemoryAdapter::new();
        for (id, team, score) in [("a", "red", 1), ("b", "blue", 5), ("c", "red", 9), ("d", "blue", 2)] {
            adapter
                .create("scores", record(json!({"id": id, "team": team, "score": score})))
                .await
                .unwrap();
        }

        let options = QueryOptions::new()
            .order(OrderBy::asc("team"))
            .order(OrderBy::desc("score"));
        let page = adapter.find_many("scores", &options).await.unwrap();
        let ids: Vec<&str> = page.data.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["b", "d", "c", "a"]);
    }

    #[tokio::test]
    async fn test_find_many_select_columns() {
        let adapter = seeded().await;
        let page = adapter
            .find_many("users", &QueryOptions::new().select(["id", "name"]))
            .await
            .unwrap();
        for row in &page.data {
            assert_eq!(row.len(), 2);
            assert!(row.contains_key("name"));
        }
    }

    #[tokio::test]
    async fn test_find_many_unknown_table_is_empty() {
        let adapter = MemoryAdapter::new();
        let page = adapter.find_many("ghosts", &QueryOptions::new()).await.unwrap();
        assert!(page.data.is_empty());
        assert_eq!(page.count, 0);
    }

    #[tokio::test]
    async fn test_create_many_preserves_input_order() {
        let adapter = MemoryAdapter::new();
        let input: Vec<Record> = (0..20).map(|i| record(json!({"seq": i}))).collect();
        let created = adapter.create_many("events", input).await.unwrap();

        let seqs: Vec<i64> = created.iter().map(|r| r["seq"].as_i64().unwrap()).collect();
        assert_eq!(seqs, (0..20).collect::<Vec<_>>());
        assert_eq!(adapter.len("events"), 20);
    }

    #[tokio::test]
    async fn test_create_many_failure_aborts_batch() {
        let adapter = MemoryAdapter::new();
        let input = vec![
            record(json!({"id": "x"})),
            record(json!({"id": "y"})),
            record(json!({"id": "x"})),
        ];
        assert!(adapter.create_many("events", input).await.is_err());
        assert_eq!(adapter.len("events"), 0);

        adapter.create("events", record(json!({"id": "z"}))).await.unwrap();
        let input = vec![record(json!({"id": "w"})), record(json!({"id": "z"}))];
        let err = adapter.create_many("events", input).await.unwrap_err();
        assert!(matches!(err, AdapterError::InvalidInput(_)));
        assert_eq!(adapter.len("events"), 1);
        assert!(adapter.find_one("events", "w").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_with_seed_stores_records_as_given() {
        let adapter = MemoryAdapter::with_seed([
            ("users".to_string(), vec![record(json!({"id": "1"}))]),
            ("posts".to_string(), vec![record(json!({"id": "p"})), record(json!({"id": "q"}))]),
        ]);
        assert_eq!(adapter.tables(), vec!["posts", "users"]);
        assert_eq!(adapter.len("posts"), 2);

        let user = adapter.find_one("users", "1").await.unwrap().unwrap();
        assert!(!user.contains_key(CREATED_AT_FIELD));
    }

    #[tokio::test]
    async fn test_update_merges_and_keeps_id() {
        let adapter = seeded().await;
        let updated = adapter
            .update("users", "1", record(json!({"id": "hijack", "age": 31})))
            .await
            .unwrap();

        assert_eq!(updated["id"], json!("1"));
        assert_eq!(updated["age"], json!(31));
        assert_eq!(updated["name"], json!("alice"));
        assert!(adapter.find_one("users", "hijack").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let adapter = seeded().await;
        let err = adapter
            .update("users", "999", record(json!({"age": 1})))
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete() {
        let adapter = seeded().await;
        adapter.delete("users", "2").await.unwrap();
        assert!(adapter.find_one("users", "2").await.unwrap().is_none());
        assert_eq!(adapter.len("users"), 2);

        let err = adapter.delete("users", "2").await.unwrap_err();
        assert!(matches!(err, AdapterError::NotFound { .. }));

        let err = adapter.delete("ghosts", "1").await.unwrap_err();
        assert!(matches!(err, AdapterError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_many_and_count() {
        let adapter = seeded().await;
        let adults = [Filter::new("age", tablegate_core::FilterOperator::Gte, json!(18))];

        assert_eq!(adapter.count("users", &adults).await.unwrap(), 2);
        assert_eq!(adapter.count("users", &[]).await.unwrap(), 3);

        assert_eq!(adapter.delete_many("users", &adults).await.unwrap(), 2);
        assert_eq!(adapter.count("users", &[]).await.unwrap(), 1);
        assert_eq!(adapter.delete_many("ghosts", &adults).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_health_check() {
        let adapter = MemoryAdapter::new();
        assert!(adapter.health_check().await.unwrap().ok);
    }

    #[tokio::test]
    async fn test_concurrent_create() {
        use std::sync::Arc;
        use tokio::task::JoinSet;

        let adapter = Arc::new(MemoryAdapter::new());
        let mut tasks = JoinSet::new();

        for i in 0..100 {
            let adapter = adapter.clone();
            tasks.spawn(async move {
                adapter
                    .create("items", record(json!({"n": i})))
                    .await
                    .unwrap()
            });
        }

        while let Some(result) = tasks.join_next().await {
            result.unwrap();
        }

        assert_eq!(adapter.len("items"), 100);
        assert_eq!(adapter.tables(), vec!["items".to_string()]);
    }

    #[tokio::test]
    async fn test_clear() {
        let adapter = seeded().await;
        assert!(!adapter.is_empty());
        adapter.clear();
        assert!(adapter.is_empty());
    }
}
