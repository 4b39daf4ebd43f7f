//! PostgREST-compatible remote adapter.
//!
//! Talks to any service speaking the PostgREST dialect (Supabase's REST API,
//! a self-hosted PostgREST, ...). Filters, ordering, and pagination are
//! delegated to the backend's own query syntax:
//!
//! ```text
//! GET /users?select=id,name&age=gte.18&name=ilike.*bo*&order=name.desc
//! Range-Unit: items
//! Range: 0-24
//! Prefer: count=exact            → Content-Range: 0-24/312
//! ```

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_RANGE};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use tablegate_core::constants::ID_FIELD;
use tablegate_core::error::{AdapterError, AdapterResult};
use tablegate_core::traits::DataAdapter;
use tablegate_core::types::{
    Filter, FilterOperator, HealthStatus, OrderBy, PaginatedResult, QueryOptions, Record,
};

/// Remote adapter configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RestConfig {
    /// REST root, e.g. `https://xyzcompany.supabase.co/rest/v1`
    pub base_url: String,
    /// API key sent as `apikey` and as a bearer token
    pub api_key: Option<String>,
    /// Schema selected through `Accept-Profile` / `Content-Profile`
    pub schema: Option<String>,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl RestConfig {
    /// Creates config for the given REST root.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            schema: None,
            timeout_seconds: 30,
        }
    }

    /// Adds an API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Selects a non-default schema.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }
}

/// Adapter for PostgREST-compatible services.
pub struct RestAdapter {
    base_url: Url,
    http_client: reqwest::Client,
}

/// Error body returned by PostgREST.
#[derive(Debug, Deserialize)]
struct PostgrestError {
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

impl RestAdapter {
    /// Creates a new adapter with the given config.
    pub fn new(config: RestConfig) -> AdapterResult<Self> {
        let mut base = config.base_url.trim_end_matches('/').to_string();
        base.push('/');
        let base_url = Url::parse(&base)
            .map_err(|e| AdapterError::InvalidInput(format!("invalid base URL '{}': {}", config.base_url, e)))?;

        let mut headers = HeaderMap::new();
        if let Some(key) = &config.api_key {
            headers.insert(HeaderName::from_static("apikey"), header_value(key)?);
            headers.insert(
                reqwest::header::AUTHORIZATION,
                header_value(&format!("Bearer {}", key))?,
            );
        }
        if let Some(schema) = &config.schema {
            headers.insert(HeaderName::from_static("accept-profile"), header_value(schema)?);
            headers.insert(HeaderName::from_static("content-profile"), header_value(schema)?);
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .build()
            .map_err(|e| AdapterError::Other(Box::new(e)))?;

        Ok(Self {
            base_url,
            http_client,
        })
    }

    fn table_url(&self, table: &str) -> AdapterResult<Url> {
        self.base_url
            .join(table)
            .map_err(|e| AdapterError::InvalidInput(format!("invalid table '{}': {}", table, e)))
    }

    fn request(&self, method: Method, table: &str) -> AdapterResult<RequestBuilder> {
        Ok(self.http_client.request(method, self.table_url(table)?))
    }

    async fn send(&self, request: RequestBuilder) -> AdapterResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| AdapterError::Backend(e.to_string()))?;

        if response.status().is_success() {
            return Ok(response);
        }
        Err(error_from_response(response).await)
    }

    async fn records(response: Response) -> AdapterResult<Vec<Record>> {
        let body = response
            .bytes()
            .await
            .map_err(|e| AdapterError::Backend(e.to_string()))?;
        if body.is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_slice(&body)?)
    }
}

fn header_value(value: &str) -> AdapterResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| AdapterError::InvalidInput(e.to_string()))
}

async fn error_from_response(response: Response) -> AdapterError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<PostgrestError>(&text) {
        Ok(err) => [err.message, err.details, err.hint]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" | "),
        Err(_) => text,
    };
    AdapterError::Backend(format!("HTTP {}: {}", status.as_u16(), message))
}

/// Renders a scalar as PostgREST expects it in a filter.
fn scalar(value: &Value) -> AdapterResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok("null".into()),
        Value::Array(_) | Value::Object(_) => Err(AdapterError::InvalidInput(format!(
            "expected a scalar filter value, got {}",
            value
        ))),
    }
}

/// Renders one element of an `in.(...)` list, quoting reserved characters.
fn list_item(value: &Value) -> AdapterResult<String> {
    let raw = scalar(value)?;
    if raw.chars().any(|c| matches!(c, ',' | '(' | ')' | '"' | '\\' | ' ')) {
        Ok(format!("\"{}\"", raw.replace('\\', "\\\\").replace('"', "\\\"")))
    } else {
        Ok(raw)
    }
}

/// Query parameters PostgREST interprets itself rather than as column filters.
const RESERVED_PARAMS: [&str; 6] = ["select", "order", "limit", "offset", "and", "or"];

/// Maps a filter onto a PostgREST query parameter.
fn filter_param(filter: &Filter) -> AdapterResult<(String, String)> {
    if RESERVED_PARAMS.contains(&filter.field.as_str()) {
        return Err(AdapterError::InvalidInput(format!(
            "cannot filter on reserved column '{}'",
            filter.field
        )));
    }
    let value = &filter.value;
    let expr = match filter.operator {
        FilterOperator::Eq
        | FilterOperator::Neq
        | FilterOperator::Gt
        | FilterOperator::Gte
        | FilterOperator::Lt
        | FilterOperator::Lte => format!("{}.{}", filter.operator.as_str(), scalar(value)?),
        FilterOperator::Like => format!("like.*{}*", scalar(value)?),
        FilterOperator::Ilike => format!("ilike.*{}*", scalar(value)?),
        FilterOperator::In => {
            let items = value.as_array().ok_or_else(|| {
                AdapterError::InvalidInput(format!("'in' filter on '{}' needs an array", filter.field))
            })?;
            let rendered = items.iter().map(list_item).collect::<AdapterResult<Vec<_>>>()?;
            format!("in.({})", rendered.join(","))
        }
        FilterOperator::Is => format!("is.{}", scalar(value)?),
    };
    Ok((filter.field.clone(), expr))
}

fn filter_params(filters: &[Filter]) -> AdapterResult<Vec<(String, String)>> {
    filters.iter().map(filter_param).collect()
}

fn order_param(order_by: &[OrderBy]) -> Option<(String, String)> {
    if order_by.is_empty() {
        return None;
    }
    let keys: Vec<String> = order_by
        .iter()
        .map(|o| format!("{}.{}", o.field, o.direction.as_str()))
        .collect();
    Some(("order".into(), keys.join(",")))
}

fn select_param(select: &[String]) -> (String, String) {
    let columns = if select.is_empty() {
        "*".to_string()
    } else {
        select.join(",")
    };
    ("select".into(), columns)
}

fn id_param(id: &str) -> (String, String) {
    (ID_FIELD.into(), format!("eq.{}", id))
}

/// Extracts the total from a `Content-Range` header (`0-24/312`, `*/0`).
fn content_range_total(headers: &HeaderMap) -> Option<u64> {
    let raw = headers.get(CONTENT_RANGE)?.to_str().ok()?;
    raw.rsplit_once('/')?.1.trim().parse().ok()
}

#[async_trait]
impl DataAdapter for RestAdapter {
    fn name(&self) -> &'static str {
        "rest"
    }

    #[instrument(skip(self, options))]
    async fn find_many(&self, table: &str, options: &QueryOptions) -> AdapterResult<PaginatedResult> {
        let limit = options.effective_limit();
        let offset = options.effective_offset();

        if limit == 0 {
            let total = self.count(table, &options.filters).await?;
            return Ok(PaginatedResult::new(Vec::new(), total, limit, offset));
        }

        let last = offset.checked_add(limit - 1).ok_or_else(|| {
            AdapterError::InvalidInput(format!("offset {} is out of range", offset))
        })?;

        let mut params = vec![select_param(&options.select)];
        params.extend(filter_params(&options.filters)?);
        params.extend(order_param(&options.order_by));

        let request = self
            .request(Method::GET, table)?
            .query(&params)
            .header("Prefer", "count=exact")
            .header("Range-Unit", "items")
            .header("Range", format!("{}-{}", offset, last));

        let response = request
            .send()
            .await
            .map_err(|e| AdapterError::Backend(e.to_string()))?;

        // Offset beyond the last row: PostgREST answers 416 with `*/total`.
        if response.status() == StatusCode::RANGE_NOT_SATISFIABLE {
            let total = content_range_total(response.headers()).unwrap_or(0);
            return Ok(PaginatedResult::new(Vec::new(), total, limit, offset));
        }
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let total = content_range_total(response.headers());
        let data = Self::records(response).await?;
        let total = total.unwrap_or_else(|| {
            warn!("Backend returned no exact count; deriving from page");
            offset.saturating_add(data.len()) as u64
        });

        debug!(total, returned = data.len(), "Listed records");
        Ok(PaginatedResult::new(data, total, limit, offset))
    }

    #[instrument(skip(self))]
    async fn find_one(&self, table: &str, id: &str) -> AdapterResult<Option<Record>> {
        let request = self
            .request(Method::GET, table)?
            .query(&[select_param(&[]), id_param(id), ("limit".into(), "1".into())]);
        let response = self.send(request).await?;
        Ok(Self::records(response).await?.into_iter().next())
    }

    #[instrument(skip(self, data))]
    async fn create(&self, table: &str, data: Record) -> AdapterResult<Record> {
        let request = self
            .request(Method::POST, table)?
            .header("Prefer", "return=representation")
            .json(&data);
        let response = self.send(request).await?;
        Self::records(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AdapterError::InvalidResponse("create returned no representation".into()))
    }

    /// Inserts the whole batch in one request; the backend applies it atomically.
    #[instrument(skip(self, data), fields(count = data.len()))]
    async fn create_many(&self, table: &str, data: Vec<Record>) -> AdapterResult<Vec<Record>> {
        if data.is_empty() {
            return Ok(Vec::new());
        }
        let request = self
            .request(Method::POST, table)?
            .header("Prefer", "return=representation")
            .json(&data);
        let response = self.send(request).await?;
        let created = Self::records(response).await?;
        if created.len() != data.len() {
            return Err(AdapterError::InvalidResponse(format!(
                "batch insert returned {} records for {} inputs",
                created.len(),
                data.len()
            )));
        }
        Ok(created)
    }

    #[instrument(skip(self, data))]
    async fn update(&self, table: &str, id: &str, data: Record) -> AdapterResult<Record> {
        let request = self
            .request(Method::PATCH, table)?
            .query(&[id_param(id)])
            .header("Prefer", "return=representation")
            .json(&data);
        let response = self.send(request).await?;
        Self::records(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AdapterError::not_found(table, id))
    }

    #[instrument(skip(self))]
    async fn delete(&self, table: &str, id: &str) -> AdapterResult<()> {
        let request = self
            .request(Method::DELETE, table)?
            .query(&[id_param(id)])
            .header("Prefer", "return=representation");
        let response = self.send(request).await?;
        if Self::records(response).await?.is_empty() {
            return Err(AdapterError::not_found(table, id));
        }
        Ok(())
    }

    #[instrument(skip(self, filters))]
    async fn delete_many(&self, table: &str, filters: &[Filter]) -> AdapterResult<u64> {
        let request = self
            .request(Method::DELETE, table)?
            .query(&filter_params(filters)?)
            .header("Prefer", "return=representation");
        let response = self.send(request).await?;
        Ok(Self::records(response).await?.len() as u64)
    }

    #[instrument(skip(self, filters))]
    async fn count(&self, table: &str, filters: &[Filter]) -> AdapterResult<u64> {
        let mut params = vec![select_param(&[])];
        params.extend(filter_params(filters)?);
        let request = self
            .request(Method::HEAD, table)?
            .query(&params)
            .header("Prefer", "count=exact");
        let response = self.send(request).await?;
        content_range_total(response.headers())
            .ok_or_else(|| AdapterError::InvalidResponse("missing Content-Range count".into()))
    }

    async fn health_check(&self) -> AdapterResult<HealthStatus> {
        let start = Instant::now();
        let result = self.http_client.get(self.base_url.clone()).send().await;
        let latency_ms = start.elapsed().as_millis() as u64;

        let ok = match result {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!(error = %e, "Health check request failed");
                false
            }
        };
        Ok(HealthStatus { ok, latency_ms })
    }
}
