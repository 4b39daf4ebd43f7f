//! API route handlers.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::{debug, info};

use tablegate_core::error::DataError;
use tablegate_core::query::{parse_filters, parse_order_by, parse_select};
use tablegate_core::types::{Filter, QueryOptions, Record};

use crate::dto::*;
use crate::error::ApiError;
use crate::state::AppState;

type Result<T> = std::result::Result<T, ApiError>;

type QueryPairs = std::result::Result<Query<Vec<(String, String)>>, QueryRejection>;

fn query_pairs(query: QueryPairs) -> Result<Vec<(String, String)>> {
    query
        .map(|Query(pairs)| pairs)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}

fn values<'a>(pairs: &'a [(String, String)], key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    pairs
        .iter()
        .filter(move |(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn parse_usize(pairs: &[(String, String)], key: &str) -> Result<Option<usize>> {
    match values(pairs, key).last() {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ApiError::bad_request(format!("Invalid {}: '{}'", key, raw))),
    }
}

fn filters_from(pairs: &[(String, String)]) -> Result<Vec<Filter>> {
    let raw: Vec<&str> = values(pairs, "filter").collect();
    Ok(parse_filters(&raw)?)
}

/// Builds list options from `filter`, `orderBy`, `limit`, `offset`, `select`.
fn query_options(pairs: &[(String, String)]) -> Result<QueryOptions> {
    let order: Vec<&str> = values(pairs, "orderBy").collect();
    Ok(QueryOptions {
        filters: filters_from(pairs)?,
        order_by: parse_order_by(&order),
        limit: parse_usize(pairs, "limit")?,
        offset: parse_usize(pairs, "offset")?,
        select: values(pairs, "select").flat_map(parse_select).collect(),
    })
}

/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let status = state.service.health_check().await;
    let code = if status.ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(HealthResponse::from(status)))
}

/// GET /:table
pub async fn list_records(
    State(state): State<Arc<AppState>>,
    Path(table): Path<String>,
    query: QueryPairs,
) -> Result<Json<ListResponse>> {
    let options = query_options(&query_pairs(query)?)?;
    let page = state.service.find_many(&table, options).await?;

    debug!(table = %table, returned = page.data.len(), total = page.count, "Listed records");
    Ok(Json(page.into()))
}

/// GET /:table/count
pub async fn count_records(
    State(state): State<Arc<AppState>>,
    Path(table): Path<String>,
    query: QueryPairs,
) -> Result<Json<CountResponse>> {
    let filters = filters_from(&query_pairs(query)?)?;
    let count = state.service.count(&table, &filters).await?;
    Ok(Json(CountResponse { count }))
}

/// GET /:table/:id
pub async fn get_record(
    State(state): State<Arc<AppState>>,
    Path((table, id)): Path<(String, String)>,
) -> Result<Json<Record>> {
    state
        .service
        .find_one(&table, &id)
        .await?
        .map(Json)
        .ok_or_else(|| DataError::record_not_found(&table, &id).into())
}

/// POST /:table
pub async fn create_record(
    State(state): State<Arc<AppState>>,
    Path(table): Path<String>,
    payload: std::result::Result<Json<Record>, JsonRejection>,
) -> Result<(StatusCode, Json<Record>)> {
    let Json(data) = payload?;
    let created = state.service.create(&table, data).await?;

    info!(table = %table, "Created record");
    Ok((StatusCode::CREATED, Json(created)))
}

/// POST /:table/batch
pub async fn create_records(
    State(state): State<Arc<AppState>>,
    Path(table): Path<String>,
    payload: std::result::Result<Json<Vec<Record>>, JsonRejection>,
) -> Result<(StatusCode, Json<Vec<Record>>)> {
    let Json(data) = payload?;
    let created = state.service.create_many(&table, data).await?;

    info!(table = %table, count = created.len(), "Created records");
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /:table/:id
pub async fn update_record(
    State(state): State<Arc<AppState>>,
    Path((table, id)): Path<(String, String)>,
    payload: std::result::Result<Json<Record>, JsonRejection>,
) -> Result<Json<Record>> {
    let Json(data) = payload?;
    let updated = state.service.update(&table, &id, data).await?;
    Ok(Json(updated))
}

/// DELETE /:table/:id
pub async fn delete_record(
    State(state): State<Arc<AppState>>,
    Path((table, id)): Path<(String, String)>,
) -> Result<Json<DeleteResponse>> {
    state.service.delete(&table, &id).await?;

    info!(table = %table, id = %id, "Deleted record");
    Ok(Json(DeleteResponse { ok: true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablegate_core::{FilterOperator, SortDirection};

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_query_options_from_pairs() {
        let options = query_options(&pairs(&[
            ("filter", "age:gte:18"),
            ("filter", "name:eq:bob"),
            ("orderBy", "name:desc"),
            ("orderBy", "age"),
            ("limit", "25"),
            ("offset", "50"),
            ("select", "id,name"),
            ("unrelated", "x"),
        ]))
        .unwrap();

        assert_eq!(options.filters.len(), 2);
        assert_eq!(options.filters[0].operator, FilterOperator::Gte);
        assert_eq!(options.order_by[0].direction, SortDirection::Desc);
        assert_eq!(options.order_by[1].direction, SortDirection::Asc);
        assert_eq!(options.limit, Some(25));
        assert_eq!(options.offset, Some(50));
        assert_eq!(options.select, vec!["id", "name"]);
    }

    #[test]
    fn test_query_options_rejects_bad_input() {
        assert!(query_options(&pairs(&[("limit", "-1")])).is_err());
        assert!(query_options(&pairs(&[("offset", "ten")])).is_err());
        assert!(query_options(&pairs(&[("filter", "age")])).is_err());
    }
}
