//! Parsing of the textual query syntax.
//!
//! ```text
//! filter   := field ":" operator ":" value     e.g. "age:gte:18"
//! order_by := field [":" direction]            e.g. "name:desc"
//! select   := column ("," column)*             e.g. "id,name"
//! ```
//!
//! Filter values are read as JSON when they parse as JSON, so `18`, `true`,
//! `null` and `["a","b"]` keep their types. Anything else is a literal string.

use serde_json::Value;

use crate::error::{DataError, Result};
use crate::types::{Filter, FilterOperator, OrderBy, SortDirection};

/// Parses a single `field:operator:value` filter.
///
/// Splits on the first two colons only, so values may themselves contain
/// colons (`created_at:gte:2024-01-01T00:00:00Z`).
pub fn parse_filter(raw: &str) -> Result<Filter> {
    let mut parts = raw.splitn(3, ':');
    let (field, operator, value) = match (parts.next(), parts.next(), parts.next()) {
        (Some(field), Some(operator), Some(value)) => (field, operator, value),
        _ => {
            return Err(DataError::validation(format!(
                "Invalid filter '{}': expected field:operator:value",
                raw
            )))
        }
    };

    if field.is_empty() {
        return Err(DataError::validation(format!(
            "Invalid filter '{}': field name is empty",
            raw
        )));
    }

    let operator: FilterOperator = operator
        .parse()
        .map_err(|_| DataError::validation(format!("Invalid filter '{}': unknown operator '{}'", raw, operator)))?;

    Ok(Filter::new(field, operator, parse_value(value)))
}

/// Parses every raw filter; the first malformed one fails the whole set.
pub fn parse_filters<S: AsRef<str>>(raw: &[S]) -> Result<Vec<Filter>> {
    raw.iter().map(|f| parse_filter(f.as_ref())).collect()
}

/// Reads a filter value as JSON, falling back to a literal string.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Parses `field:direction` sort keys.
///
/// The direction is descending only when it is exactly `desc`.
pub fn parse_order_by<S: AsRef<str>>(raw: &[S]) -> Vec<OrderBy> {
    raw.iter()
        .filter_map(|entry| {
            let mut parts = entry.as_ref().splitn(2, ':');
            let field = parts.next().filter(|f| !f.is_empty())?;
            let direction = match parts.next() {
                Some("desc") => SortDirection::Desc,
                _ => SortDirection::Asc,
            };
            Some(OrderBy {
                field: field.to_string(),
                direction,
            })
        })
        .collect()
}

/// Parses a comma-separated column list.
pub fn parse_select(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_filter_json_number() {
        let filter = parse_filter("age:gte:18").unwrap();
        assert_eq!(filter.field, "age");
        assert_eq!(filter.operator, FilterOperator::Gte);
        assert_eq!(filter.value, json!(18));
        assert!(filter.value.is_number());
    }

    #[test]
    fn test_parse_filter_literal_string() {
        let filter = parse_filter("name:eq:bob").unwrap();
        assert_eq!(filter, Filter::eq("name", json!("bob")));
    }

    #[test]
    fn test_parse_filter_json_values() {
        assert_eq!(parse_filter("active:eq:true").unwrap().value, json!(true));
        assert_eq!(parse_filter("deleted_at:is:null").unwrap().value, Value::Null);
        assert_eq!(
            parse_filter(r#"status:in:["a","b"]"#).unwrap().value,
            json!(["a", "b"])
        );
        assert_eq!(parse_filter(r#"name:eq:"42""#).unwrap().value, json!("42"));
    }

    #[test]
    fn test_parse_filter_value_with_colons() {
        let filter = parse_filter("created_at:gte:2024-01-01T10:30:00Z").unwrap();
        assert_eq!(filter.field, "created_at");
        assert_eq!(filter.value, json!("2024-01-01T10:30:00Z"));
    }

    #[test]
    fn test_parse_filter_empty_value() {
        let filter = parse_filter("name:eq:").unwrap();
        assert_eq!(filter.value, json!(""));
    }

    #[test]
    fn test_parse_filter_malformed() {
        for raw in ["age", "age:gte", ""] {
            let err = parse_filter(raw).unwrap_err();
            assert!(err.is_validation_error());
            assert!(err.to_string().contains(&format!("'{}'", raw)));
        }
    }

    #[test]
    fn test_parse_filter_unknown_operator() {
        let err = parse_filter("age:between:1").unwrap_err();
        assert!(err.is_validation_error());
        assert!(err.to_string().contains("between"));
    }

    #[test]
    fn test_parse_filter_empty_field() {
        assert!(parse_filter(":eq:1").unwrap_err().is_validation_error());
    }

    #[test]
    fn test_parse_filters_first_failure_wins() {
        let ok = parse_filters(&["a:eq:1", "b:neq:2"]).unwrap();
        assert_eq!(ok.len(), 2);

        let err = parse_filters(&["a:eq:1", "broken", "c:xx:1"]).unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_parse_order_by() {
        let order = parse_order_by(&["name:desc", "age"]);
        assert_eq!(order, vec![OrderBy::desc("name"), OrderBy::asc("age")]);
    }

    #[test]
    fn test_parse_order_by_direction_must_be_exact() {
        let order = parse_order_by(&["name:DESC", "age:descending", "x:asc", ":desc"]);
        assert_eq!(
            order,
            vec![OrderBy::asc("name"), OrderBy::asc("age"), OrderBy::asc("x")]
        );
    }

    #[test]
    fn test_parse_select() {
        assert_eq!(parse_select("id, name,,email "), vec!["id", "name", "email"]);
        assert!(parse_select("").is_empty());
    }
}
