//! Identifier validation for tables, columns, and records.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{DataError, Result};
use crate::types::{Filter, QueryOptions};

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("valid identifier regex"));

static RECORD_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,255}$").expect("valid record id regex"));

/// Returns true if `name` is a syntactically valid table name.
///
/// A letter or underscore, followed by up to 62 letters, digits, or underscores.
pub fn is_valid_table_name(name: &str) -> bool {
    IDENTIFIER_RE.is_match(name)
}

/// Returns true if `name` is a plain column name, with the same shape as a table name.
pub fn is_valid_column_name(name: &str) -> bool {
    IDENTIFIER_RE.is_match(name)
}

/// Returns true if `id` is a syntactically valid record identifier.
///
/// 1 to 255 letters, digits, underscores, or hyphens.
pub fn is_valid_record_id(id: &str) -> bool {
    RECORD_ID_RE.is_match(id)
}

/// Validates a table name, and its membership in `allowed` when an allow-list is given.
pub fn validate_table(table: &str, allowed: Option<&[String]>) -> Result<()> {
    if !is_valid_table_name(table) {
        return Err(DataError::validation(format!("Invalid table name: '{}'", table)));
    }
    if let Some(allowed) = allowed {
        if !allowed.iter().any(|t| t == table) {
            return Err(DataError::validation(format!("Table '{}' is not allowed", table)));
        }
    }
    Ok(())
}

/// Validates a column name.
pub fn validate_column(name: &str) -> Result<()> {
    if !is_valid_column_name(name) {
        return Err(DataError::validation(format!("Invalid column name: '{}'", name)));
    }
    Ok(())
}

/// Validates every filter field.
pub fn validate_filters(filters: &[Filter]) -> Result<()> {
    filters.iter().try_for_each(|f| validate_column(&f.field))
}

/// Validates the columns a list query names: projection, filters, and sort keys.
///
/// `*` is accepted in the projection and means every column.
pub fn validate_query(options: &QueryOptions) -> Result<()> {
    options
        .select
        .iter()
        .filter(|c| c.as_str() != "*")
        .try_for_each(|c| validate_column(c))?;
    validate_filters(&options.filters)?;
    options.order_by.iter().try_for_each(|o| validate_column(&o.field))
}

/// Validates a record identifier.
pub fn validate_id(id: &str) -> Result<()> {
    if !is_valid_record_id(id) {
        return Err(DataError::validation(format!("Invalid record id: '{}'", id)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OrderBy;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case("users" ; "plain")]
    #[test_case("_private" ; "leading underscore")]
    #[test_case("Order_Items2" ; "mixed case with digit")]
    #[test_case("a" ; "single letter")]
    fn test_valid_table_names(name: &str) {
        assert!(validate_table(name, None).is_ok());
    }

    #[test_case("" ; "empty")]
    #[test_case("1users" ; "leading digit")]
    #[test_case("user-profiles" ; "hyphen")]
    #[test_case("users;drop" ; "semicolon")]
    #[test_case("public.users" ; "dot")]
    #[test_case("über" ; "non ascii")]
    fn test_invalid_table_names(name: &str) {
        let err = validate_table(name, None).unwrap_err();
        assert!(err.is_validation_error());
    }

    #[test]
    fn test_table_name_length_limit() {
        let max = format!("t{}", "x".repeat(62));
        assert!(is_valid_table_name(&max));
        let too_long = format!("t{}", "x".repeat(63));
        assert!(!is_valid_table_name(&too_long));
    }

    #[test]
    fn test_allow_list() {
        let allowed = vec!["users".to_string(), "posts".to_string()];
        assert!(validate_table("users", Some(&allowed)).is_ok());

        let err = validate_table("secrets", Some(&allowed)).unwrap_err();
        assert!(err.is_validation_error());
        assert!(err.to_string().contains("secrets"));

        // Allow-list never rescues a malformed name
        let allowed = vec!["1bad".to_string()];
        assert!(validate_table("1bad", Some(&allowed)).is_err());
    }

    #[test_case("secrets(*)" ; "embedded resource")]
    #[test_case("owner:users(name)" ; "renamed embed")]
    #[test_case("data->>key" ; "json path")]
    #[test_case("name,age" ; "list")]
    #[test_case("" ; "empty")]
    fn test_invalid_columns(column: &str) {
        assert!(validate_column(column).unwrap_err().is_validation_error());
    }

    #[test]
    fn test_validate_query_columns() {
        let ok = QueryOptions::new()
            .select(["*", "id", "created_at"])
            .filter(Filter::eq("age", serde_json::json!(3)))
            .order(OrderBy::desc("name"));
        assert!(validate_query(&ok).is_ok());

        let embed = QueryOptions::new().select(["id", "secrets(*)"]);
        assert!(validate_query(&embed).unwrap_err().to_string().contains("secrets(*)"));

        let filter = QueryOptions::new().filter(Filter::eq("age.gt", serde_json::json!(3)));
        assert!(validate_query(&filter).is_err());

        let order = QueryOptions::new().order(OrderBy::asc("name;drop"));
        assert!(validate_query(&order).is_err());
    }

    #[test_case("1" ; "digit")]
    #[test_case("550e8400-e29b-41d4-a716-446655440000" ; "uuid")]
    #[test_case("user_42" ; "underscore")]
    fn test_valid_ids(id: &str) {
        assert!(validate_id(id).is_ok());
    }

    #[test_case("" ; "empty")]
    #[test_case("a b" ; "space")]
    #[test_case("../etc" ; "path traversal")]
    #[test_case("id:1" ; "colon")]
    fn test_invalid_ids(id: &str) {
        assert!(validate_id(id).unwrap_err().is_validation_error());
    }

    #[test]
    fn test_id_length_limit() {
        assert!(is_valid_record_id(&"a".repeat(255)));
        assert!(!is_valid_record_id(&"a".repeat(256)));
    }

    proptest! {
        #[test]
        fn prop_generated_table_names_accepted(name in "[A-Za-z_][A-Za-z0-9_]{0,62}") {
            prop_assert!(validate_table(&name, None).is_ok());
        }

        #[test]
        fn prop_names_with_forbidden_chars_rejected(
            prefix in "[a-z]{1,10}",
            bad in "[-.:;/ ]",
            suffix in "[a-z]{0,10}",
        ) {
            let name = format!("{}{}{}", prefix, bad, suffix);
            prop_assert!(validate_table(&name, None).is_err());
        }

        #[test]
        fn prop_allow_list_membership(name in "[a-z]{1,20}") {
            let allowed = vec![name.clone()];
            prop_assert!(validate_table(&name, Some(&allowed)).is_ok());
            let other = format!("{}_x", name);
            prop_assert!(validate_table(&other, Some(&allowed)).is_err());
        }

        #[test]
        fn prop_generated_ids_accepted(id in "[A-Za-z0-9_-]{1,255}") {
            prop_assert!(validate_id(&id).is_ok());
        }
    }
}
