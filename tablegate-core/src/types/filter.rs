//! Filter predicates shared by every adapter.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DataError;
use crate::types::Record;

/// Comparison operators understood by every adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    /// Equals
    Eq,
    /// Not equals
    Neq,
    /// Greater than
    Gt,
    /// Greater than or equal
    Gte,
    /// Less than
    Lt,
    /// Less than or equal
    Lte,
    /// String contains
    Like,
    /// Case-insensitive string contains
    Ilike,
    /// Value in list
    In,
    /// Is null, or exactly equal to a non-null literal
    Is,
}

impl FilterOperator {
    /// All operators, in declaration order.
    pub const ALL: [FilterOperator; 10] = [
        FilterOperator::Eq,
        FilterOperator::Neq,
        FilterOperator::Gt,
        FilterOperator::Gte,
        FilterOperator::Lt,
        FilterOperator::Lte,
        FilterOperator::Like,
        FilterOperator::Ilike,
        FilterOperator::In,
        FilterOperator::Is,
    ];

    /// Get the operator string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Neq => "neq",
            FilterOperator::Gt => "gt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lt => "lt",
            FilterOperator::Lte => "lte",
            FilterOperator::Like => "like",
            FilterOperator::Ilike => "ilike",
            FilterOperator::In => "in",
            FilterOperator::Is => "is",
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOperator {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterOperator::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| DataError::validation(format!("Unknown filter operator: '{}'", s)))
    }
}

/// A single `field operator value` predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// Field to filter on
    pub field: String,
    /// Comparison operator
    pub operator: FilterOperator,
    /// Value to compare against
    pub value: Value,
}

impl Filter {
    /// Create a new filter
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Create an equality filter
    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, FilterOperator::Eq, value)
    }

    /// Create an "in list" filter
    pub fn in_list(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::new(field, FilterOperator::In, Value::Array(values))
    }

    /// Check if a record matches this filter.
    pub fn matches(&self, record: &Record) -> bool {
        let Some(actual) = record.get(&self.field) else {
            // A missing field behaves like null
            return match self.operator {
                FilterOperator::Is => self.value.is_null(),
                FilterOperator::Neq => !self.value.is_null(),
                _ => false,
            };
        };

        match self.operator {
            FilterOperator::Eq => values_equal(actual, &self.value),
            FilterOperator::Neq => !values_equal(actual, &self.value),
            FilterOperator::Gt => comparable(actual, &self.value) == Some(Ordering::Greater),
            FilterOperator::Gte => matches!(
                comparable(actual, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FilterOperator::Lt => comparable(actual, &self.value) == Some(Ordering::Less),
            FilterOperator::Lte => matches!(
                comparable(actual, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            FilterOperator::Like => match (actual.as_str(), needle(&self.value)) {
                (Some(haystack), Some(needle)) => haystack.contains(needle.as_str()),
                _ => false,
            },
            FilterOperator::Ilike => match (actual.as_str(), needle(&self.value)) {
                (Some(haystack), Some(needle)) => {
                    haystack.to_lowercase().contains(&needle.to_lowercase())
                }
                _ => false,
            },
            FilterOperator::In => self
                .value
                .as_array()
                .map(|candidates| candidates.iter().any(|c| values_equal(actual, c)))
                .unwrap_or(false),
            FilterOperator::Is => match &self.value {
                Value::Null => actual.is_null(),
                expected => values_equal(actual, expected),
            },
        }
    }
}

/// Text searched for by `like`/`ilike`. Non-string literals such as `42`
/// parse as JSON numbers, so they are searched for in their textual form.
fn needle(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// JSON equality with numbers compared by value (`18 == 18.0`).
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}

/// Ordering between two values of the same scalar type, `None` otherwise.
fn comparable(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

/// Total ordering used for sorting.
///
/// Missing and null sort first, then booleans, numbers, strings, arrays, and
/// objects. Values of the same scalar type compare naturally.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let rank = type_rank(a).cmp(&type_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }
    match (a, b) {
        (Some(x), Some(y)) => comparable(x, y).unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    }
}
