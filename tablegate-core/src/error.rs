//! Error types for TableGate.
//!
//! Two layers of errors exist:
//!
//! - [`AdapterError`] is what a backend adapter reports. It keeps "not found"
//!   distinct from backend failures.
//! - [`DataError`] is the uniform taxonomy the data service exposes. Adapter
//!   errors are re-wrapped into it at the service boundary, so backend-specific
//!   error types never leak to callers.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using `DataError`.
pub type Result<T> = std::result::Result<T, DataError>;

/// Result type alias using `AdapterError`.
pub type AdapterResult<T> = std::result::Result<T, AdapterError>;

/// Stable code attached to every [`DataError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed table, id, or filter input. The client must fix the request.
    Validation,
    /// The target record does not exist.
    NotFound,
    /// The backend call failed.
    Adapter,
    /// Anything that fits no other category.
    Unknown,
}

impl ErrorCode {
    /// Returns the wire representation of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Validation => "VALIDATION",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Adapter => "ADAPTER",
            ErrorCode::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for all data service operations.
#[derive(Debug, Error)]
pub enum DataError {
    /// Input validation failed before any backend call was made.
    #[error("{0}")]
    Validation(String),

    /// The requested record does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The backend adapter failed.
    #[error("{0}")]
    Adapter(String),

    /// Catch-all for failures outside the other categories.
    #[error("{0}")]
    Unknown(String),
}

impl DataError {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        DataError::Validation(message.into())
    }

    /// Creates a not-found error for a record in a table.
    pub fn record_not_found(table: &str, id: &str) -> Self {
        DataError::NotFound(format!("Record '{}' not found in table '{}'", id, table))
    }

    /// Returns the taxonomy code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            DataError::Validation(_) => ErrorCode::Validation,
            DataError::NotFound(_) => ErrorCode::NotFound,
            DataError::Adapter(_) => ErrorCode::Adapter,
            DataError::Unknown(_) => ErrorCode::Unknown,
        }
    }

    /// Returns true if this is a validation error.
    pub fn is_validation_error(&self) -> bool {
        matches!(self, DataError::Validation(_))
    }

    /// Returns true if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DataError::NotFound(_))
    }
}

/// Error reported by a backend adapter.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The record addressed by the call does not exist.
    #[error("Record '{id}' not found in table '{table}'")]
    NotFound {
        /// Table that was queried
        table: String,
        /// Record identifier that was not found
        id: String,
    },

    /// The backend rejected the call or could not be reached.
    #[error("Backend error: {0}")]
    Backend(String),

    /// The backend answered with something the adapter could not interpret.
    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),

    /// The adapter was handed input it cannot process.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Any other failure.
    #[error("{0}")]
    Other(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl AdapterError {
    /// Creates a not-found error.
    pub fn not_found(table: impl Into<String>, id: impl Into<String>) -> Self {
        AdapterError::NotFound {
            table: table.into(),
            id: id.into(),
        }
    }
}

impl From<AdapterError> for DataError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::NotFound { .. } => DataError::NotFound(err.to_string()),
            AdapterError::InvalidInput(_) => DataError::Validation(err.to_string()),
            AdapterError::Backend(_) | AdapterError::InvalidResponse(_) | AdapterError::Json(_) => {
                DataError::Adapter(err.to_string())
            }
            AdapterError::Other(_) => DataError::Unknown(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(DataError::validation("bad").code(), ErrorCode::Validation);
        assert_eq!(DataError::record_not_found("users", "1").code(), ErrorCode::NotFound);
        assert_eq!(DataError::Adapter("x".into()).code(), ErrorCode::Adapter);
        assert_eq!(DataError::Unknown("x".into()).code(), ErrorCode::Unknown);
        assert_eq!(ErrorCode::NotFound.to_string(), "NOT_FOUND");
    }

    #[test]
    fn test_adapter_error_conversion() {
        let err: DataError = AdapterError::not_found("users", "42").into();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("42"));

        let err: DataError = AdapterError::Backend("connection refused".into()).into();
        assert_eq!(err.code(), ErrorCode::Adapter);
        assert!(err.to_string().contains("connection refused"));

        let err: DataError = AdapterError::InvalidInput("duplicate id".into()).into();
        assert!(err.is_validation_error());

        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err: DataError = AdapterError::Other(Box::new(io)).into();
        assert_eq!(err.code(), ErrorCode::Unknown);
    }

    #[test]
    fn test_json_error_conversion() {
        let json_result: std::result::Result<serde_json::Value, _> = serde_json::from_str("invalid");
        let adapter_result: AdapterResult<serde_json::Value> = json_result.map_err(AdapterError::from);
        assert!(matches!(adapter_result, Err(AdapterError::Json(_))));
    }
}
