//! API error handling.

use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tablegate_core::error::DataError;

/// Message returned with every rate-limited response.
pub const RATE_LIMIT_MESSAGE: &str = "Too many requests, please try again later.";

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    retry_after_secs: Option<u64>,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            retry_after_secs: None,
        }
    }

    /// Bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Internal server error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Rate limit rejection, retryable after the given number of seconds.
    pub fn too_many_requests(retry_after_secs: u64) -> Self {
        Self {
            retry_after_secs: Some(retry_after_secs),
            ..Self::new(StatusCode::TOO_MANY_REQUESTS, RATE_LIMIT_MESSAGE)
        }
    }

    /// HTTP status of this error.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Client-facing message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Error response body.
#[derive(Serialize)]
struct ErrorResponse<'a> {
    error: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (
            self.status,
            Json(ErrorResponse {
                error: &self.message,
            }),
        )
            .into_response();

        if let Some(secs) = self.retry_after_secs {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

impl From<DataError> for ApiError {
    fn from(err: DataError) -> Self {
        match &err {
            DataError::Validation(_) | DataError::Adapter(_) => ApiError::bad_request(err.to_string()),
            DataError::NotFound(_) => ApiError::not_found(err.to_string()),
            DataError::Unknown(_) => {
                tracing::error!(error = %err, "Internal error");
                ApiError::internal("An internal error occurred")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_error_status_mapping() {
        let cases = [
            (DataError::validation("bad table"), StatusCode::BAD_REQUEST),
            (DataError::Adapter("HTTP 500: boom".into()), StatusCode::BAD_REQUEST),
            (DataError::record_not_found("users", "1"), StatusCode::NOT_FOUND),
            (DataError::Unknown("???".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_unknown_errors_hide_details() {
        let err = ApiError::from(DataError::Unknown("connection pool poisoned".into()));
        assert_eq!(err.message(), "An internal error occurred");
    }

    #[test]
    fn test_rate_limit_response_has_retry_after() {
        let response = ApiError::too_many_requests(42).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }
}
