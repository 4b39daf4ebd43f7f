//! # TableGate API Server
//!
//! Exposes any configured backend's tables over a small JSON REST surface.
//!
//! ## Endpoints
//!
//! - `GET /health` - Backend health and probe latency
//! - `GET /:table` - List records (`filter`, `orderBy`, `limit`, `offset`, `select`)
//! - `GET /:table/count` - Count records matching `filter`
//! - `GET /:table/:id` - Fetch one record
//! - `POST /:table` - Create a record
//! - `POST /:table/batch` - Create several records
//! - `PUT /:table/:id` - Partially update a record
//! - `DELETE /:table/:id` - Delete a record
//!
//! ## Example
//!
//! ```rust,ignore
//! use tablegate_api::{ApiServer, ApiConfig};
//!
//! let config = ApiConfig::from_env()?;
//! let server = ApiServer::new(config)?;
//! server.run(([0, 0, 0, 0], 3000)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod dto;
mod error;
mod handlers;
mod rate_limit;
mod routes;
mod state;

pub use dto::{CountResponse, DeleteResponse, HealthResponse, ListResponse};
pub use error::{ApiError, RATE_LIMIT_MESSAGE};
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use routes::create_router;
pub use state::{AdapterKind, ApiConfig, AppState, ConfigError};
#[cfg(feature = "rest")]
pub use tablegate_adapters::RestConfig;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// API server for TableGate.
pub struct ApiServer {
    state: Arc<AppState>,
}

impl ApiServer {
    /// Creates a new API server with the given configuration.
    pub fn new(config: ApiConfig) -> Result<Self, ConfigError> {
        Ok(Self::from_state(AppState::new(config)?))
    }

    /// Creates a server around prepared state.
    pub fn from_state(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    fn cors(&self) -> CorsLayer {
        let origins: Vec<HeaderValue> = self
            .state
            .config
            .cors_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();

        let allow_origin = if origins.is_empty() {
            AllowOrigin::from(Any)
        } else {
            AllowOrigin::list(origins)
        };

        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods(Any)
            .allow_headers(Any)
    }

    /// Creates the router with all routes configured.
    pub fn router(&self) -> Router {
        create_router(self.state.clone())
            .layer(self.cors())
            .layer(TraceLayer::new_for_http())
    }

    /// Runs the server on the given address.
    pub async fn run(self, addr: impl Into<SocketAddr>) -> std::io::Result<()> {
        let addr = addr.into();
        let listener = tokio::net::TcpListener::bind(addr).await?;

        if let Some(limiter) = &self.state.rate_limiter {
            limiter.spawn_sweeper();
        }

        info!(
            adapter = self.state.service.adapter_name(),
            "TableGate API server listening on {}", addr
        );

        axum::serve(
            listener,
            self.router()
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_cors_allows_configured_origin() {
        let server = ApiServer::new(ApiConfig {
            cors_origins: vec!["https://app.example.com".into()],
            ..ApiConfig::default()
        })
        .unwrap();

        let response = server
            .router()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(header::ORIGIN, "https://app.example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://app.example.com"
        );
    }

    #[tokio::test]
    async fn test_cors_defaults_to_any_origin() {
        let server = ApiServer::new(ApiConfig::default()).unwrap();
        let response = server
            .router()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(header::ORIGIN, "https://elsewhere.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
}
