//! App state: configuration, the data service, and the rate limiter.

use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use tablegate_adapters::{DataAdapter, MemoryAdapter};
#[cfg(feature = "rest")]
use tablegate_adapters::{RestAdapter, RestConfig};
use tablegate_cache::CacheConfig;
use tablegate_core::AdapterError;
use tablegate_service::{DataService, ServiceConfig};

use crate::rate_limit::{RateLimitConfig, RateLimiter};

/// Errors raised while loading configuration or building state.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is missing.
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    /// A variable holds an unusable value.
    #[error("invalid value for {name}: '{value}'")]
    Invalid {
        /// Variable name
        name: &'static str,
        /// Offending value
        value: String,
    },

    /// The adapter could not be constructed.
    #[error("failed to build adapter: {0}")]
    Adapter(#[from] AdapterError),
}

/// Which backend to serve.
#[derive(Clone, Debug)]
pub enum AdapterKind {
    /// In-process memory storage
    Memory,
    /// PostgREST-compatible remote service
    #[cfg(feature = "rest")]
    Rest(RestConfig),
}

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Backend selection
    pub adapter: AdapterKind,
    /// Record cache settings
    pub cache: CacheConfig,
    /// Tables the API exposes. `None` exposes any valid name.
    pub allowed_tables: Option<Vec<String>>,
    /// Allowed CORS origins. Empty allows any origin.
    pub cors_origins: Vec<String>,
    /// Per-client request budget
    pub rate_limit: RateLimitConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            adapter: AdapterKind::Memory,
            cache: CacheConfig::default(),
            allowed_tables: None,
            cors_origins: Vec::new(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_var<T: FromStr>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) if value.trim().is_empty() => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

impl ApiConfig {
    /// Loads `.env` if present, then reads `TABLEGATE_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let adapter = match lookup("TABLEGATE_ADAPTER").as_deref().map(str::trim) {
            None | Some("") | Some("memory") => AdapterKind::Memory,
            #[cfg(feature = "rest")]
            Some("rest") => {
                let base_url = lookup("TABLEGATE_REST_URL")
                    .filter(|v| !v.trim().is_empty())
                    .ok_or(ConfigError::Missing("TABLEGATE_REST_URL"))?;
                let mut rest = RestConfig::new(base_url);
                rest.api_key = lookup("TABLEGATE_REST_API_KEY").filter(|v| !v.is_empty());
                rest.schema = lookup("TABLEGATE_REST_SCHEMA").filter(|v| !v.is_empty());
                rest.timeout_seconds = parse_var(
                    "TABLEGATE_REST_TIMEOUT_SECS",
                    lookup("TABLEGATE_REST_TIMEOUT_SECS"),
                    rest.timeout_seconds,
                )?;
                AdapterKind::Rest(rest)
            }
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "TABLEGATE_ADAPTER",
                    value: other.to_string(),
                })
            }
        };

        let cache = CacheConfig {
            ttl_ms: parse_var(
                "TABLEGATE_CACHE_TTL_MS",
                lookup("TABLEGATE_CACHE_TTL_MS"),
                defaults.cache.ttl_ms,
            )?,
            max_entries: parse_var(
                "TABLEGATE_CACHE_MAX_ENTRIES",
                lookup("TABLEGATE_CACHE_MAX_ENTRIES"),
                defaults.cache.max_entries,
            )?,
        };

        let allowed_tables = lookup("TABLEGATE_ALLOWED_TABLES")
            .map(|raw| split_list(&raw))
            .filter(|tables| !tables.is_empty());

        let cors_origins = lookup("TABLEGATE_CORS_ORIGINS")
            .map(|raw| split_list(&raw))
            .unwrap_or_default()
            .into_iter()
            .filter(|origin| origin != "*")
            .collect();

        let rate_limit = RateLimitConfig {
            max_requests: parse_var(
                "TABLEGATE_RATE_LIMIT_REQUESTS",
                lookup("TABLEGATE_RATE_LIMIT_REQUESTS"),
                defaults.rate_limit.max_requests,
            )?,
            window_secs: parse_var(
                "TABLEGATE_RATE_LIMIT_WINDOW_SECS",
                lookup("TABLEGATE_RATE_LIMIT_WINDOW_SECS"),
                defaults.rate_limit.window_secs,
            )?,
        };

        Ok(Self {
            adapter,
            cache,
            allowed_tables,
            cors_origins,
            rate_limit,
        })
    }

    /// Builds the configured adapter.
    pub fn build_adapter(&self) -> Result<Arc<dyn DataAdapter>, ConfigError> {
        let adapter: Arc<dyn DataAdapter> = match &self.adapter {
            AdapterKind::Memory => Arc::new(MemoryAdapter::new()),
            #[cfg(feature = "rest")]
            AdapterKind::Rest(rest) => Arc::new(RestAdapter::new(rest.clone())?),
        };
        Ok(adapter)
    }
}

/// Shared state handed to every handler.
pub struct AppState {
    /// Active configuration
    pub config: ApiConfig,
    /// Data service over the configured adapter
    pub service: DataService,
    /// Request limiter, absent when limiting is disabled
    pub rate_limiter: Option<Arc<RateLimiter>>,
}

impl AppState {
    /// Builds state from configuration.
    pub fn new(config: ApiConfig) -> Result<Self, ConfigError> {
        let adapter = config.build_adapter()?;
        info!(
            adapter = adapter.name(),
            cache_ttl_ms = config.cache.ttl_ms,
            "Data service ready"
        );
        Ok(Self::with_adapter(config, adapter))
    }

    /// Builds state around an existing adapter.
    pub fn with_adapter(config: ApiConfig, adapter: Arc<dyn DataAdapter>) -> Self {
        let service = DataService::new(
            adapter,
            ServiceConfig {
                cache: config.cache.clone(),
                allowed_tables: config.allowed_tables.clone(),
            },
        );
        let rate_limiter = config
            .rate_limit
            .is_enabled()
            .then(|| Arc::new(RateLimiter::new(config.rate_limit.clone())));

        Self {
            config,
            service,
            rate_limiter,
        }
    }
}
