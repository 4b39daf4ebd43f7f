//! Per-client rate limiting.

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::{Arc, Weak};
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::clock::{Clock, DefaultClock};
use governor::state::keyed::DefaultKeyedStateStore;
use governor::Quota;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::state::AppState;

/// Rate limit configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests allowed per window. Zero disables limiting.
    pub max_requests: u32,
    /// Window length in seconds
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_secs: 60,
        }
    }
}

impl RateLimitConfig {
    /// Returns true if requests are limited at all.
    pub fn is_enabled(&self) -> bool {
        self.max_requests > 0 && self.window_secs > 0
    }

    /// Window length as a `Duration`.
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

type KeyedLimiter =
    governor::RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Per-client GCRA limiter: a burst of `max_requests`, refilled evenly over the window.
pub struct RateLimiter {
    config: RateLimitConfig,
    limiter: KeyedLimiter,
}

impl RateLimiter {
    /// Creates a limiter.
    pub fn new(config: RateLimitConfig) -> Self {
        let burst = NonZeroU32::new(config.max_requests).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::with_period(config.window() / burst.get())
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst);

        Self {
            config,
            limiter: governor::RateLimiter::keyed(quota),
        }
    }

    /// Records a request from `key`.
    ///
    /// Returns `Err(retry_after)` when the client has used up its budget.
    pub fn check(&self, key: &str) -> Result<(), Duration> {
        self.limiter
            .check_key(&key.to_string())
            .map_err(|not_until| not_until.wait_time_from(DefaultClock::default().now()))
    }

    /// Drops clients whose budget has fully refilled. Returns the number removed.
    pub fn sweep(&self) -> usize {
        let before = self.limiter.len();
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        before.saturating_sub(self.limiter.len())
    }

    /// Number of tracked clients.
    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }

    /// Spawns a task that sweeps idle clients once per window length.
    ///
    /// The task holds only a weak reference and exits once the limiter is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        let period = self.config.window();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(limiter) = weak.upgrade() else {
                    debug!("Rate limiter dropped, stopping sweeper");
                    break;
                };
                let removed = limiter.sweep();
                if removed > 0 {
                    debug!(removed, "Swept idle rate limit clients");
                }
            }
        })
    }
}

/// Resolves the client key: first `X-Forwarded-For` hop, else peer address.
fn client_key(request: &Request) -> String {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware rejecting clients over their request budget with 429.
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(limiter) = &state.rate_limiter {
        let key = client_key(&request);
        if let Err(retry_after) = limiter.check(&key) {
            warn!(client = %key, "Rate limit exceeded");
            let secs = retry_after.as_secs_f64().ceil().max(1.0) as u64;
            return ApiError::too_many_requests(secs).into_response();
        }
    }
    next.run(request).await
}
