//! Rate limiting middleware
//!
//! Fixed-window request limiter keyed by client IP, applied to everything
//! under `/api`. Each client gets a counter that resets wholesale when its
//! window elapses; exceeding the per-window limit yields a structured 429
//! with a `retryAfter` hint. `X-RateLimit-*` headers are emitted on every
//! response, including the first request of a window.
//!
//! Rejection is ordinary control flow: the check never fails and rejected
//! requests are not recorded anywhere beyond the window counter.

use crate::api::middleware::extract_client_ip;
use crate::core::config::RateLimitConfig;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::warn;

/// Outcome of one rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Admitted {
        remaining: u32,
        reset_seconds: u64,
    },
    Rejected {
        retry_after: u64,
        reset_seconds: u64,
    },
}

/// One client's window record
struct WindowRecord {
    count: u32,
    reset_at: Instant,
}

/// Fixed-window rate limiter
///
/// Tracks request counts per client within a fixed time window:
/// - the first request of a window creates a record with count 1 and admits
/// - requests within the window increment the count; past the limit they are
///   rejected until the window resets
/// - once the window has elapsed the next request starts a new window
#[derive(Clone)]
pub struct RateLimiter {
    state: Arc<RwLock<HashMap<String, WindowRecord>>>,
    max_requests: u32,
    window: Duration,
    sweep_interval: Duration,
}

impl RateLimiter {
    /// Create a new rate limiter
    ///
    /// # Arguments
    /// * `max_requests` - Maximum number of requests allowed per window
    /// * `window` - Fixed window duration
    /// * `sweep_interval` - How often expired records are dropped
    pub fn new(max_requests: u32, window: Duration, sweep_interval: Duration) -> Self {
        Self {
            state: Arc::new(RwLock::new(HashMap::new())),
            max_requests,
            window,
            sweep_interval,
        }
    }

    /// Create a rate limiter from configuration
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            config.max_requests,
            Duration::from_secs(config.window_seconds),
            Duration::from_secs(config.sweep_interval_seconds),
        )
    }

    /// The configured per-window limit
    pub fn limit(&self) -> u32 {
        self.max_requests
    }

    /// Check whether a request from the given client is admitted
    pub async fn check(&self, client_ip: &str) -> RateLimitDecision {
        let now = Instant::now();
        let mut state = self.state.write().await;

        match state.entry(client_ip.to_string()) {
            Entry::Vacant(entry) => {
                entry.insert(WindowRecord {
                    count: 1,
                    reset_at: now + self.window,
                });
                RateLimitDecision::Admitted {
                    remaining: self.max_requests.saturating_sub(1),
                    reset_seconds: self.window.as_secs().max(1),
                }
            }
            Entry::Occupied(mut entry) => {
                let record = entry.get_mut();

                if now > record.reset_at {
                    record.count = 1;
                    record.reset_at = now + self.window;
                    return RateLimitDecision::Admitted {
                        remaining: self.max_requests.saturating_sub(1),
                        reset_seconds: self.window.as_secs().max(1),
                    };
                }

                record.count += 1;
                let reset_seconds = seconds_until(record.reset_at, now);

                if record.count > self.max_requests {
                    RateLimitDecision::Rejected {
                        retry_after: reset_seconds,
                        reset_seconds,
                    }
                } else {
                    RateLimitDecision::Admitted {
                        remaining: self.max_requests - record.count,
                        reset_seconds,
                    }
                }
            }
        }
    }

    /// Drop records whose window has already elapsed, bounding memory to the
    /// set of recently active clients
    pub async fn cleanup_expired(&self) {
        let now = Instant::now();
        let mut state = self.state.write().await;
        state.retain(|_, record| record.reset_at > now);
    }

    /// Spawn the periodic cleanup task
    pub fn spawn_sweeper(&self) {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(limiter.sweep_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                limiter.cleanup_expired().await;
            }
        });
    }

    /// Number of clients currently holding a window record
    #[cfg(test)]
    async fn tracked_clients(&self) -> usize {
        self.state.read().await.len()
    }

    fn set_headers(&self, headers: &mut HeaderMap, remaining: u32, reset_seconds: u64) {
        headers.insert(
            "X-RateLimit-Limit",
            HeaderValue::from(self.max_requests),
        );
        headers.insert("X-RateLimit-Remaining", HeaderValue::from(remaining));
        headers.insert("X-RateLimit-Reset", HeaderValue::from(reset_seconds));
    }
}

/// Seconds until `deadline`, rounded up, at least 1
fn seconds_until(deadline: Instant, now: Instant) -> u64 {
    let remaining = deadline.saturating_duration_since(now);
    let mut seconds = remaining.as_secs();
    if remaining.subsec_nanos() > 0 {
        seconds += 1;
    }
    seconds.max(1)
}

/// Rate limiting middleware
///
/// Admitted requests proceed with quota headers attached to the response;
/// rejected requests short-circuit with 429 and a `retryAfter` value in
/// seconds. The limiter is handed in as middleware state.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let client_ip = extract_client_ip(&request);

    match limiter.check(&client_ip).await {
        RateLimitDecision::Admitted {
            remaining,
            reset_seconds,
        } => {
            let mut response = next.run(request).await;
            limiter.set_headers(response.headers_mut(), remaining, reset_seconds);
            response
        }
        RateLimitDecision::Rejected {
            retry_after,
            reset_seconds,
        } => {
            warn!(ip = %client_ip, "Rate limit exceeded");
            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({
                    "message": "Too many requests, please try again later.",
                    "retryAfter": retry_after,
                })),
            )
                .into_response();
            limiter.set_headers(response.headers_mut(), 0, reset_seconds);
            response
        }
    }
}
