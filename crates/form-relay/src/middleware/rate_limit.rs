//! Per-client fixed-window rate limiting.
//!
//! Each client address gets a window that opens on its first request and
//! admits at most `max_submissions` requests until it expires. Expired
//! windows reset lazily on the next request and are swept periodically.

use crate::domain::config::RateLimitConfig;
use crate::domain::error::RelayError;
use crate::middleware::metrics::RelayMetrics;
use crate::ports::Clock;
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::Request,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tower::{Layer, Service};
use tracing::{debug, warn};

/// Rejection carrying the time until the client's window reopens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitExceeded {
    pub retry_after: Duration,
}

/// Counting policy keyed by client address.
///
/// The check and the increment happen as one step per key, so concurrent
/// requests from the same client cannot both slip under the cap.
pub trait SubmissionLimiter: Send + Sync {
    fn check_and_increment(&self, key: IpAddr) -> Result<(), RateLimitExceeded>;
}

/// Window state for one client
#[derive(Debug, Clone, Copy)]
struct Window {
    started: DateTime<Utc>,
    count: u32,
}

impl Window {
    fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        // A clock that stepped backwards counts as no time passing
        now.signed_duration_since(self.started)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

/// In-memory fixed-window limiter
pub struct FixedWindowLimiter {
    /// Per-IP windows
    windows: DashMap<IpAddr, Window>,
    /// Configuration
    config: RateLimitConfig,
    /// Time source
    clock: Arc<dyn Clock>,
}

impl FixedWindowLimiter {
    pub fn new(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: DashMap::new(),
            config,
            clock,
        }
    }

    /// Remove expired windows. Returns how many were dropped.
    pub fn cleanup(&self) -> usize {
        let now = self.clock.now();
        let window = self.config.window;
        let before = self.windows.len();

        self.windows.retain(|ip, state| {
            if state.elapsed(now) >= window {
                debug!(ip = %ip, "Removing expired rate limit window");
                false
            } else {
                true
            }
        });

        before.saturating_sub(self.windows.len())
    }

    /// Get number of tracked clients
    pub fn window_count(&self) -> usize {
        self.windows.len()
    }
}

impl SubmissionLimiter for FixedWindowLimiter {
    fn check_and_increment(&self, key: IpAddr) -> Result<(), RateLimitExceeded> {
        if !self.config.enabled || self.config.whitelist.contains(&key) {
            return Ok(());
        }

        let now = self.clock.now();
        let mut entry = self.windows.entry(key).or_insert_with(|| {
            debug!(ip = %key, "Opening rate limit window");
            Window {
                started: now,
                count: 0,
            }
        });

        let elapsed = entry.elapsed(now);
        if elapsed >= self.config.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        if entry.count < self.config.max_submissions {
            entry.count += 1;
            Ok(())
        } else {
            Err(RateLimitExceeded {
                retry_after: self.config.window.saturating_sub(entry.elapsed(now)),
            })
        }
    }
}

/// Rate limit layer
#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: Arc<dyn SubmissionLimiter>,
    trust_proxy: bool,
    metrics: Arc<RelayMetrics>,
}

impl RateLimitLayer {
    pub fn new(
        limiter: Arc<dyn SubmissionLimiter>,
        trust_proxy: bool,
        metrics: Arc<RelayMetrics>,
    ) -> Self {
        Self {
            limiter,
            trust_proxy,
            metrics,
        }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            limiter: Arc::clone(&self.limiter),
            trust_proxy: self.trust_proxy,
            metrics: Arc::clone(&self.metrics),
        }
    }
}

/// Rate limit service
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    limiter: Arc<dyn SubmissionLimiter>,
    trust_proxy: bool,
    metrics: Arc<RelayMetrics>,
}

impl<S> Service<Request<Body>> for RateLimitService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let limiter = Arc::clone(&self.limiter);
        let metrics = Arc::clone(&self.metrics);
        let trust_proxy = self.trust_proxy;
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let ip = extract_client_ip(&req, trust_proxy);

            match limiter.check_and_increment(ip) {
                Ok(()) => inner.call(req).await,
                Err(exceeded) => {
                    metrics.record_rate_limited();
                    warn!(
                        ip = %ip,
                        retry_after_secs = exceeded.retry_after.as_secs(),
                        "Rate limit exceeded"
                    );

                    Ok(RelayError::RateLimited {
                        retry_after: exceeded.retry_after,
                    }
                    .into_response())
                }
            }
        })
    }
}

/// Extract client IP from request
pub fn extract_client_ip<B>(req: &Request<B>, trust_proxy: bool) -> IpAddr {
    if trust_proxy {
        // Take the first X-Forwarded-For entry (original client)
        if let Some(forwarded) = req.headers().get("x-forwarded-for") {
            if let Ok(forwarded_str) = forwarded.to_str() {
                if let Some(first_ip) = forwarded_str.split(',').next() {
                    if let Ok(ip) = first_ip.trim().parse::<IpAddr>() {
                        return ip;
                    }
                }
            }
        }

        if let Some(real_ip) = req.headers().get("x-real-ip") {
            if let Ok(real_ip_str) = real_ip.to_str() {
                if let Ok(ip) = real_ip_str.trim().parse::<IpAddr>() {
                    return ip;
                }
            }
        }
    }

    // Fall back to connection info
    if let Some(connect_info) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return connect_info.0.ip();
    }

    // Default to localhost if we can't determine IP
    IpAddr::from([127, 0, 0, 1])
}

/// Background task to sweep expired rate limit windows
pub async fn cleanup_task(limiter: Arc<FixedWindowLimiter>, interval: Duration) {
    let mut cleanup_interval = tokio::time::interval(interval);
    cleanup_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        cleanup_interval.tick().await;
        let removed = limiter.cleanup();
        if removed > 0 {
            debug!(removed, remaining = limiter.window_count(), "Swept rate limit windows");
        }
    }
}
