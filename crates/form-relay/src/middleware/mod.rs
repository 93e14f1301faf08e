//! Middleware stack for the relay.
//!
//! Layer order on the submission route:
//! Request → Tracing → CORS → BodyLimit → RateLimit → Handler

pub mod cors;
pub mod metrics;
pub mod rate_limit;
pub mod tracing;

pub use cors::create_cors_layer;
pub use metrics::RelayMetrics;
pub use rate_limit::{
    cleanup_task, extract_client_ip, FixedWindowLimiter, RateLimitExceeded, RateLimitLayer,
    SubmissionLimiter,
};
pub use self::tracing::TracingLayer;
