//! In-process relay counters.
//!
//! Exposed as JSON on `/metrics`. Counters reset on restart.

use std::sync::atomic::{AtomicU64, Ordering};

/// Relay metrics
#[derive(Debug, Default)]
pub struct RelayMetrics {
    // Submission outcomes
    pub submissions_total: AtomicU64,
    pub submissions_accepted: AtomicU64,
    pub submissions_invalid: AtomicU64,
    pub submissions_rate_limited: AtomicU64,
    pub submissions_unconfigured: AtomicU64,

    // Delivery outcomes
    pub deliveries_succeeded: AtomicU64,
    pub deliveries_failed: AtomicU64,
}

impl RelayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a submission that failed validation
    pub fn record_invalid(&self) {
        self.submissions_total.fetch_add(1, Ordering::Relaxed);
        self.submissions_invalid.fetch_add(1, Ordering::Relaxed);
    }

    /// Record rate limit rejection
    pub fn record_rate_limited(&self) {
        self.submissions_total.fetch_add(1, Ordering::Relaxed);
        self.submissions_rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a valid submission with no destination configured
    pub fn record_unconfigured(&self) {
        self.submissions_total.fetch_add(1, Ordering::Relaxed);
        self.submissions_unconfigured.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of a delivery attempt
    pub fn record_delivery(&self, success: bool) {
        self.submissions_total.fetch_add(1, Ordering::Relaxed);
        self.submissions_accepted.fetch_add(1, Ordering::Relaxed);

        if success {
            self.deliveries_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.deliveries_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Export metrics as JSON
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "submissions": {
                "total": self.submissions_total.load(Ordering::Relaxed),
                "accepted": self.submissions_accepted.load(Ordering::Relaxed),
                "invalid": self.submissions_invalid.load(Ordering::Relaxed),
                "rate_limited": self.submissions_rate_limited.load(Ordering::Relaxed),
                "unconfigured": self.submissions_unconfigured.load(Ordering::Relaxed),
            },
            "deliveries": {
                "succeeded": self.deliveries_succeeded.load(Ordering::Relaxed),
                "failed": self.deliveries_failed.load(Ordering::Relaxed),
            }
        })
    }
}
