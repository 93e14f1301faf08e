//! Relay configuration with validation.
//!
//! Loaded from environment variables; every value has a default except the
//! webhook URL, whose absence is reported per request.

use crate::domain::timestamp::TimestampStyle;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Main relay configuration
#[derive(Debug, Clone, Default)]
pub struct RelayConfig {
    /// HTTP server configuration
    pub http: HttpConfig,
    /// Outbound webhook configuration
    pub webhook: WebhookConfig,
    /// Per-client rate limiting
    pub rate_limit: RateLimitConfig,
    /// Request limits
    pub limits: LimitsConfig,
    /// CORS configuration
    pub cors: CorsConfig,
}

impl RelayConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Unparseable values are logged and the default is kept.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        // Webhook
        config.webhook.url = get("WEBHOOK_URL");
        config.webhook.mention = get("WEBHOOK_MENTION");
        if let Some(secs) = parse_var::<u64>("WEBHOOK_TIMEOUT_SECS", get("WEBHOOK_TIMEOUT_SECS")) {
            config.webhook.timeout = Some(Duration::from_secs(secs));
        }
        if let Some(status) = parse_var("DELIVERY_FAILURE_STATUS", get("DELIVERY_FAILURE_STATUS")) {
            config.webhook.failure_status = status;
        }
        if let Some(selector) = get("TIMESTAMP_STYLE") {
            config.webhook.timestamp_style = TimestampStyle::from_selector(&selector);
        }

        // HTTP
        if let Some(host) = parse_var("HOST", get("HOST")) {
            config.http.host = host;
        }
        if let Some(port) = parse_var("PORT", get("PORT")) {
            config.http.port = port;
        }

        // Rate limiting
        if let Some(enabled) = get("RATE_LIMIT_ENABLED") {
            config.rate_limit.enabled = parse_flag(&enabled);
        }
        if let Some(max) = parse_var("RATE_LIMIT_MAX", get("RATE_LIMIT_MAX")) {
            config.rate_limit.max_submissions = max;
        }
        let window = get("RATE_LIMIT_WINDOW_SECS");
        if let Some(secs) = parse_var::<u64>("RATE_LIMIT_WINDOW_SECS", window) {
            config.rate_limit.window = Duration::from_secs(secs);
        }
        if let Some(list) = get("RATE_LIMIT_WHITELIST") {
            config.rate_limit.whitelist = list
                .split(',')
                .map(str::trim)
                .filter(|ip| !ip.is_empty())
                .filter_map(|ip| parse_var("RATE_LIMIT_WHITELIST", Some(ip.to_string())))
                .collect();
        }
        if let Some(trust) = get("TRUST_PROXY") {
            config.rate_limit.trust_proxy = parse_flag(&trust);
        }

        // Limits
        if let Some(bytes) = parse_var("MAX_BODY_BYTES", get("MAX_BODY_BYTES")) {
            config.limits.max_body_bytes = bytes;
        }

        config
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit.max_submissions == 0 {
            return Err(ConfigError::InvalidRateLimit(
                "max_submissions cannot be 0".into(),
            ));
        }

        if self.rate_limit.window.is_zero() {
            return Err(ConfigError::InvalidRateLimit("window cannot be 0".into()));
        }

        if self.limits.max_body_bytes == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_body_bytes cannot be 0".into(),
            ));
        }

        if !(100..=599).contains(&self.webhook.failure_status) {
            return Err(ConfigError::Invalid(format!(
                "failure_status {} is not an HTTP status",
                self.webhook.failure_status
            )));
        }

        if let Some(timeout) = self.webhook.timeout {
            if timeout.is_zero() {
                return Err(ConfigError::InvalidTimeout(
                    "webhook timeout cannot be 0".into(),
                ));
            }
        }

        Ok(())
    }

    /// Get HTTP server bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }
}

fn parse_var<T: FromStr>(key: &str, value: Option<String>) -> Option<T> {
    let raw = value?;
    match raw.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!(key = key, value = %raw, "Ignoring unparseable configuration value");
            None
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 3000)
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
        }
    }
}

/// Outbound webhook configuration
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Destination URL. Treated as a secret: never logged.
    pub url: Option<String>,
    /// Mention tag posted as message content (e.g. `@everyone`)
    pub mention: Option<String>,
    /// Outbound timeout; `None` keeps the transport default
    pub timeout: Option<Duration>,
    /// HTTP status returned when delivery fails
    pub failure_status: u16,
    /// Style of the submission timestamp
    pub timestamp_style: TimestampStyle,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            mention: None,
            timeout: None,
            // Existing callers expect 200 with an error body
            failure_status: 200,
            timestamp_style: TimestampStyle::default(),
        }
    }
}

/// Per-client rate limiting configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Enable rate limiting
    pub enabled: bool,
    /// Submissions allowed per client per window
    pub max_submissions: u32,
    /// Fixed window length
    pub window: Duration,
    /// IPs exempt from rate limiting
    pub whitelist: Vec<IpAddr>,
    /// Take the client address from X-Forwarded-For / X-Real-IP
    pub trust_proxy: bool,
    /// Interval between expired-window sweeps
    pub cleanup_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_submissions: 1,
            window: Duration::from_secs(12 * 60 * 60),
            whitelist: Vec::new(),
            trust_proxy: false,
            cleanup_interval: Duration::from_secs(10 * 60),
        }
    }
}

/// Request limits configuration
#[derive(Debug, Clone)]
pub struct LimitsConfig {
    /// Max request body size in bytes (default: 100KB)
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 100 * 1024,
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Allowed origins ("*" for all)
    pub allowed_origins: Vec<String>,
    /// Allowed methods
    pub allowed_methods: Vec<String>,
    /// Allowed headers
    pub allowed_headers: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
            allowed_methods: ["GET", "POST", "PUT", "DELETE", "OPTIONS"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            allowed_headers: vec!["Content-Type".to_string(), "Authorization".to_string()],
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Invalid rate limiting configuration
    #[error("invalid rate limit: {0}")]
    InvalidRateLimit(String),
    /// Invalid size limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
