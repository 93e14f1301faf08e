//! Relay error types and their HTTP mapping.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Machine-readable codes carried in error bodies
pub mod codes {
    pub const RATE_LIMITED: &str = "RATE_LIMITED";
}

/// Client-facing messages
pub mod messages {
    pub const MISSING_FIELDS: &str = "Please fill in the necessary fields.";
    pub const WEBHOOK_NOT_CONFIGURED: &str = "Webhook URL not configured";
    pub const RATE_LIMITED: &str = "Too many submissions, please try again later.";
    pub const DELIVERY_FAILED: &str = "An Error Occurred!";
    pub const DELIVERED: &str = "Done!";
}

/// Errors surfaced by the submission endpoint
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// A required field was absent or empty
    #[error("missing required fields")]
    MissingFields,

    /// No outbound destination configured
    #[error("webhook URL not configured")]
    WebhookNotConfigured,

    /// Client exhausted its submissions for the current window
    #[error("rate limit exceeded, retry after {}s", retry_after_secs(.retry_after))]
    RateLimited { retry_after: Duration },

    /// The outbound call failed
    #[error("delivery failed: {source}")]
    Delivery {
        #[source]
        source: DeliveryError,
        /// Transport status for the response
        status: StatusCode,
    },
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingFields => StatusCode::BAD_REQUEST,
            Self::WebhookNotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Delivery { status, .. } => *status,
        }
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            Self::MissingFields => ErrorBody::message(messages::MISSING_FIELDS),
            Self::WebhookNotConfigured => ErrorBody::message(messages::WEBHOOK_NOT_CONFIGURED),
            Self::RateLimited { .. } => ErrorBody {
                error: messages::RATE_LIMITED.to_string(),
                code: Some(codes::RATE_LIMITED.to_string()),
                error_msg: None,
            },
            Self::Delivery { source, .. } => ErrorBody {
                error: messages::DELIVERY_FAILED.to_string(),
                code: None,
                error_msg: Some(source.to_string()),
            },
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), Json(self.body())).into_response();

        if let Self::RateLimited { retry_after } = &self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs(retry_after).to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}

/// Whole seconds, rounded up
fn retry_after_secs(wait: &Duration) -> u64 {
    let secs = wait.as_secs();
    if wait.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

/// JSON error body. Field presence depends on the error kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(
        default,
        rename = "errorMsg",
        skip_serializing_if = "Option::is_none"
    )]
    pub error_msg: Option<String>,
}

impl ErrorBody {
    fn message(error: &str) -> Self {
        Self {
            error: error.to_string(),
            code: None,
            error_msg: None,
        }
    }
}

/// Success body: `{"message": "Done!", "code": 200}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveredBody {
    pub message: String,
    pub code: u16,
}

impl Default for DeliveredBody {
    fn default() -> Self {
        Self {
            message: messages::DELIVERED.to_string(),
            code: StatusCode::OK.as_u16(),
        }
    }
}

/// Failure of the outbound delivery call
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// Transport-level failure (connect, TLS, timeout, body)
    #[error("{0}")]
    Transport(String),

    /// Channel answered with a non-2xx status
    #[error("Request failed with status code {0}")]
    Status(u16),
}

/// Result type for relay operations
pub type RelayResult<T> = Result<T, RelayError>;

/// Server-level errors (startup and serve loop)
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] crate::domain::config::ConfigError),

    /// Server socket bind error
    #[error("server bind error: {0}")]
    Bind(String),

    /// Serve loop failed
    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),

    /// Outbound client could not be built
    #[error("webhook client error: {0}")]
    Client(String),
}
