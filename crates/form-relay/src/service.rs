//! Relay service - HTTP surface and serve loop.
//!
//! Routes:
//! - `POST /api/sendForm` - validate, rate-limit and relay a submission
//! - `GET /` - liveness
//! - `GET /metrics` - relay counters

use crate::adapters::WebhookChannel;
use crate::domain::config::{ConfigError, RelayConfig};
use crate::domain::error::{DeliveredBody, RelayError, RelayResult, ServerError};
use crate::domain::payload::PayloadBuilder;
use crate::domain::submission::SubmissionForm;
use crate::middleware::{
    cleanup_task, create_cors_layer, FixedWindowLimiter, RateLimitLayer, RelayMetrics,
    TracingLayer,
};
use crate::ports::{Clock, DeliveryChannel, SystemClock};
use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{debug, error, info, warn};

/// Liveness response body
pub const LIVENESS_MESSAGE: &str = "Discord Webhook Server is running!";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Outbound channel; `None` when no webhook is configured
    pub channel: Option<Arc<dyn DeliveryChannel>>,
    pub payloads: Arc<PayloadBuilder>,
    pub clock: Arc<dyn Clock>,
    pub metrics: Arc<RelayMetrics>,
    /// Status used when delivery fails
    pub failure_status: StatusCode,
}

/// Relay service
pub struct RelayService {
    config: RelayConfig,
    state: AppState,
    limiter: Arc<FixedWindowLimiter>,
}

impl RelayService {
    /// Create a relay delivering to the configured webhook.
    pub fn new(config: RelayConfig) -> Result<Self, ServerError> {
        let channel = WebhookChannel::from_config(&config.webhook)?
            .map(|c| Arc::new(c) as Arc<dyn DeliveryChannel>);

        Self::with_parts(config, channel, Arc::new(SystemClock))
    }

    /// Create a relay with an explicit channel and clock.
    pub fn with_parts(
        config: RelayConfig,
        channel: Option<Arc<dyn DeliveryChannel>>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ServerError> {
        config.validate()?;

        let failure_status = StatusCode::from_u16(config.webhook.failure_status).map_err(|_| {
            ConfigError::Invalid(format!(
                "failure_status {} is not an HTTP status",
                config.webhook.failure_status
            ))
        })?;

        let payloads = Arc::new(PayloadBuilder::new(
            config.webhook.mention.clone(),
            config.webhook.timestamp_style,
        ));

        let limiter = Arc::new(FixedWindowLimiter::new(
            config.rate_limit.clone(),
            Arc::clone(&clock),
        ));

        let state = AppState {
            channel,
            payloads,
            clock,
            metrics: Arc::new(RelayMetrics::new()),
            failure_status,
        };

        Ok(Self {
            config,
            state,
            limiter,
        })
    }

    /// Get metrics
    pub fn metrics(&self) -> Arc<RelayMetrics> {
        Arc::clone(&self.state.metrics)
    }

    /// Get rate limiter (for the cleanup task and inspection)
    pub fn limiter(&self) -> Arc<FixedWindowLimiter> {
        Arc::clone(&self.limiter)
    }

    /// Build the HTTP router
    pub fn router(&self) -> Router {
        let rate_limit = RateLimitLayer::new(
            Arc::clone(&self.limiter) as _,
            self.config.rate_limit.trust_proxy,
            Arc::clone(&self.state.metrics),
        );

        Router::new()
            .route("/", get(liveness))
            .route("/metrics", get(metrics))
            .route("/api/sendForm", post(send_form).layer(rate_limit))
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(self.config.limits.max_body_bytes))
            .layer(create_cors_layer(&self.config.cors))
            .layer(TracingLayer::new())
            .with_state(self.state.clone())
    }

    /// Bind the configured address and serve until `shutdown` resolves.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.http_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(format!("{}: {}", addr, e)))?;

        self.serve_on(listener, shutdown).await
    }

    /// Serve on an already-bound listener until `shutdown` resolves.
    pub async fn serve_on<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local_addr = listener.local_addr()?;
        let router = self.router();

        let cleanup = tokio::spawn(cleanup_task(
            self.limiter(),
            self.config.rate_limit.cleanup_interval,
        ));

        if self.state.channel.is_none() {
            warn!("WEBHOOK_URL is not set; submissions will be rejected");
        }
        info!(
            addr = %local_addr,
            webhook_configured = self.state.channel.is_some(),
            rate_limit_max = self.config.rate_limit.max_submissions,
            rate_limit_window_secs = self.config.rate_limit.window.as_secs(),
            "Form relay listening"
        );

        let result = axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await;

        cleanup.abort();
        info!("Form relay stopped");

        result.map_err(ServerError::from)
    }
}

/// `POST /api/sendForm`
async fn send_form(
    State(state): State<AppState>,
    body: Result<Json<SubmissionForm>, JsonRejection>,
) -> Response {
    let form = match body {
        Ok(Json(form)) => form,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return rejection.into_response();
        }
        Err(rejection) => {
            // Unreadable bodies carry no fields and fail validation below
            debug!(reason = %rejection.body_text(), "Unreadable submission body");
            SubmissionForm::default()
        }
    };

    match relay_submission(&state, form).await {
        Ok(delivered) => Json(delivered).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Validate, build and deliver one submission.
async fn relay_submission(state: &AppState, form: SubmissionForm) -> RelayResult<DeliveredBody> {
    let submission = form.validate().map_err(|e| {
        state.metrics.record_invalid();
        e
    })?;

    let channel = state.channel.as_ref().ok_or_else(|| {
        state.metrics.record_unconfigured();
        error!("Submission rejected: webhook URL not configured");
        RelayError::WebhookNotConfigured
    })?;

    let payload = state.payloads.build(&submission, state.clock.now());

    match channel.deliver(&payload).await {
        Ok(()) => {
            state.metrics.record_delivery(true);
            info!("Submission relayed to webhook");
            Ok(DeliveredBody::default())
        }
        Err(e) => {
            state.metrics.record_delivery(false);
            error!(error = %e, "Error sending to webhook");
            Err(RelayError::Delivery {
                source: e,
                status: state.failure_status,
            })
        }
    }
}

/// `GET /`
async fn liveness() -> &'static str {
    LIVENESS_MESSAGE
}

/// `GET /metrics`
async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.to_json())
}
