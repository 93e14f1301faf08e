//! Form Relay - accepts contact-form submissions over HTTP and forwards them
//! to a chat webhook as a rich embed.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       FORM RELAY                         │
//! ├──────────────────────────────────────────────────────────┤
//! │   GET /        GET /metrics        POST /api/sendForm    │
//! │                                          │               │
//! │  ┌───────────────────────────────────────┴────────────┐  │
//! │  │  Tracing → CORS → BodyLimit → RateLimit (per IP)   │  │
//! │  └───────────────────────────────────────┬────────────┘  │
//! │                                          │               │
//! │        Validate → Build payload → DeliveryChannel        │
//! └──────────────────────────────────────────┼───────────────┘
//!                                            ▼
//!                                     Chat webhook
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use form_relay::{RelayConfig, RelayService};
//!
//! let service = RelayService::new(RelayConfig::from_env())?;
//! service.serve(async { let _ = tokio::signal::ctrl_c().await; }).await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod domain;
pub mod middleware;
pub mod ports;
pub mod service;
pub mod telemetry;

// Re-exports
pub use adapters::WebhookChannel;
pub use domain::config::RelayConfig;
pub use domain::error::{DeliveryError, RelayError, ServerError};
pub use domain::payload::{NotificationPayload, PayloadBuilder};
pub use domain::submission::{Submission, SubmissionForm};
pub use domain::timestamp::{format_timestamp, TimestampStyle};
pub use ports::{Clock, DeliveryChannel, ManualClock, SystemClock};
pub use service::{AppState, RelayService};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
