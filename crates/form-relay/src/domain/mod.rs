//! Domain types for the relay.
//!
//! Submissions, payloads, timestamps, configuration and error handling.
//! Nothing in here performs I/O.

pub mod config;
pub mod error;
pub mod payload;
pub mod submission;
pub mod timestamp;

// Re-exports for convenience
pub use config::{ConfigError, RelayConfig};
pub use error::{DeliveredBody, DeliveryError, ErrorBody, RelayError, RelayResult, ServerError};
pub use payload::{Embed, EmbedField, NotificationPayload, PayloadBuilder};
pub use submission::{Submission, SubmissionForm};
pub use timestamp::{format_timestamp, format_with_selector, TimestampStyle};
