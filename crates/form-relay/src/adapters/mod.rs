//! Adapters for the relay.
//!
//! Infrastructure implementations of the outbound ports.

pub mod error_conversions;
pub mod webhook;

pub use webhook::WebhookChannel;
