//! Error conversions from infrastructure types.
//!
//! These conversions involve I/O types and belong in the adapters layer.

use crate::domain::DeliveryError;
use std::error::Error as _;

impl From<reqwest::Error> for DeliveryError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return DeliveryError::Status(status.as_u16());
        }

        // The webhook URL carries its token, so it must not reach the
        // caller or the logs
        let e = e.without_url();
        let mut text = e.to_string();
        let mut cause = e.source();
        while let Some(inner) = cause {
            text.push_str(": ");
            text.push_str(&inner.to_string());
            cause = inner.source();
        }

        DeliveryError::Transport(text)
    }
}
