//! Display timestamps rendered by the chat client.
//!
//! A display timestamp is `<t:SECONDS:STYLE>`: whole-second Unix time plus a
//! style tag. The receiving client renders it in the reader's locale.

use chrono::{DateTime, Utc};
use std::fmt;

/// Rendering style for a display timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TimestampStyle {
    /// `t` - 9:41 PM
    ShortTime,
    /// `T` - 9:41:30 PM
    LongTime,
    /// `d` - 07/20/2021
    ShortDate,
    /// `D` - July 20, 2021
    LongDate,
    /// `f` - July 20, 2021 9:41 PM
    #[default]
    ShortDateTime,
    /// `F` - Tuesday, July 20, 2021 9:41 PM
    LongDateTime,
    /// `R` - 2 hours ago
    Relative,
}

impl TimestampStyle {
    /// All styles in selector order.
    pub const ALL: [TimestampStyle; 7] = [
        TimestampStyle::ShortTime,
        TimestampStyle::LongTime,
        TimestampStyle::ShortDate,
        TimestampStyle::LongDate,
        TimestampStyle::ShortDateTime,
        TimestampStyle::LongDateTime,
        TimestampStyle::Relative,
    ];

    /// Resolve a selector, falling back to the default for anything unknown.
    pub fn from_selector(selector: &str) -> Self {
        match selector {
            "t" => Self::ShortTime,
            "T" => Self::LongTime,
            "d" => Self::ShortDate,
            "D" => Self::LongDate,
            "f" => Self::ShortDateTime,
            "F" => Self::LongDateTime,
            "R" => Self::Relative,
            _ => Self::default(),
        }
    }

    /// Single-character tag understood by the client.
    pub fn tag(self) -> char {
        match self {
            Self::ShortTime => 't',
            Self::LongTime => 'T',
            Self::ShortDate => 'd',
            Self::LongDate => 'D',
            Self::ShortDateTime => 'f',
            Self::LongDateTime => 'F',
            Self::Relative => 'R',
        }
    }
}

impl fmt::Display for TimestampStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Format an instant as a display timestamp.
///
/// Sub-second precision is floored, so instants before the epoch round
/// towards negative infinity.
pub fn format_timestamp(at: DateTime<Utc>, style: TimestampStyle) -> String {
    format!("<t:{}:{}>", at.timestamp(), style.tag())
}

/// Format an instant using a raw selector string.
pub fn format_with_selector(at: DateTime<Utc>, selector: &str) -> String {
    format_timestamp(at, TimestampStyle::from_selector(selector))
}
