//! Outbound notification payload (chat embed).

use crate::domain::submission::Submission;
use crate::domain::timestamp::{format_timestamp, TimestampStyle};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Embed title for every relayed submission
pub const EMBED_TITLE: &str = "New Form Submission!";

/// Embed side-bar color (white)
pub const EMBED_COLOR: u32 = 16_777_215;

/// Body posted to the webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// Plain message content; carries the mention tag when configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub fields: Vec<EmbedField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
}

impl EmbedField {
    fn new(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
        }
    }
}

/// Builds payloads for a single relay deployment.
#[derive(Debug, Clone, Default)]
pub struct PayloadBuilder {
    mention: Option<String>,
    style: TimestampStyle,
}

impl PayloadBuilder {
    pub fn new(mention: Option<String>, style: TimestampStyle) -> Self {
        // An empty mention would post a blank content line
        let mention = mention.filter(|m| !m.trim().is_empty());
        Self { mention, style }
    }

    /// Build the payload for a submission received at `submitted_at`.
    pub fn build(
        &self,
        submission: &Submission,
        submitted_at: DateTime<Utc>,
    ) -> NotificationPayload {
        let stamp = format_timestamp(submitted_at, self.style);

        NotificationPayload {
            content: self.mention.clone(),
            embeds: vec![Embed {
                title: EMBED_TITLE.to_string(),
                description: format!("Submitted: **{}**", stamp),
                color: EMBED_COLOR,
                fields: vec![
                    EmbedField::new("Name", submission.name.as_str()),
                    EmbedField::new("Email", submission.email.as_str()),
                    EmbedField::new("Message", format!("`{}`", submission.message)),
                ],
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn submission() -> Submission {
        Submission::new("Ada", "ada@example.com", "Hello there").unwrap()
    }

    fn at() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_payload_shape() {
        let payload = PayloadBuilder::default().build(&submission(), at());
        let json = serde_json::to_value(&payload).unwrap();

        assert!(json.get("content").is_none());
        let embed = &json["embeds"][0];
        assert_eq!(embed["title"], "New Form Submission!");
        assert_eq!(embed["description"], "Submitted: **<t:1700000000:f>**");
        assert_eq!(embed["color"], 16777215);
        assert_eq!(embed["fields"][0]["name"], "Name");
        assert_eq!(embed["fields"][0]["value"], "Ada");
        assert_eq!(embed["fields"][1]["name"], "Email");
        assert_eq!(embed["fields"][1]["value"], "ada@example.com");
        assert_eq!(embed["fields"][2]["name"], "Message");
        assert_eq!(embed["fields"][2]["value"], "`Hello there`");
    }

    #[test]
    fn test_mention_goes_into_content() {
        let builder = PayloadBuilder::new(Some("@everyone".into()), TimestampStyle::default());
        let json = serde_json::to_value(builder.build(&submission(), at())).unwrap();
        assert_eq!(json["content"], "@everyone");
    }

    #[test]
    fn test_blank_mention_is_dropped() {
        let builder = PayloadBuilder::new(Some("  ".into()), TimestampStyle::default());
        assert!(builder.build(&submission(), at()).content.is_none());
    }

    #[test]
    fn test_configured_style_is_used() {
        let builder = PayloadBuilder::new(None, TimestampStyle::Relative);
        let payload = builder.build(&submission(), at());
        assert_eq!(payload.embeds[0].description, "Submitted: **<t:1700000000:R>**");
    }
}
