//! Shared types for the auto-reply pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

// ── Rule ────────────────────────────────────────────────────────────

/// How a response's content is delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseType {
    /// Plain text message.
    Text,
    /// Structured message; content is a JSON message body.
    Buttons,
    /// Any other name found in the rule table. Sent as plain text.
    Other(String),
}

impl ResponseType {
    /// Parse a rule-table cell. Empty means `Text`.
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase();
        match normalized.as_str() {
            "" | "text" => Self::Text,
            "buttons" => Self::Buttons,
            _ => Self::Other(normalized),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::Buttons => "buttons",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ResponseType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ResponseType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// A keyword condition paired with the response it produces.
///
/// Keywords are lower-cased at construction; a rule never changes after
/// the table is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub contains_all: Vec<String>,
    pub contains_any: Vec<String>,
    pub does_not_contain: Vec<String>,
    pub response: OutboundResponse,
}

impl Rule {
    pub fn new(
        contains_all: &[&str],
        contains_any: &[&str],
        does_not_contain: &[&str],
        response: OutboundResponse,
    ) -> Self {
        Self {
            contains_all: normalize_keywords(contains_all.iter().copied()),
            contains_any: normalize_keywords(contains_any.iter().copied()),
            does_not_contain: normalize_keywords(does_not_contain.iter().copied()),
            response,
        }
    }

    /// Whether this rule fires for an already lower-cased message.
    pub fn fires(&self, lowered: &str) -> bool {
        let all = self.contains_all.iter().all(|kw| lowered.contains(kw.as_str()));
        let any = self.contains_any.is_empty()
            || self.contains_any.iter().any(|kw| lowered.contains(kw.as_str()));
        let none = !self
            .does_not_contain
            .iter()
            .any(|kw| lowered.contains(kw.as_str()));
        all && any && none
    }
}

/// Trim, lower-case and drop empty keywords.
pub fn normalize_keywords<'a, I>(keywords: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    keywords
        .into_iter()
        .map(|kw| kw.trim().to_lowercase())
        .filter(|kw| !kw.is_empty())
        .collect()
}

// ── Outbound response ───────────────────────────────────────────────

/// What to send back to a sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub content: String,
}

impl OutboundResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            response_type: ResponseType::Text,
            content: content.into(),
        }
    }

    pub fn buttons(content: impl Into<String>) -> Self {
        Self {
            response_type: ResponseType::Buttons,
            content: content.into(),
        }
    }
}

// ── Inbound event ───────────────────────────────────────────────────

/// A messaging event that carries both a sender and non-empty text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub sender_id: String,
    pub text: String,
}

impl InboundEvent {
    /// Returns `None` when either field is missing or empty.
    pub fn new(sender_id: Option<String>, text: Option<String>) -> Option<Self> {
        let sender_id = sender_id.filter(|s| !s.is_empty())?;
        let text = text.filter(|t| !t.is_empty())?;
        Some(Self { sender_id, text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_type_parsing() {
        assert_eq!(ResponseType::parse(" Text "), ResponseType::Text);
        assert_eq!(ResponseType::parse(""), ResponseType::Text);
        assert_eq!(ResponseType::parse("BUTTONS"), ResponseType::Buttons);
        assert_eq!(
            ResponseType::parse("Carousel"),
            ResponseType::Other("carousel".into())
        );
    }

    #[test]
    fn outbound_response_serializes_type_name() {
        let json = serde_json::to_value(OutboundResponse::buttons("{}")).unwrap();
        assert_eq!(json, serde_json::json!({"type": "buttons", "content": "{}"}));
    }

    #[test]
    fn rule_keywords_are_lowercased() {
        let rule = Rule::new(&["Hello", "  "], &[" PRICE "], &[], OutboundResponse::text("x"));
        assert_eq!(rule.contains_all, vec!["hello"]);
        assert_eq!(rule.contains_any, vec!["price"]);
        assert!(rule.does_not_contain.is_empty());
    }

    #[test]
    fn inbound_event_requires_both_fields() {
        assert!(InboundEvent::new(Some("1".into()), Some("hi".into())).is_some());
        assert!(InboundEvent::new(None, Some("hi".into())).is_none());
        assert!(InboundEvent::new(Some("1".into()), None).is_none());
        assert!(InboundEvent::new(Some("".into()), Some("hi".into())).is_none());
        assert!(InboundEvent::new(Some("1".into()), Some("".into())).is_none());
    }
}
