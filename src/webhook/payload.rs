//! Wire types for the webhook routes.

use serde::Deserialize;

use crate::pipeline::types::InboundEvent;

/// Verification handshake query (`GET /webhook`).
#[derive(Debug, Default, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Event delivery body (`POST /webhook`).
///
/// Entries stay as raw JSON so that one oddly shaped entry or event
/// does not reject the whole delivery.
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub object: Option<String>,
    #[serde(default)]
    pub entry: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct MessagingEvent {
    sender: Option<Participant>,
    message: Option<MessageBody>,
}

#[derive(Debug, Deserialize)]
struct Participant {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    text: Option<String>,
}

impl WebhookPayload {
    /// Every messaging event in delivery order, `None` where an event has
    /// no usable sender or text.
    ///
    /// An entry without a `messaging` array contributes no events.
    pub fn events(&self) -> Vec<Option<InboundEvent>> {
        self.entry
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|entry| entry.get("messaging").and_then(|m| m.as_array()))
            .flatten()
            .map(inbound_event)
            .collect()
    }
}

fn inbound_event(raw: &serde_json::Value) -> Option<InboundEvent> {
    let event = MessagingEvent::deserialize(raw).ok()?;
    InboundEvent::new(
        event.sender.and_then(|s| s.id),
        event.message.and_then(|m| m.text),
    )
}
