//! Instagram channel — sends replies through the Graph API send endpoint.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{info, warn};

use crate::channels::OutboundSender;
use crate::config::ResponderConfig;
use crate::error::ChannelError;
use crate::pipeline::types::{OutboundResponse, ResponseType};

const CHANNEL_NAME: &str = "instagram";

/// The `message` object of a send request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MessagePayload {
    /// `{"text": ...}`
    Text { text: String },
    /// A JSON message body supplied by the rule table, sent as-is.
    Structured(serde_json::Value),
}

impl MessagePayload {
    /// Build the message body for a response.
    ///
    /// Button content that is not valid JSON is sent as plain text, and so is
    /// any unrecognised response type.
    pub fn build(response: &OutboundResponse) -> Self {
        match response.response_type {
            ResponseType::Buttons => {
                match serde_json::from_str::<serde_json::Value>(&response.content) {
                    Ok(body) => Self::Structured(body),
                    Err(e) => {
                        warn!(error = %e, "Button content is not valid JSON; sending as text");
                        Self::text(&response.content)
                    }
                }
            }
            ResponseType::Text | ResponseType::Other(_) => Self::text(&response.content),
        }
    }

    fn text(content: &str) -> Self {
        Self::Text {
            text: content.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Recipient<'a> {
    id: &'a str,
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    recipient: Recipient<'a>,
    message: MessagePayload,
}

/// Graph API sender. One HTTP POST per response, no retries.
pub struct InstagramSender {
    api_url: String,
    access_token: SecretString,
    client: reqwest::Client,
}

impl InstagramSender {
    pub fn new(config: &ResponderConfig) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder()
            .timeout(config.send_timeout)
            .build()
            .map_err(|e| ChannelError::Client(e.to_string()))?;

        Ok(Self {
            api_url: config.graph_api_url.clone(),
            access_token: config.access_token.clone(),
            client,
        })
    }

    /// Send and surface the failure, for callers that want it.
    pub async fn try_send(
        &self,
        recipient_id: &str,
        response: &OutboundResponse,
    ) -> Result<serde_json::Value, ChannelError> {
        let body = SendRequest {
            recipient: Recipient { id: recipient_id },
            message: MessagePayload::build(response),
        };

        let resp = self
            .client
            .post(&self.api_url)
            .query(&[("access_token", self.access_token.expose_secret())])
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: CHANNEL_NAME.into(),
                // without_url keeps the access token out of the message
                reason: e.without_url().to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ChannelError::HttpStatus {
                name: CHANNEL_NAME.into(),
                status: status.as_u16(),
                body,
            });
        }

        let text = resp.text().await.map_err(|e| ChannelError::SendFailed {
            name: CHANNEL_NAME.into(),
            reason: e.without_url().to_string(),
        })?;
        Ok(serde_json::from_str(&text).unwrap_or_else(|_| serde_json::json!({})))
    }
}

#[async_trait]
impl OutboundSender for InstagramSender {
    fn name(&self) -> &str {
        CHANNEL_NAME
    }

    async fn send(
        &self,
        recipient_id: &str,
        response: &OutboundResponse,
    ) -> Option<serde_json::Value> {
        match self.try_send(recipient_id, response).await {
            Ok(reply) => {
                info!(
                    recipient = recipient_id,
                    response_type = %response.response_type,
                    reply = %reply,
                    "Message sent"
                );
                Some(reply)
            }
            Err(e) => {
                warn!(
                    recipient = recipient_id,
                    response_type = %response.response_type,
                    error = %e,
                    "Error sending message"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_payload() {
        let payload = MessagePayload::build(&OutboundResponse::text("Hello"));
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::json!({"text": "Hello"})
        );
    }

    #[test]
    fn button_payload_is_used_verbatim() {
        let content = r#"{"attachment":{"type":"template","payload":{"buttons":[]}}}"#;
        let payload = MessagePayload::build(&OutboundResponse::buttons(content));
        assert!(matches!(payload, MessagePayload::Structured(_)));
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::from_str::<serde_json::Value>(content).unwrap()
        );
    }

    #[test]
    fn bad_button_json_falls_back_to_text() {
        let payload = MessagePayload::build(&OutboundResponse::buttons("{bad json"));
        assert_eq!(
            payload,
            MessagePayload::Text {
                text: "{bad json".into()
            }
        );
    }

    #[test]
    fn unknown_type_is_sent_as_text() {
        let response = OutboundResponse {
            response_type: ResponseType::Other("carousel".into()),
            content: r#"{"a":1}"#.into(),
        };
        assert_eq!(
            MessagePayload::build(&response),
            MessagePayload::Text {
                text: r#"{"a":1}"#.into()
            }
        );
    }

    #[test]
    fn send_request_shape() {
        let body = SendRequest {
            recipient: Recipient { id: "42" },
            message: MessagePayload::build(&OutboundResponse::text("hi")),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"recipient": {"id": "42"}, "message": {"text": "hi"}})
        );
    }

    #[tokio::test]
    async fn unreachable_endpoint_returns_none() {
        let mut config = ResponderConfig::with_tokens("token", "verify");
        // Port 9 (discard) on localhost is closed in test environments.
        config.graph_api_url = "http://127.0.0.1:9/me/messages".into();
        config.send_timeout = std::time::Duration::from_secs(2);
        let sender = InstagramSender::new(&config).unwrap();
        assert_eq!(sender.name(), "instagram");
        assert!(sender.send("42", &OutboundResponse::text("hi")).await.is_none());
    }
}
