//! Outbound message delivery.

pub mod instagram;

use async_trait::async_trait;

use crate::pipeline::types::OutboundResponse;

pub use instagram::{InstagramSender, MessagePayload};

/// Delivers one response to one recipient per call.
///
/// Failures are logged by the implementation and reported as `None`; callers
/// never see an error.
#[async_trait]
pub trait OutboundSender: Send + Sync {
    /// Channel name (e.g. "instagram").
    fn name(&self) -> &str;

    /// Send a response. Returns the platform's reply body on success.
    async fn send(
        &self,
        recipient_id: &str,
        response: &OutboundResponse,
    ) -> Option<serde_json::Value>;
}
