//! Webhook HTTP surface.

pub mod payload;
pub mod routes;

pub use payload::{VerifyQuery, WebhookPayload};
pub use routes::{WebhookState, webhook_routes};
