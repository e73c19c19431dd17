//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Graph API message-send endpoint.
pub const DEFAULT_GRAPH_API_URL: &str = "https://graph.facebook.com/v15.0/me/messages";

/// Reply sent when no rule fires.
pub const DEFAULT_FALLBACK_REPLY: &str = "Sorry, no appropriate response was found.";

/// Webhook `object` value accepted by the event route.
pub const DEFAULT_WEBHOOK_OBJECT: &str = "instagram";

/// Auto-responder configuration.
#[derive(Debug, Clone)]
pub struct ResponderConfig {
    /// Access token appended to every outbound call.
    pub access_token: SecretString,
    /// Shared secret checked during the verification handshake.
    pub verify_token: SecretString,
    /// Location of the rule table.
    pub rules_path: PathBuf,
    /// Listen port.
    pub port: u16,
    /// Message-send endpoint.
    pub graph_api_url: String,
    /// Expected top-level `object` in event deliveries.
    pub webhook_object: String,
    /// Text sent when no rule fires.
    pub fallback_reply: String,
    /// Upper bound on a single outbound HTTP call.
    pub send_timeout: Duration,
}

impl ResponderConfig {
    /// Build config from environment variables.
    ///
    /// `PAGE_ACCESS_TOKEN` and `VERIFY_TOKEN` are required; everything else
    /// has a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let access_token = required_secret("PAGE_ACCESS_TOKEN")?;
        let verify_token = required_secret("VERIFY_TOKEN")?;

        let rules_path = std::env::var("CONDITIONS_CSV")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("conditions.csv"));

        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5000);

        let graph_api_url =
            std::env::var("GRAPH_API_URL").unwrap_or_else(|_| DEFAULT_GRAPH_API_URL.to_string());

        let webhook_object =
            std::env::var("WEBHOOK_OBJECT").unwrap_or_else(|_| DEFAULT_WEBHOOK_OBJECT.to_string());

        let fallback_reply =
            std::env::var("FALLBACK_REPLY").unwrap_or_else(|_| DEFAULT_FALLBACK_REPLY.to_string());

        let send_timeout_secs: u64 = std::env::var("SEND_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(10);

        Ok(Self {
            access_token,
            verify_token,
            rules_path,
            port,
            graph_api_url,
            webhook_object,
            fallback_reply,
            send_timeout: Duration::from_secs(send_timeout_secs),
        })
    }

    /// Config with the given secrets and every other field at its default.
    pub fn with_tokens(access_token: &str, verify_token: &str) -> Self {
        Self {
            access_token: SecretString::from(access_token.to_string()),
            verify_token: SecretString::from(verify_token.to_string()),
            rules_path: PathBuf::from("conditions.csv"),
            port: 5000,
            graph_api_url: DEFAULT_GRAPH_API_URL.to_string(),
            webhook_object: DEFAULT_WEBHOOK_OBJECT.to_string(),
            fallback_reply: DEFAULT_FALLBACK_REPLY.to_string(),
            send_timeout: Duration::from_secs(10),
        }
    }
}

fn required_secret(key: &str) -> Result<SecretString, ConfigError> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(SecretString::from(value)),
        Ok(_) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "must not be empty".to_string(),
        }),
        Err(_) => Err(ConfigError::MissingEnvVar(key.to_string())),
    }
}
