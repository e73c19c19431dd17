//! Error types for the auto-responder.

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Rule-table loading errors.
#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    #[error("Failed to read rule table {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Malformed rule table {path}: {reason}")]
    Malformed { path: String, reason: String },
}

/// Outbound channel errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to send response on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Channel {name} returned HTTP {status}: {body}")]
    HttpStatus {
        name: String,
        status: u16,
        body: String,
    },

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}
