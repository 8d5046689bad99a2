//! Error types for msgbridge.

/// Top-level error type for the gateway.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Webhook error: {0}")]
    Webhook(#[from] WebhookError),

    #[error("Outbound error: {0}")]
    Outbound(#[from] OutboundError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Failed to open database: {0}")]
    Open(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Errors raised while handling inbound webhook traffic.
///
/// None of these carry provider-visible detail. The HTTP layer maps them
/// to coarse statuses and the specifics stay in the logs.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("No broker matches the requested webhook path")]
    UnknownBroker,

    #[error("Webhook verification failed")]
    VerificationFailed,

    #[error("Broker has no webhook key configured")]
    WebhookKeyMissing,

    #[error("Malformed webhook payload: {0}")]
    MalformedPayload(String),
}

/// Outbound provider API errors.
#[derive(Debug, thiserror::Error)]
pub enum OutboundError {
    #[error("Broker is missing outbound configuration: {0}")]
    NotConfigured(&'static str),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Provider API returned {status}: {detail}")]
    Api { status: u16, detail: String },
}

/// Result type alias for the gateway.
pub type Result<T> = std::result::Result<T, Error>;
