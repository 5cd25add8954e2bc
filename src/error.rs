//! Error types for Bantabro.

/// Invalid or unusable settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Storage failures.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Failed to open database: {0}")]
    Open(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    /// A stored value could not be mapped back onto its Rust type.
    #[error("Corrupt row: {0}")]
    Decode(String),
}

/// Outbound alerting channel errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("{name} rejected the message: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(String),
}

/// Moderation workflow errors.
#[derive(Debug, thiserror::Error)]
pub enum ModerationError {
    #[error("Pending challenge {card_id} not found")]
    NotFound { card_id: String },

    #[error("Pending challenge {card_id} is already {status}")]
    NotPending { card_id: String, status: String },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}
