use thiserror::Error;

/// Errors that can occur while running the calibrator.
///
/// Transport failures are scoped to the task that hit them: a pair whose
/// connection fails logs the error and stops doing work, but never takes
/// down sibling pairs or the manager.
#[derive(Error, Debug)]
pub enum Error {
    /// Broker connection could not be established
    #[error("connection to broker failed for client {client_id}: {reason}")]
    Connect { client_id: String, reason: String },

    /// Broker rejected or failed a subscription request
    #[error("subscribe failed for topic {topic}: {reason}")]
    Subscribe { topic: String, reason: String },

    /// Publish could not be handed to the broker
    #[error("publish failed for topic {topic}: {reason}")]
    Publish { topic: String, reason: String },

    /// Malformed JSON payload on a state topic
    #[error("payload decode failed: {0}")]
    Decode(#[from] serde_json::Error),

    /// Configuration file could not be read
    #[error("failed to read config file: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("failed to parse config file: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// A transport-side channel closed while still in use
    #[error("transport channel closed")]
    ChannelClosed,
}

/// Result type alias for calibrator operations
pub type Result<T> = std::result::Result<T, Error>;
