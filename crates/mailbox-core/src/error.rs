//! Error types for the core library.

use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The store rejected a write, or the caller passed malformed arguments.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Plain text could not be generated from the HTML body.
    #[error("Text generation failed: {0}")]
    TextGeneration(String),

    /// The transmission service refused or failed to send the message.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// The message was sent but the draft could not be replaced by the sent record.
    ///
    /// The draft is still stored under `draft_id`; nothing is stored under `sent_id`.
    #[error("Transition of draft {draft_id} to sent {sent_id} failed: {source}")]
    TransitionFailed {
        /// Identifier of the draft that is still present.
        draft_id: String,
        /// Identifier returned by the transmission service.
        sent_id: String,
        /// Underlying store failure.
        #[source]
        source: Box<Self>,
    },

    /// A stored record could not be parsed back into a domain value.
    #[error("Decode error: {0}")]
    Decode(String),

    /// No record exists under the given identifier.
    #[error("Email not found: {0}")]
    NotFound(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
