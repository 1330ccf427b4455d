//! Error types for youSonos core operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classification of an [`Error`], used to decide whether the session survives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The server sent a value outside its declared enum.
    ContractViolation,
    /// An inbound frame could not be understood.
    Protocol,
    /// The outbound channel is gone.
    Transport,
    /// Configuration could not be loaded or saved.
    Configuration,
    /// Local IO failure.
    Io,
}

/// Errors that can occur in youSonos core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The player reported a state outside `PLAYING`, `PAUSED`, `STOPPED`.
    #[error("Illegal player state received: {0}")]
    IllegalPlayerState(String),

    /// An inbound topic name is not part of the protocol.
    #[error("Unknown topic: {0}")]
    UnknownTopic(String),

    /// An inbound payload did not match the shape declared for its topic.
    #[error("Malformed payload for topic {topic}: {source}")]
    MalformedPayload {
        /// Topic the payload arrived on.
        topic: String,
        /// Decoding failure.
        source: serde_json::Error,
    },

    /// The command sink refused a command.
    #[error("Failed to send command {command}: {reason}")]
    SendFailed {
        /// Name of the command that could not be sent.
        command: &'static str,
        /// Reason reported by the sink.
        reason: String,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// File system operation failed.
    #[error("File system error at {path}: {message}")]
    FileSystem {
        /// Path where the error occurred.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::IllegalPlayerState(_) => ErrorKind::ContractViolation,
            Self::UnknownTopic(_) | Self::MalformedPayload { .. } | Self::Serialization(_) => {
                ErrorKind::Protocol
            }
            Self::SendFailed { .. } => ErrorKind::Transport,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::FileSystem { .. } | Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Whether the session must stop after this error.
    ///
    /// Protocol errors are skipped; a producer breaking its declared enum is not.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ContractViolation | ErrorKind::Transport
        )
    }
}
