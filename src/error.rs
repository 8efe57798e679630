//! Error types.

use thiserror::Error;

/// Errors that can occur while querying a snapshot source.
///
/// None of these ever escape a poll tick: the engine logs them and keeps
/// its timer armed for the next tick.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Reading from a file or socket failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The payload could not be parsed into a snapshot.
    #[error("Failed to parse snapshot: {0}")]
    Parse(String),

    /// The server replied with something that is not valid RESP,
    /// or with an error reply.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Connection failed.
    #[error("Connection to {addr} failed: {reason}")]
    Connection { addr: String, reason: String },

    /// Timeout waiting for a reply.
    #[error("Query timed out")]
    Timeout,

    /// The target asks for a command or type this source cannot serve.
    #[error("Unsupported target: {0}")]
    Unsupported(String),
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(err.to_string())
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
