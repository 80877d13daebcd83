//! Error types for Sarathi

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Sarathi error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Communication timeout
    #[error("Communication timeout")]
    Timeout,

    /// Stream framing violation (short read, bad or oversized length prefix)
    #[error("Framing error: {0}")]
    Framing(String),

    /// Command protocol violation (delimiter in argument, malformed line)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// No backend registered under the configured name
    #[error("Unknown robot backend: {0}")]
    UnknownBackend(String),

    /// No arm joint with the given name
    #[error("Unknown arm joint: {0}")]
    UnknownJoint(String),

    /// Channel is not connected
    #[error("Not connected")]
    NotConnected,

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Protocol(e.to_string())
    }
}
