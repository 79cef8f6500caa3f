//! Error types for nvrmux

use thiserror::Error;

/// Result type alias for nvrmux operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for nvrmux operations
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid input parameter or call order
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Container muxing error
    #[error("Muxing error: {0}")]
    Mux(String),

    /// Configuration file could not be parsed
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// Malformed group or index bytes
    #[error("Format error: {0}")]
    Format(String),
}

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        Error::Io(err.error)
    }
}
