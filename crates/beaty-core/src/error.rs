use thiserror::Error;

/// Top-level error type for the Beaty client.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for BeatyError` so that `?` works across crate
/// boundaries in the binary.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BeatyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for BeatyError {
    fn from(err: toml::de::Error) -> Self {
        BeatyError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for BeatyError {
    fn from(err: toml::ser::Error) -> Self {
        BeatyError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for BeatyError {
    fn from(err: serde_json::Error) -> Self {
        BeatyError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Beaty operations.
pub type Result<T> = std::result::Result<T, BeatyError>;
