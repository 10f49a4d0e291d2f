//! Error types for the query transport.

use beaty_core::error::BeatyError;

/// Failures that end a query stream before or while it is read.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("server returned HTTP {0}")]
    Status(u16),
    #[error("network error: {0}")]
    Network(String),
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl From<reqwest::Error> for StreamError {
    fn from(err: reqwest::Error) -> Self {
        StreamError::Network(err.to_string())
    }
}

impl From<StreamError> for BeatyError {
    fn from(err: StreamError) -> Self {
        BeatyError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_error_display() {
        assert_eq!(
            StreamError::Status(502).to_string(),
            "server returned HTTP 502"
        );
        assert_eq!(
            StreamError::Network("connection reset".into()).to_string(),
            "network error: connection reset"
        );
        assert_eq!(
            StreamError::Client("bad tls".into()).to_string(),
            "failed to build HTTP client: bad tls"
        );
    }

    #[test]
    fn test_stream_error_into_beaty_error() {
        let err: BeatyError = StreamError::Status(401).into();
        assert!(matches!(err, BeatyError::Transport(_)));
        assert!(err.to_string().contains("401"));
    }
}
