//! Error types for the MPD session

use thiserror::Error;

/// Errors that can occur while talking to MPD
#[derive(Debug, Error)]
pub enum SessionError {
    /// Socket level failure: refused connection, reset, broken pipe
    #[error("Network error: {0}")]
    Network(String),

    /// MPD answered with an `ACK` error line
    #[error("MPD error: {0}")]
    Server(String),

    /// The response could not be understood
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl From<mpd::error::Error> for SessionError {
    fn from(error: mpd::error::Error) -> Self {
        match error {
            mpd::error::Error::Io(e) => SessionError::Network(e.to_string()),
            mpd::error::Error::Server(e) => SessionError::Server(e.to_string()),
            other => SessionError::Protocol(other.to_string()),
        }
    }
}
