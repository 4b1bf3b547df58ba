//! Error types for streaming sessions

use std::time::Duration;

/// Errors reported through a session's error callback
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The request could not be sent or the channel never opened
    #[error("Failed to open stream: {0}")]
    ChannelOpen(String),

    /// The server answered the open request with a non-success status
    #[error("Stream request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// The server ended the stream with an `error` frame
    #[error("Server error: {0}")]
    Server(String),

    /// Reading from an open channel failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// No data arrived within the idle window
    #[error("Stream stalled: no data for {0:?}")]
    Stalled(Duration),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl StreamError {
    /// Whether this error happened before the channel was open
    pub fn is_open_failure(&self) -> bool {
        matches!(self, Self::ChannelOpen(_) | Self::Status { .. })
    }
}
