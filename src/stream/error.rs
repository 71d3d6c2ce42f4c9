//! Stream error types
//!
//! Distributor errors are returned to the caller of `subscribe`/`unsubscribe`;
//! codec errors stay inside the streaming task, where only I/O is fatal.

use std::time::Duration;
use thiserror::Error;

use super::distributor::SubscriptionId;

/// Errors surfaced by a stream distributor
#[derive(Error, Debug)]
pub enum StreamError {
    /// Dialing the upstream failed; the feed stays idle and may be retried
    #[error("Failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Dialing the upstream took longer than the configured timeout
    #[error("Timed out connecting to {address} after {timeout:?}")]
    ConnectTimeout { address: String, timeout: Duration },

    /// Writing the feed name to the upstream failed
    #[error("Failed to send handshake for feed {feed}: {source}")]
    Handshake {
        feed: String,
        #[source]
        source: std::io::Error,
    },

    /// No live subscription has this id
    #[error("Unknown subscription id {0}")]
    UnknownSubscription(SubscriptionId),

    /// The distributor's control task has exited
    #[error("Distributor for feed {0} is no longer running")]
    Closed(String),
}

/// Result type for stream operations
pub type StreamResult<T> = Result<T, StreamError>;

/// Errors from the line-delimited JSON codec
#[derive(Error, Debug)]
pub enum CodecError {
    /// Reading or writing the underlying stream failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A line was not valid JSON
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// A value could not be encoded
    #[error("Encode error: {0}")]
    Encode(serde_json::Error),

    /// A line exceeded the configured maximum and was discarded
    #[error("Line of {len} bytes exceeds limit of {max}")]
    LineTooLong { len: usize, max: usize },
}

impl CodecError {
    /// Whether the reader can carry on with the next line
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CodecError::Decode(_) | CodecError::LineTooLong { .. })
    }
}
