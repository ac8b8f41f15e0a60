//! Error types
//!
//! Every error here is local to one ingest, playout or HLS session. They are
//! returned to the caller that owns the connection; none of them is fatal to
//! the process.

use std::io;
use std::time::Duration;

use crate::registry::RegistryError;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for relay operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The ingest source failed (metadata or packet read)
    #[error("source error: {0}")]
    Source(#[source] io::Error),

    /// An empty packet was read without an end-of-stream signal
    #[error("RTMP stream dropped without end of stream")]
    DroppedConnection,

    /// The playout sink failed to accept a header, packet or trailer
    #[error("sink error: {0}")]
    Sink(#[source] io::Error),

    /// No buffer item arrived within the wait window
    #[error("timed out after {0:?} waiting for stream data")]
    Timeout(Duration),

    /// Non-blocking read found nothing to return
    #[error("buffer empty")]
    BufferEmpty,

    /// The caller's cancellation token fired
    #[error("operation cancelled")]
    Cancelled,

    /// Requested HLS segment did not appear within the wait window
    #[error("segment not found: {0}")]
    SegmentNotFound(String),

    /// Registry rejected the operation
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A buffer item arrived where the protocol does not allow it
    #[error("unexpected {0} item")]
    UnexpectedItem(&'static str),

    /// HTTP path is neither a playlist nor a segment request
    #[error("only HLS requests (m3u8, ts) are supported: {0}")]
    UnsupportedRequest(String),
}

impl Error {
    /// Whether this error ends a session because the peer or source went away
    /// rather than because of a local failure.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            Error::DroppedConnection | Error::Timeout(_) | Error::Cancelled
        )
    }

    /// Whether the requested stream or segment does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::SegmentNotFound(_) | Error::Registry(RegistryError::StreamNotFound(_))
        )
    }
}
