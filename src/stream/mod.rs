//! Live streams and their protocol adapters
//!
//! A `Stream` owns one `StreamBuffer`. Three adapters move media through it:
//!
//! - `Stream::write_rtmp_to_stream` drains a `Demuxer` (the RTMP publish
//!   connection) into the buffer and classifies how the source ended
//! - `Stream::read_rtmp_from_stream` drains the buffer into a `Muxer` (an RTMP
//!   viewer) with a stall timeout
//! - `Stream::read_hls_from_stream` drains the buffer into an `HlsBuffer`
//!   through a `Segmenter`
//!
//! Each call is one session. Any number of readers can run against the same
//! stream while the writer is still pushing.

pub mod config;
pub mod hls_relay;
pub mod ingest;
pub mod playout;

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::buffer::{BufferStats, StreamBuffer};
use crate::error::{Error, Result};

pub use config::StreamConfig;
pub use ingest::Demuxer;
pub use playout::Muxer;

/// A live stream: an id, a media buffer and a stall timeout
#[derive(Debug)]
pub struct Stream {
    id: String,
    buffer: StreamBuffer,
    stall_timeout: Duration,
}

impl Stream {
    /// Create a stream with default configuration
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_config(id, StreamConfig::default())
    }

    /// Create a stream with custom configuration
    pub fn with_config(id: impl Into<String>, config: StreamConfig) -> Self {
        Self {
            id: id.into(),
            buffer: StreamBuffer::with_config(config.buffer),
            stall_timeout: config.stall_timeout,
        }
    }

    /// Stream identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The underlying buffer
    pub fn buffer(&self) -> &StreamBuffer {
        &self.buffer
    }

    /// How long readers wait for the next item
    pub fn stall_timeout(&self) -> Duration {
        self.stall_timeout
    }

    /// Number of items currently buffered
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the buffer holds no items
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Buffer statistics
    pub fn stats(&self) -> BufferStats {
        self.buffer.stats()
    }
}

/// Run `fut` unless `cancel` fires first.
pub(crate) async fn or_cancel<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = T>,
) -> Result<T> {
    tokio::select! {
        out = fut => Ok(out),
        _ = cancel.cancelled() => Err(Error::Cancelled),
    }
}
