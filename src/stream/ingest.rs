//! RTMP publish ingest
//!
//! Drains a demuxer into the stream buffer: one header, then packets until the
//! source ends. How it ends decides the result:
//!
//! | `read_packet` returns     | Buffer gets | Result                     |
//! |---------------------------|-------------|----------------------------|
//! | `Ok(None)`                | trailer     | `Ok(())`                   |
//! | `Err(e)`                  | nothing     | `Err(Error::Source(e))`    |
//! | `Ok(Some(p))`, empty `p`  | nothing     | `Err(DroppedConnection)`   |
//!
//! Some RTMP stacks surface a closed TCP connection as a successful read of a
//! zero-length packet, so the emptiness check runs on every packet.

use std::future::Future;
use std::io;

use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::media::{CodecData, MediaItem, Packet};

use super::{or_cancel, Stream};

/// Source side of a publish connection
pub trait Demuxer: Send {
    /// Read the codec metadata; called once, before any packet
    fn streams(&mut self) -> impl Future<Output = io::Result<CodecData>> + Send;

    /// Read the next packet; `Ok(None)` signals graceful end of stream
    fn read_packet(&mut self) -> impl Future<Output = io::Result<Option<Packet>>> + Send;

    /// Close the underlying connection
    fn close(&mut self) -> impl Future<Output = io::Result<()>> + Send;
}

impl Stream {
    /// Copy a publish connection into this stream until it ends.
    ///
    /// Returns `Ok(())` after a graceful end (a trailer was pushed). Source
    /// failures are returned as `Error::Source` with the demuxer's error
    /// untouched; an empty packet returns `Error::DroppedConnection`. Neither
    /// pushes a trailer. The demuxer is not closed here.
    pub async fn write_rtmp_to_stream<D: Demuxer>(
        &self,
        cancel: &CancellationToken,
        demuxer: &mut D,
    ) -> Result<()> {
        let codec = or_cancel(cancel, demuxer.streams())
            .await?
            .map_err(|e| {
                tracing::warn!(stream = %self.id, error = %e, "Failed to read stream metadata");
                Error::Source(e)
            })?;

        self.buffer.push(MediaItem::Header(codec));
        tracing::debug!(stream = %self.id, "Header pushed");

        let mut packets: u64 = 0;
        loop {
            match or_cancel(cancel, demuxer.read_packet()).await? {
                Ok(Some(packet)) if packet.is_empty() => {
                    tracing::warn!(
                        stream = %self.id,
                        packets = packets,
                        "Empty packet without end of stream, publisher dropped"
                    );
                    return Err(Error::DroppedConnection);
                }
                Ok(Some(packet)) => {
                    self.buffer.push(MediaItem::Packet(packet));
                    packets += 1;
                }
                Ok(None) => {
                    self.buffer.push(MediaItem::Trailer);
                    tracing::info!(stream = %self.id, packets = packets, "Publish ended");
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(
                        stream = %self.id,
                        packets = packets,
                        error = %e,
                        "Packet read failed"
                    );
                    return Err(Error::Source(e));
                }
            }
        }
    }
}
