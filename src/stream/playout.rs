//! RTMP playout
//!
//! Drains the stream buffer into a muxer for one viewer. Every pop waits at
//! most the stream's stall timeout, which is the only signal a playout session
//! gets when the publisher stalls or dies without a trailer.

use std::future::Future;
use std::io;

use tokio_util::sync::CancellationToken;

use crate::buffer::Cursor;
use crate::error::{Error, Result};
use crate::media::{CodecData, MediaItem, Packet};

use super::{or_cancel, Stream};

/// Sink side of a play connection
pub trait Muxer: Send {
    /// Write the codec metadata; called once, before any packet
    fn write_header(&mut self, codec: &CodecData) -> impl Future<Output = io::Result<()>> + Send;

    /// Write one packet
    fn write_packet(&mut self, packet: &Packet) -> impl Future<Output = io::Result<()>> + Send;

    /// Signal end of stream to the viewer
    fn write_trailer(&mut self) -> impl Future<Output = io::Result<()>> + Send;

    /// Close the underlying connection
    fn close(&mut self) -> impl Future<Output = io::Result<()>> + Send;
}

impl Stream {
    /// Copy this stream into a play connection until the trailer.
    ///
    /// Starts at the header and the latest keyframe window, independent of any
    /// other reader. Returns `Ok(())` once the trailer has been written.
    /// Sink failures come back as `Error::Sink` with the muxer's error
    /// untouched; a stalled source ends the session with `Error::Timeout`.
    /// The muxer is not closed here.
    pub async fn read_rtmp_from_stream<M: Muxer>(
        &self,
        cancel: &CancellationToken,
        muxer: &mut M,
    ) -> Result<()> {
        let mut cursor = Cursor::new();

        match self.buffer.pop(&mut cursor, cancel, self.stall_timeout).await? {
            MediaItem::Header(codec) => {
                or_cancel(cancel, muxer.write_header(&codec))
                    .await?
                    .map_err(Error::Sink)?;
            }
            other => return Err(Error::UnexpectedItem(other.kind())),
        }

        let mut packets: u64 = 0;
        loop {
            let item = match self.buffer.pop(&mut cursor, cancel, self.stall_timeout).await {
                Ok(item) => item,
                Err(e) => {
                    tracing::debug!(
                        stream = %self.id,
                        packets = packets,
                        error = %e,
                        "Playout stopped waiting for data"
                    );
                    return Err(e);
                }
            };

            match item {
                MediaItem::Packet(packet) => {
                    or_cancel(cancel, muxer.write_packet(&packet))
                        .await?
                        .map_err(Error::Sink)?;
                    packets += 1;
                }
                MediaItem::Trailer => {
                    or_cancel(cancel, muxer.write_trailer())
                        .await?
                        .map_err(Error::Sink)?;
                    tracing::info!(stream = %self.id, packets = packets, "Playout finished");
                    return Ok(());
                }
                MediaItem::Header(_) => return Err(Error::UnexpectedItem("header")),
            }
        }
    }
}
