//! Stream to HLS relay
//!
//! An ordinary consumer of the stream buffer, paced by the stall timeout like
//! RTMP playout, whose sink is a segmenter feeding an `HlsBuffer`.

use tokio_util::sync::CancellationToken;

use crate::buffer::Cursor;
use crate::error::{Error, Result};
use crate::hls::{HlsBuffer, Segmenter};
use crate::media::MediaItem;

use super::Stream;

impl Stream {
    /// Segment this stream into `hls` until the trailer.
    ///
    /// On the trailer the partial segment in progress is flushed and the HLS
    /// buffer is marked finished. Segmenter failures come back as
    /// `Error::Sink`. On any error the HLS buffer is left as is; finishing it
    /// is the caller's call.
    pub async fn read_hls_from_stream(
        &self,
        cancel: &CancellationToken,
        hls: &HlsBuffer,
        mut segmenter: Segmenter,
    ) -> Result<()> {
        let mut cursor = Cursor::new();

        match self.buffer.pop(&mut cursor, cancel, self.stall_timeout).await? {
            MediaItem::Header(codec) => segmenter.write_header(&codec).map_err(Error::Sink)?,
            other => return Err(Error::UnexpectedItem(other.kind())),
        }
        tracing::debug!(stream = %self.id, "HLS relay started");

        loop {
            match self.buffer.pop(&mut cursor, cancel, self.stall_timeout).await? {
                MediaItem::Packet(packet) => {
                    if let Some(segment) = segmenter.write_packet(&packet).map_err(Error::Sink)? {
                        tracing::trace!(
                            stream = %self.id,
                            segment = %segment.name,
                            bytes = segment.data.len(),
                            "Segment ready"
                        );
                        hls.write_segment(segment);
                    }
                }
                MediaItem::Trailer => {
                    if let Some(segment) = segmenter.flush().map_err(Error::Sink)? {
                        hls.write_segment(segment);
                    }
                    hls.finish();
                    tracing::info!(
                        stream = %self.id,
                        segments = segmenter.next_sequence(),
                        "HLS relay finished"
                    );
                    return Ok(());
                }
                MediaItem::Header(_) => return Err(Error::UnexpectedItem("header")),
            }
        }
    }
}
