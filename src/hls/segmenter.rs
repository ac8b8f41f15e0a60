//! Packet-to-segment cutting
//!
//! The `Segmenter` decides where segments start and end and how they are
//! named. Turning packets into MPEG-TS bytes is the job of a `SegmentMuxer`.

use std::io;
use std::time::Duration;

use bytes::Bytes;

use crate::media::{CodecData, Packet};

/// MIME type of an MPEG-TS segment
pub const SEGMENT_CONTENT_TYPE: &str = "video/mp2t";

/// Packages packets into segment bytes (e.g., an MPEG-TS muxer)
pub trait SegmentMuxer: Send {
    /// Receive the codec metadata before any packet
    fn write_header(&mut self, codec: &CodecData) -> io::Result<()>;

    /// Add a packet to the current segment
    fn write_packet(&mut self, packet: &Packet) -> io::Result<()>;

    /// Close the current segment and return its bytes
    fn finish_segment(&mut self) -> io::Result<Bytes>;
}

/// A finished segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// File name, `{stream_id}_{sequence}.ts`
    pub name: String,
    /// Position in the stream, starting at 0
    pub sequence: u64,
    /// Media time covered
    pub duration: Duration,
    /// Segment bytes
    pub data: Bytes,
}

/// Build the file name of a segment
pub fn segment_name(stream_id: &str, sequence: u64) -> String {
    format!("{}_{}.ts", stream_id, sequence)
}

/// Cuts a packet sequence into segments of at least the target duration
///
/// With a video track, segments only start on keyframes so each one is
/// independently decodable; packets ahead of the first keyframe are dropped.
/// Audio-only streams cut on any packet.
pub struct Segmenter {
    muxer: Box<dyn SegmentMuxer>,
    stream_id: String,
    target: Duration,
    next_sequence: u64,
    has_video: bool,
    started_at: Option<u32>,
    last_timestamp: u32,
}

impl Segmenter {
    /// Create a segmenter for `stream_id`
    pub fn new(
        stream_id: impl Into<String>,
        target: Duration,
        muxer: Box<dyn SegmentMuxer>,
    ) -> Self {
        Self {
            muxer,
            stream_id: stream_id.into(),
            target,
            next_sequence: 0,
            has_video: false,
            started_at: None,
            last_timestamp: 0,
        }
    }

    /// Sequence number the next segment will get
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Pass the stream header to the muxer
    pub fn write_header(&mut self, codec: &CodecData) -> io::Result<()> {
        self.has_video = codec.has_video();
        self.muxer.write_header(codec)
    }

    /// Add a packet, returning the previous segment if this packet starts a new one
    pub fn write_packet(&mut self, packet: &Packet) -> io::Result<Option<Segment>> {
        let boundary = packet.is_keyframe || !self.has_video;
        if self.started_at.is_none() && !boundary {
            return Ok(None);
        }

        let finished = match self.started_at {
            Some(start) if boundary && elapsed(start, packet.timestamp) >= self.target => {
                self.cut(packet.timestamp)?
            }
            _ => None,
        };

        if self.started_at.is_none() {
            self.started_at = Some(packet.timestamp);
        }
        self.muxer.write_packet(packet)?;
        self.last_timestamp = packet.timestamp;

        Ok(finished)
    }

    /// Close the segment in progress, if any
    pub fn flush(&mut self) -> io::Result<Option<Segment>> {
        self.cut(self.last_timestamp)
    }

    fn cut(&mut self, end: u32) -> io::Result<Option<Segment>> {
        let Some(start) = self.started_at.take() else {
            return Ok(None);
        };

        let data = self.muxer.finish_segment()?;
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        Ok(Some(Segment {
            name: segment_name(&self.stream_id, sequence),
            sequence,
            duration: elapsed(start, end),
            data,
        }))
    }
}

fn elapsed(start: u32, end: u32) -> Duration {
    Duration::from_millis(u64::from(end.saturating_sub(start)))
}
