//! Codec descriptors and media packets
//!
//! Both types are cheap to clone: payloads are `Bytes`, so every consumer of
//! a buffer shares the allocation made by the demuxer.

use bytes::Bytes;

/// Kind of elementary stream carried by a track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    /// Video track
    Video,
    /// Audio track
    Audio,
}

/// Description of one track in a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    /// Track kind
    pub kind: TrackKind,
    /// Codec name (e.g., "h264", "aac")
    pub codec: String,
    /// Decoder configuration (AVCDecoderConfigurationRecord, AudioSpecificConfig, ...)
    pub config: Bytes,
}

impl TrackInfo {
    /// Create a video track description
    pub fn video(codec: impl Into<String>, config: Bytes) -> Self {
        Self {
            kind: TrackKind::Video,
            codec: codec.into(),
            config,
        }
    }

    /// Create an audio track description
    pub fn audio(codec: impl Into<String>, config: Bytes) -> Self {
        Self {
            kind: TrackKind::Audio,
            codec: codec.into(),
            config,
        }
    }
}

/// Codec metadata of a stream, required before any packet can be decoded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodecData {
    /// Tracks, indexed by `Packet::track`
    pub tracks: Vec<TrackInfo>,
}

impl CodecData {
    /// Create codec data from a list of tracks
    pub fn new(tracks: Vec<TrackInfo>) -> Self {
        Self { tracks }
    }

    /// Whether the stream carries a video track
    pub fn has_video(&self) -> bool {
        self.tracks.iter().any(|t| t.kind == TrackKind::Video)
    }
}

/// One timestamped media unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Index into `CodecData::tracks`
    pub track: usize,
    /// Timestamp in milliseconds
    pub timestamp: u32,
    /// Encoded payload (zero-copy via reference counting)
    pub data: Bytes,
    /// Whether this packet can be decoded without prior packets
    pub is_keyframe: bool,
}

impl Packet {
    /// Create a packet
    pub fn new(track: usize, timestamp: u32, data: Bytes, is_keyframe: bool) -> Self {
        Self {
            track,
            timestamp,
            data,
            is_keyframe,
        }
    }

    /// Create a video packet on track 0
    pub fn video(timestamp: u32, data: Bytes, is_keyframe: bool) -> Self {
        Self::new(0, timestamp, data, is_keyframe)
    }

    /// Create an audio packet on track 1
    pub fn audio(timestamp: u32, data: Bytes) -> Self {
        Self::new(1, timestamp, data, false)
    }

    /// Payload size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
