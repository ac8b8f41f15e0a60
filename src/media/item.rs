//! Buffer item type

use super::packet::{CodecData, Packet};

/// The unit moved through a stream buffer
///
/// A stream is always `Header`, then any number of `Packet`s, then at most one
/// `Trailer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaItem {
    /// Codec metadata, produced once per stream
    Header(CodecData),
    /// A media packet
    Packet(Packet),
    /// Graceful end of the live source
    Trailer,
}

impl MediaItem {
    /// Whether this item is a keyframe packet
    pub fn is_keyframe(&self) -> bool {
        matches!(self, MediaItem::Packet(p) if p.is_keyframe)
    }

    /// Whether this item is the end-of-stream marker
    pub fn is_trailer(&self) -> bool {
        matches!(self, MediaItem::Trailer)
    }

    /// Short name used in logs and errors
    pub fn kind(&self) -> &'static str {
        match self {
            MediaItem::Header(_) => "header",
            MediaItem::Packet(_) => "packet",
            MediaItem::Trailer => "trailer",
        }
    }
}

impl From<Packet> for MediaItem {
    fn from(packet: Packet) -> Self {
        MediaItem::Packet(packet)
    }
}

impl From<CodecData> for MediaItem {
    fn from(codec: CodecData) -> Self {
        MediaItem::Header(codec)
    }
}
