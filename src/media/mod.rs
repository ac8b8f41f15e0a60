//! Media types moved through the relay
//!
//! This module provides:
//! - Codec descriptors (`CodecData`, `TrackInfo`)
//! - Timestamped packets with a keyframe flag
//! - `MediaItem`, the Header / Packet / Trailer unit stored in a stream buffer

pub mod item;
pub mod packet;

pub use item::MediaItem;
pub use packet::{CodecData, Packet, TrackInfo, TrackKind};
