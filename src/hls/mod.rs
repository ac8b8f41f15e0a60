//! HLS output
//!
//! HTTP viewers do not read the stream buffer directly. A relay task (see
//! `Stream::read_hls_from_stream`) cuts the stream into segments and publishes
//! them, together with a sliding playlist, into an `HlsBuffer`. HTTP handlers
//! then block on the buffer until the artifact they were asked for exists.
//!
//! ```text
//!   Stream ──► Segmenter ──► HlsBuffer ◄── wait_and_pop_playlist  (GET .m3u8)
//!              (SegmentMuxer)    ▲
//!                                └──────── wait_and_pop_segment   (GET .ts)
//! ```

pub mod buffer;
pub mod config;
pub mod playlist;
pub mod request;
pub mod segmenter;

pub use buffer::HlsBuffer;
pub use config::HlsConfig;
pub use playlist::{MediaPlaylist, PlaylistEntry, PLAYLIST_CONTENT_TYPE};
pub use request::HlsRequest;
pub use segmenter::{segment_name, Segment, SegmentMuxer, Segmenter, SEGMENT_CONTENT_TYPE};
