//! Live RTMP relay
//!
//! Relays one live RTMP publish per stream to any number of independently
//! paced viewers: RTMP players and HTTP clients fetching HLS playlists and
//! segments. Memory per stream is bounded, every wait has a timeout, and the
//! way a source ended is reported explicitly.
//!
//! Protocol I/O stays outside this crate. A publish connection is anything
//! implementing [`Demuxer`], an RTMP viewer anything implementing [`Muxer`],
//! and the TS packager anything implementing [`SegmentMuxer`].
//!
//! ```text
//!   Demuxer ──► write_rtmp_to_stream ──► StreamBuffer ──► read_rtmp_from_stream ──► Muxer
//!                                             │
//!                                             └──► read_hls_from_stream ──► HlsBuffer ◄── HTTP
//! ```
//!
//! # How a source ends
//!
//! | Outcome             | Ingest returns           | Viewers see                 |
//! |---------------------|--------------------------|-----------------------------|
//! | graceful end        | `Ok(())`                 | trailer, then `Ok(())`      |
//! | dropped connection  | `Error::DroppedConnection` | buffered data, then `Error::Timeout` |
//! | I/O error           | `Error::Source`          | buffered data, then `Error::Timeout` |
//!
//! # Example
//!
//! ```no_run
//! use rtmp_relay::{Relay, SegmentMuxer};
//! use tokio_util::sync::CancellationToken;
//!
//! # fn ts_muxer(_id: &str) -> Box<dyn SegmentMuxer> { unimplemented!() }
//! # async fn run<D: rtmp_relay::Demuxer>(mut demuxer: D) -> rtmp_relay::Result<()> {
//! let relay = Relay::new(ts_muxer);
//! relay.publish("live", &mut demuxer, &CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod error;
pub mod hls;
pub mod media;
pub mod player;
pub mod registry;
pub mod relay;
pub mod stream;

pub use buffer::{BufferConfig, BufferStats, Cursor, StreamBuffer};
pub use error::{Error, Result};
pub use hls::{HlsBuffer, HlsConfig, HlsRequest, MediaPlaylist, Segment, SegmentMuxer, Segmenter};
pub use media::{CodecData, MediaItem, Packet, TrackInfo, TrackKind};
pub use player::{play_hls, play_rtmp, HlsResponse};
pub use registry::{HlsLookup, RegistryConfig, RegistryError, StreamLookup, StreamRegistry};
pub use relay::{MakeSegmentMuxer, Relay};
pub use stream::{Demuxer, Muxer, Stream, StreamConfig};
