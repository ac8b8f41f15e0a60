//! Shared media buffer
//!
//! One publisher pushes into a `StreamBuffer`; every consumer reads through
//! its own `Cursor`, so viewers drain at independent rates without copying
//! media.
//!
//! ```text
//!             head (keyframe)                         tail
//!               │                                      │
//!   [Header]    ▼                                      ▼
//!   cached ─► | K | P | P | P | K | P | P | P | P | T |
//!                   ▲               ▲           ▲
//!                cursor A        cursor B    cursor C
//! ```
//!
//! # Eviction
//!
//! Memory is bounded by item count. When a push exceeds it, everything before
//! the most recent keyframe is dropped, so the window always begins at a
//! decodable entry point. The header is cached outside the window and handed
//! to every fresh cursor first.
//!
//! # End of stream
//!
//! The consumer that drains the trailer clears the buffer. Consumers still
//! behind it receive a trailer on their next read.

pub mod config;
pub mod stats;
pub mod stream_buffer;

pub use config::BufferConfig;
pub use stats::BufferStats;
pub use stream_buffer::{Cursor, StreamBuffer};
