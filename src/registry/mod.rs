//! Stream registry
//!
//! Maps stream ids to live `Stream`s and to the `HlsBuffer`s derived from
//! them. Publishers register on publish-start and unregister on publish-end;
//! viewers only ever look things up.
//!
//! # Architecture
//!
//! ```text
//!                          Arc<StreamRegistry>
//!                     ┌──────────────────────────┐
//!                     │ streams: HashMap<id,     │
//!                     │   Arc<Stream>>           │
//!                     │ hls:     HashMap<id,     │
//!                     │   Arc<HlsBuffer>>        │
//!                     └───────────┬──────────────┘
//!                                 │
//!         ┌───────────────────────┼───────────────────────┐
//!         │                       │                       │
//!         ▼                       ▼                       ▼
//!    [Publisher]            [RTMP viewer]            [HLS relay]
//!    create_stream()        get_stream()             get_or_create_hls_buffer()
//!    unregister_stream()
//! ```
//!
//! Sessions hold their own `Arc`, so removing an entry never cuts off a
//! viewer that is still draining it.

pub mod config;
pub mod error;
pub mod lookup;
pub mod store;

pub use config::RegistryConfig;
pub use error::RegistryError;
pub use lookup::{HlsLookup, StreamLookup};
pub use store::StreamRegistry;
