//! Lookup seams used by playback sessions
//!
//! Playback only needs to find things by id. Taking these traits instead of
//! a concrete registry lets a session run against any store, including test
//! doubles.

use std::future::Future;
use std::sync::Arc;

use crate::error::Result;
use crate::hls::HlsBuffer;
use crate::stream::Stream;

use super::error::RegistryError;
use super::store::StreamRegistry;

/// Finds live streams by id
pub trait StreamLookup: Send + Sync {
    /// Get the stream published under `id`
    fn get_stream(
        &self,
        id: &str,
    ) -> impl Future<Output = std::result::Result<Arc<Stream>, RegistryError>> + Send;
}

/// Finds (or starts) the HLS output of a stream
pub trait HlsLookup: Send + Sync {
    /// Get the HLS buffer for stream `id`
    fn get_hls_buffer(&self, id: &str) -> impl Future<Output = Result<Arc<HlsBuffer>>> + Send;
}

impl StreamLookup for StreamRegistry {
    async fn get_stream(&self, id: &str) -> std::result::Result<Arc<Stream>, RegistryError> {
        StreamRegistry::get_stream(self, id).await
    }
}
