//! Stream registry implementation
//!
//! Tracks live streams by id and the HLS buffers derived from them. The two
//! maps have separate lifetimes: a stream goes away when its publisher ends,
//! while its HLS buffer lingers so HTTP viewers can fetch the final playlist.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;

use crate::buffer::BufferStats;
use crate::hls::HlsBuffer;
use crate::stream::Stream;

use super::config::RegistryConfig;
use super::error::RegistryError;

/// Central registry for all live streams
///
/// Thread-safe via `RwLock`. Lookups by viewers vastly outnumber publishes,
/// so reads never wait on each other.
pub struct StreamRegistry {
    /// Map of stream id to stream
    streams: RwLock<HashMap<String, Arc<Stream>>>,

    /// Map of stream id to HLS output
    hls: RwLock<HashMap<String, Arc<HlsBuffer>>>,

    /// Configuration
    config: RegistryConfig,
}

impl StreamRegistry {
    /// Create a new stream registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new stream registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            streams: RwLock::new(HashMap::new()),
            hls: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register a new stream for a publisher
    ///
    /// Returns an error if the id already has a live publisher.
    pub async fn create_stream(&self, id: &str) -> Result<Arc<Stream>, RegistryError> {
        let mut streams = self.streams.write().await;

        if streams.contains_key(id) {
            return Err(RegistryError::StreamAlreadyPublishing(id.to_string()));
        }

        let stream = Arc::new(Stream::with_config(id, self.config.stream.clone()));
        streams.insert(id.to_string(), Arc::clone(&stream));

        tracing::info!(stream = %id, streams = streams.len(), "Stream registered");
        Ok(stream)
    }

    /// Look up a live stream
    pub async fn get_stream(&self, id: &str) -> Result<Arc<Stream>, RegistryError> {
        self.streams
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::StreamNotFound(id.to_string()))
    }

    /// Remove `stream` if it is still the one registered under its id
    ///
    /// Returns false when the id is gone or was taken over by another stream.
    pub async fn unregister_stream(&self, stream: &Arc<Stream>) -> bool {
        let mut streams = self.streams.write().await;

        match streams.get(stream.id()) {
            Some(current) if Arc::ptr_eq(current, stream) => {
                streams.remove(stream.id());
                tracing::info!(stream = %stream.id(), "Stream unregistered");
                true
            }
            Some(_) => {
                tracing::warn!(stream = %stream.id(), "Stream unregister mismatch");
                false
            }
            None => false,
        }
    }

    /// Look up the HLS buffer of a stream, finished or not
    pub async fn hls_buffer(&self, id: &str) -> Option<Arc<HlsBuffer>> {
        self.hls.read().await.get(id).cloned()
    }

    /// Get the HLS buffer of a stream, creating it if needed
    ///
    /// The flag is true when the buffer was created by this call, in which
    /// case the caller is expected to start feeding it.
    pub async fn get_or_create_hls_buffer(&self, id: &str) -> (Arc<HlsBuffer>, bool) {
        let mut hls = self.hls.write().await;

        if let Some(existing) = hls.get(id) {
            return (Arc::clone(existing), false);
        }

        let buffer = Arc::new(HlsBuffer::with_config(self.config.hls.clone()));
        hls.insert(id.to_string(), Arc::clone(&buffer));

        tracing::debug!(stream = %id, "HLS buffer created");
        (buffer, true)
    }

    /// Drop the HLS buffer of a stream
    pub async fn remove_hls_buffer(&self, id: &str) -> Option<Arc<HlsBuffer>> {
        self.hls.write().await.remove(id)
    }

    /// Ids of all live streams, sorted
    pub async fn stream_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.streams.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Get buffer statistics of a live stream
    pub async fn stream_stats(&self, id: &str) -> Option<BufferStats> {
        self.streams.read().await.get(id).map(|stream| stream.stats())
    }

    /// Get total number of live streams
    pub async fn stream_count(&self) -> usize {
        self.streams.read().await.len()
    }

    /// Get total number of HLS buffers, lingering ones included
    pub async fn hls_count(&self) -> usize {
        self.hls.read().await.len()
    }

    /// Run cleanup once
    ///
    /// Removes HLS buffers that finished more than `hls_linger` ago.
    pub async fn cleanup(&self) {
        let mut hls = self.hls.write().await;
        let now = Instant::now();
        let linger = self.config.hls_linger;

        let ids_to_remove: Vec<String> = hls
            .iter()
            .filter_map(|(id, buffer)| {
                let finished_at = buffer.finished_at()?;
                (now.duration_since(finished_at) >= linger).then(|| id.clone())
            })
            .collect();

        for id in ids_to_remove {
            hls.remove(&id);
            tracing::info!(stream = %id, "HLS buffer removed by cleanup");
        }
    }

    /// Spawn background cleanup task
    ///
    /// Returns a handle that can be used to abort the task.
    pub fn spawn_cleanup_task(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(self);
        let interval = registry.config.cleanup_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                registry.cleanup().await;
            }
        })
    }
}

impl Default for StreamRegistry {
    fn default() -> Self {
        Self::new()
    }
}
