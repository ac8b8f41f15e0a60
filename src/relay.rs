//! Relay wiring
//!
//! `Relay` ties the registry to the per-connection sessions: a publish
//! registers a stream and runs ingest, RTMP viewers run playout against it,
//! and the first HLS request for a stream starts a background relay task
//! that segments it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::hls::{HlsBuffer, SegmentMuxer, Segmenter};
use crate::player::{self, HlsResponse};
use crate::registry::{HlsLookup, RegistryConfig, RegistryError, StreamLookup, StreamRegistry};
use crate::stream::{Demuxer, Muxer, Stream};

/// Creates the segment packager for a new HLS output
pub trait MakeSegmentMuxer: Send + Sync + 'static {
    /// Build a muxer for stream `stream_id`
    fn make_segment_muxer(&self, stream_id: &str) -> Box<dyn SegmentMuxer>;
}

impl<F> MakeSegmentMuxer for F
where
    F: Fn(&str) -> Box<dyn SegmentMuxer> + Send + Sync + 'static,
{
    fn make_segment_muxer(&self, stream_id: &str) -> Box<dyn SegmentMuxer> {
        self(stream_id)
    }
}

/// Live relay: one registry, any number of publish and play sessions
pub struct Relay<F: MakeSegmentMuxer> {
    registry: Arc<StreamRegistry>,
    segment_muxers: F,
    shutdown: CancellationToken,
    next_session_id: AtomicU64,
}

impl<F: MakeSegmentMuxer> Relay<F> {
    /// Create a relay with default registry configuration
    pub fn new(segment_muxers: F) -> Self {
        Self::with_config(RegistryConfig::default(), segment_muxers)
    }

    /// Create a relay with custom registry configuration
    pub fn with_config(config: RegistryConfig, segment_muxers: F) -> Self {
        Self {
            registry: Arc::new(StreamRegistry::with_config(config)),
            segment_muxers,
            shutdown: CancellationToken::new(),
            next_session_id: AtomicU64::new(1),
        }
    }

    /// Get a reference to the stream registry
    pub fn registry(&self) -> &Arc<StreamRegistry> {
        &self.registry
    }

    /// Token cancelled by `shutdown`
    ///
    /// Background HLS relays run on child tokens of it. Session callers can
    /// derive their own tokens from it too.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Stop all background HLS relays
    pub fn shutdown(&self) {
        tracing::info!("Relay shutting down");
        self.shutdown.cancel();
    }

    /// Run a publish session for stream `id` until the source ends.
    ///
    /// Fails with `RegistryError::StreamAlreadyPublishing` if `id` is taken.
    /// HLS output left over from an earlier publish of `id` is dropped.
    /// Otherwise the demuxer is closed and the stream unregistered whatever
    /// the outcome. Viewers already attached keep draining what was buffered.
    pub async fn publish<D: Demuxer>(
        &self,
        id: &str,
        demuxer: &mut D,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);

        let stream = match self.registry.create_stream(id).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(stream = %id, session_id = session_id, error = %e, "Publish rejected");
                if let Err(e) = demuxer.close().await {
                    tracing::debug!(
                        session_id = session_id,
                        error = %e,
                        "Failed to close publish connection"
                    );
                }
                return Err(e.into());
            }
        };
        if self.registry.remove_hls_buffer(id).await.is_some() {
            tracing::debug!(stream = %id, "Dropped HLS output of previous publish");
        }
        tracing::info!(stream = %id, session_id = session_id, "Publish started");

        let result = stream.write_rtmp_to_stream(cancel, demuxer).await;

        if let Err(e) = demuxer.close().await {
            tracing::debug!(session_id = session_id, error = %e, "Failed to close publish connection");
        }
        self.registry.unregister_stream(&stream).await;

        let stats = stream.stats();
        tracing::debug!(
            stream = %id,
            pushed = stats.pushed,
            evicted = stats.evicted,
            eviction_rate = stats.eviction_rate(),
            resyncs = stats.resyncs,
            "Publish buffer summary"
        );

        match &result {
            Ok(()) => tracing::info!(stream = %id, session_id = session_id, "Publish finished"),
            Err(e) if e.is_disconnect() => {
                tracing::info!(stream = %id, session_id = session_id, reason = %e, "Publisher left")
            }
            Err(e) => {
                tracing::warn!(stream = %id, session_id = session_id, error = %e, "Publish failed")
            }
        }
        result
    }

    /// Serve one RTMP viewer of stream `id`; see `player::play_rtmp`
    pub async fn play_rtmp<M: Muxer>(
        &self,
        id: &str,
        muxer: &mut M,
        cancel: &CancellationToken,
    ) -> Result<()> {
        player::play_rtmp(self, id, muxer, cancel).await
    }

    /// Answer one HLS HTTP request; see `player::play_hls`
    pub async fn play_hls(&self, path: &str, cancel: &CancellationToken) -> Result<HlsResponse> {
        player::play_hls(self, path, cancel).await
    }

    /// Ids of all live streams, sorted
    pub async fn stream_ids(&self) -> Vec<String> {
        self.registry.stream_ids().await
    }

    fn spawn_hls_relay(&self, stream: Arc<Stream>, hls: Arc<HlsBuffer>) {
        let muxer = self.segment_muxers.make_segment_muxer(stream.id());
        let segmenter = Segmenter::new(stream.id(), hls.config().target_duration, muxer);
        let cancel = self.shutdown.child_token();

        tracing::debug!(stream = %stream.id(), "Starting HLS relay");
        tokio::spawn(async move {
            match stream.read_hls_from_stream(&cancel, &hls, segmenter).await {
                Ok(()) => {}
                Err(e) => {
                    tracing::info!(stream = %stream.id(), reason = %e, "HLS relay stopped");
                    hls.finish();
                }
            }
        });
    }
}

impl<F: MakeSegmentMuxer> StreamLookup for Relay<F> {
    async fn get_stream(&self, id: &str) -> std::result::Result<Arc<Stream>, RegistryError> {
        self.registry.get_stream(id).await
    }
}

impl<F: MakeSegmentMuxer> HlsLookup for Relay<F> {
    /// Return the HLS buffer of `id`, starting a relay for it if needed.
    ///
    /// A finished buffer keeps being served, even after its stream is gone,
    /// until registry cleanup or the next publish of `id` drops it.
    async fn get_hls_buffer(&self, id: &str) -> Result<Arc<HlsBuffer>> {
        if let Some(hls) = self.registry.hls_buffer(id).await {
            return Ok(hls);
        }

        let stream = self.registry.get_stream(id).await?;
        let (hls, created) = self.registry.get_or_create_hls_buffer(id).await;
        if created {
            self.spawn_hls_relay(stream, Arc::clone(&hls));
        }
        Ok(hls)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::Error;
    use crate::hls::segmenter::tests::ConcatMuxer;
    use crate::hls::HlsConfig;
    use crate::stream::ingest::tests::PacketsDemuxer;
    use crate::stream::playout::tests::RecordingMuxer;

    fn concat(_id: &str) -> Box<dyn SegmentMuxer> {
        Box::new(ConcatMuxer::default())
    }

    fn relay() -> Arc<Relay<fn(&str) -> Box<dyn SegmentMuxer>>> {
        let config = RegistryConfig::default().hls(
            HlsConfig::default()
                .target_duration(Duration::from_secs(1))
                .wait_timeout(Duration::from_secs(2)),
        );
        Arc::new(Relay::with_config(config, concat as fn(&str) -> Box<dyn SegmentMuxer>))
    }

    #[tokio::test]
    async fn test_publish_registers_and_unregisters() {
        let relay = relay();

        let mut demuxer = PacketsDemuxer::new(50);
        demuxer.interval = Some(Duration::from_millis(1));

        let publisher = {
            let relay = Arc::clone(&relay);
            tokio::spawn(async move {
                relay
                    .publish("live", &mut demuxer, &CancellationToken::new())
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(relay.stream_ids().await, vec!["live"]);

        assert!(publisher.await.unwrap().is_ok());
        assert!(relay.stream_ids().await.is_empty());
    }

    #[tokio::test]
    async fn test_second_publisher_rejected() {
        let relay = relay();
        let _stream = relay.registry().create_stream("live").await.unwrap();

        let err = relay
            .publish("live", &mut PacketsDemuxer::new(1), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Registry(RegistryError::StreamAlreadyPublishing(_))
        ));

        // The first publisher keeps its stream
        assert_eq!(relay.registry().stream_count().await, 1);
    }

    #[tokio::test]
    async fn test_rejected_publish_close_fails() {
        let relay = relay();
        let _stream = relay.registry().create_stream("live").await.unwrap();

        let mut demuxer = PacketsDemuxer::new(1);
        demuxer.fail_close = true;
        let err = relay
            .publish("live", &mut demuxer, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Registry(RegistryError::StreamAlreadyPublishing(_))
        ));
        assert!(demuxer.closed);
        assert_eq!(demuxer.sent, 0);
    }

    #[tokio::test]
    async fn test_rtmp_viewer_follows_publisher() {
        let relay = relay();

        let mut demuxer = PacketsDemuxer::new(40);
        demuxer.interval = Some(Duration::from_millis(2));

        let publisher = {
            let relay = Arc::clone(&relay);
            tokio::spawn(async move {
                relay
                    .publish("live", &mut demuxer, &CancellationToken::new())
                    .await
            })
        };

        // Wait for the stream to appear before joining
        while relay.registry().get_stream("live").await.is_err() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        let mut muxer = RecordingMuxer::default();
        relay
            .play_rtmp("live", &mut muxer, &CancellationToken::new())
            .await
            .unwrap();
        publisher.await.unwrap().unwrap();

        assert_eq!(muxer.headers, 1);
        assert_eq!(muxer.trailers, 1);
        assert_eq!(muxer.packets.last(), Some(&(39 * 33)));
    }

    #[tokio::test]
    async fn test_hls_for_unknown_stream() {
        let relay = relay();
        let err = relay
            .play_hls("/stream/missing.m3u8", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(relay.registry().hls_count().await, 0);
    }

    #[tokio::test]
    async fn test_hls_relay_started_on_first_request() {
        let relay = relay();
        let stream = relay.registry().create_stream("live").await.unwrap();

        let first = relay.get_hls_buffer("live").await.unwrap();
        let second = relay.get_hls_buffer("live").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        // Feed the stream directly; the relay task segments it
        stream
            .write_rtmp_to_stream(&CancellationToken::new(), &mut PacketsDemuxer::new(100))
            .await
            .unwrap();

        let cancel = CancellationToken::new();
        let segment = relay.play_hls("/stream/live_0.ts", &cancel).await.unwrap();
        assert_eq!(segment.body.len(), 60 * 2);

        // The relay finished on the trailer; wait until the end is published
        let playlist = loop {
            let response = relay.play_hls("/stream/live.m3u8", &cancel).await.unwrap();
            let text = String::from_utf8(response.body.to_vec()).unwrap();
            if text.contains("#EXT-X-ENDLIST") {
                break text;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        };
        assert!(playlist.contains("live_1.ts\n"));

        // The finished buffer is still served after the stream goes away
        relay.registry().unregister_stream(&stream).await;
        let lingering = relay.get_hls_buffer("live").await.unwrap();
        assert!(Arc::ptr_eq(&first, &lingering));

        // A new publish of the same id starts from scratch
        relay
            .publish("live", &mut PacketsDemuxer::new(1), &cancel)
            .await
            .unwrap();
        assert!(relay.registry().hls_buffer("live").await.is_none());
    }

    #[tokio::test]
    async fn test_shutdown_stops_hls_relay() {
        let relay = relay();
        relay.registry().create_stream("live").await.unwrap();

        let hls = relay.get_hls_buffer("live").await.unwrap();
        relay.shutdown();

        let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
        while hls.finished_at().is_none() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(hls.finished_at().is_some());
    }
}
