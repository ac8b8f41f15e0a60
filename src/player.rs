//! Playback sessions
//!
//! Entry points for the two viewer kinds. Both resolve their stream through a
//! lookup trait, so they work against a `StreamRegistry`, a `Relay` or a test
//! double.

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::hls::HlsRequest;
use crate::registry::{HlsLookup, StreamLookup};
use crate::stream::Muxer;

/// Body and content type for an HLS HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HlsResponse {
    /// `Content-Type` header value
    pub content_type: &'static str,
    /// Playlist text or segment bytes
    pub body: Bytes,
}

/// Serve one RTMP viewer of stream `id` until the stream ends.
///
/// The muxer is closed whatever the outcome.
pub async fn play_rtmp<L, M>(
    lookup: &L,
    id: &str,
    muxer: &mut M,
    cancel: &CancellationToken,
) -> Result<()>
where
    L: StreamLookup,
    M: Muxer,
{
    let stream = match lookup.get_stream(id).await {
        Ok(stream) => stream,
        Err(e) => {
            if let Err(e) = muxer.close().await {
                tracing::debug!(stream = %id, error = %e, "Failed to close viewer connection");
            }
            return Err(e.into());
        }
    };

    tracing::info!(stream = %id, "Viewer joined");
    let result = stream.read_rtmp_from_stream(cancel, muxer).await;

    if let Err(e) = muxer.close().await {
        tracing::debug!(stream = %id, error = %e, "Failed to close viewer connection");
    }

    match &result {
        Ok(()) => tracing::info!(stream = %id, "Viewer finished"),
        Err(e) if e.is_disconnect() => tracing::info!(stream = %id, reason = %e, "Viewer left"),
        Err(e) => tracing::warn!(stream = %id, error = %e, "Viewer failed"),
    }
    result
}

/// Answer one HLS HTTP request.
///
/// Blocks until the requested playlist or segment exists, the HLS wait
/// timeout passes, or `cancel` fires.
pub async fn play_hls<L: HlsLookup>(
    lookup: &L,
    path: &str,
    cancel: &CancellationToken,
) -> Result<HlsResponse> {
    let request = HlsRequest::parse(path)?;
    let hls = lookup.get_hls_buffer(request.stream_id()).await?;

    let body = match &request {
        HlsRequest::Playlist { .. } => {
            Bytes::from(hls.wait_and_pop_playlist(cancel).await?.encode())
        }
        HlsRequest::Segment { name, .. } => hls.wait_and_pop_segment(cancel, name).await?,
    };

    tracing::trace!(path = %path, bytes = body.len(), "HLS request served");
    Ok(HlsResponse {
        content_type: request.content_type(),
        body,
    })
}
