//! HLS buffer
//!
//! Holds the latest playlist and a bounded window of named segments for one
//! output stream. HTTP clients ask for segments by name, often before the
//! segmenter has produced them, so lookups block until the segment shows up,
//! the wait times out, or the request is cancelled.

use std::collections::HashMap;
use std::time::Instant;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::buffer::stream_buffer::{deadline_after, sleep_until};
use crate::error::{Error, Result};

use super::config::HlsConfig;
use super::playlist::{MediaPlaylist, PlaylistEntry};
use super::segmenter::Segment;

#[derive(Debug)]
struct Inner {
    playlist: MediaPlaylist,
    /// Whether a playlist has been published yet
    published: bool,
    segments: HashMap<String, Bytes>,
    finished_at: Option<Instant>,
}

/// Latest playlist plus the most recent segments of one stream
#[derive(Debug)]
pub struct HlsBuffer {
    inner: Mutex<Inner>,
    notify: Notify,
    config: HlsConfig,
}

impl HlsBuffer {
    /// Create an HLS buffer with default configuration
    pub fn new() -> Self {
        Self::with_config(HlsConfig::default())
    }

    /// Create an HLS buffer with custom configuration
    pub fn with_config(config: HlsConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                playlist: MediaPlaylist::new(config.target_duration),
                published: false,
                segments: HashMap::new(),
                finished_at: None,
            }),
            notify: Notify::new(),
            config,
        }
    }

    /// Get the buffer configuration
    pub fn config(&self) -> &HlsConfig {
        &self.config
    }

    /// Store a new segment and republish the playlist
    ///
    /// Once more than `max_segments` are held, the oldest is dropped from both
    /// the store and the playlist.
    pub fn write_segment(&self, segment: Segment) {
        {
            let mut inner = self.inner.lock();
            let entry = PlaylistEntry {
                name: segment.name.clone(),
                duration: segment.duration,
            };
            inner.segments.insert(segment.name, segment.data);

            let dropped = inner.playlist.push(entry, self.config.max_segments);
            for name in &dropped {
                inner.segments.remove(name);
            }
            inner.published = true;

            if !dropped.is_empty() {
                tracing::trace!(dropped = ?dropped, "Evicted HLS segments");
            }
        }
        self.notify.notify_waiters();
    }

    /// Mark the stream as ended
    ///
    /// The playlist gets `#EXT-X-ENDLIST` and waits for segments that do not
    /// exist fail immediately instead of timing out.
    pub fn finish(&self) {
        {
            let mut inner = self.inner.lock();
            if inner.finished_at.is_some() {
                return;
            }
            inner.playlist.ended = true;
            inner.published = true;
            inner.finished_at = Some(Instant::now());
        }
        self.notify.notify_waiters();
    }

    /// Wait for the latest playlist
    ///
    /// Returns as soon as any playlist has been published. Playlists are not
    /// queued: the caller always gets the newest snapshot.
    pub async fn wait_and_pop_playlist(&self, cancel: &CancellationToken) -> Result<MediaPlaylist> {
        self.wait_for(cancel, |inner| {
            inner.published.then(|| inner.playlist.clone())
        })
        .await?
        .ok_or(Error::Timeout(self.config.wait_timeout))
    }

    /// Wait for the segment called `name`
    ///
    /// A segment that is not produced within the wait timeout fails with
    /// `Error::SegmentNotFound`; after `finish` that happens immediately.
    pub async fn wait_and_pop_segment(
        &self,
        cancel: &CancellationToken,
        name: &str,
    ) -> Result<Bytes> {
        let found = self
            .wait_for(cancel, |inner| match inner.segments.get(name) {
                Some(data) => Some(Some(data.clone())),
                None if inner.finished_at.is_some() => Some(None),
                None => None,
            })
            .await?;

        found
            .flatten()
            .ok_or_else(|| Error::SegmentNotFound(name.to_string()))
    }

    /// Current playlist without waiting
    pub fn playlist(&self) -> Option<MediaPlaylist> {
        let inner = self.inner.lock();
        inner.published.then(|| inner.playlist.clone())
    }

    /// Number of segments held
    pub fn segment_count(&self) -> usize {
        self.inner.lock().segments.len()
    }

    /// When `finish` was called, if it was
    pub fn finished_at(&self) -> Option<Instant> {
        self.inner.lock().finished_at
    }

    /// Poll `check` on every change until it yields a value, the wait timeout
    /// passes (`Ok(None)`) or `cancel` fires.
    async fn wait_for<T>(
        &self,
        cancel: &CancellationToken,
        mut check: impl FnMut(&Inner) -> Option<T>,
    ) -> Result<Option<T>> {
        let deadline = deadline_after(self.config.wait_timeout);

        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let found = {
                let inner = self.inner.lock();
                check(&inner)
            };
            if found.is_some() {
                return Ok(found);
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                _ = sleep_until(deadline) => return Ok(None),
            }
        }
    }
}

impl Default for HlsBuffer {
    fn default() -> Self {
        Self::new()
    }
}
