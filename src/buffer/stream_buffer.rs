//! Bounded media log with per-consumer cursors

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::media::{CodecData, MediaItem};

use super::config::BufferConfig;
use super::stats::BufferStats;

/// Read position of one consumer
///
/// A fresh cursor has not seen the header yet. The buffer hands it the cached
/// header first and then the retained window from its start.
#[derive(Debug, Clone, Default)]
pub struct Cursor {
    next: Option<u64>,
    /// Buffer generation this cursor is reading
    generation: u64,
}

impl Cursor {
    /// Create a cursor that starts with the stream header
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence number of the next item this cursor will read, if started
    pub fn position(&self) -> Option<u64> {
        self.next
    }
}

#[derive(Debug, Default)]
struct Inner {
    items: VecDeque<MediaItem>,
    /// Sequence number of `items[0]`
    head: u64,
    /// Kept outside the window so eviction never loses it
    header: Option<CodecData>,
    /// Set from the latest header; every packet is an entry point without video
    audio_only: bool,
    /// Bumped each time a drained trailer clears the buffer
    generation: u64,
    finished: bool,
    pushed: u64,
    evicted: u64,
    resyncs: u64,
}

impl Inner {
    fn push(&mut self, item: MediaItem, max_items: usize) -> usize {
        self.finished = false;
        if let MediaItem::Header(codec) = &item {
            self.audio_only = !codec.has_video();
            self.header = Some(codec.clone());
        }
        self.items.push_back(item);
        self.pushed += 1;

        if self.items.len() > max_items {
            self.evict(max_items)
        } else {
            0
        }
    }

    /// Drop everything before the most recent keyframe.
    ///
    /// Audio-only streams have no keyframes; any packet is decodable, so just
    /// the overflow is dropped.
    fn evict(&mut self, max_items: usize) -> usize {
        let cut = if self.audio_only {
            Some(self.items.len() - max_items)
        } else {
            self.items.iter().rposition(MediaItem::is_keyframe)
        };

        match cut {
            Some(idx) if idx > 0 => {
                self.items.drain(..idx);
                self.head += idx as u64;
                self.evicted += idx as u64;
                idx
            }
            _ => 0,
        }
    }

    fn next_for(&mut self, cursor: &mut Cursor) -> Option<MediaItem> {
        let Some(mut next) = cursor.next else {
            let codec = self.header.clone()?;
            let skip = matches!(self.items.front(), Some(MediaItem::Header(_)));
            cursor.next = Some(self.head + u64::from(skip));
            cursor.generation = self.generation;
            return Some(MediaItem::Header(codec));
        };

        // Another consumer drained the trailer of the generation this cursor
        // was reading
        if cursor.generation != self.generation {
            cursor.next = Some(self.head);
            cursor.generation = self.generation;
            return Some(MediaItem::Trailer);
        }

        if next < self.head {
            tracing::debug!(
                behind = self.head - next,
                head = self.head,
                "Consumer fell behind eviction, resyncing at window start"
            );
            self.resyncs += 1;
            next = self.head;
            cursor.next = Some(next);
        }

        let item = self.items.get((next - self.head) as usize)?.clone();
        cursor.next = Some(next + 1);

        if item.is_trailer() {
            self.clear();
            cursor.generation = self.generation;
        }
        Some(item)
    }

    fn clear(&mut self) {
        self.head += self.items.len() as u64;
        self.items.clear();
        self.header = None;
        self.generation += 1;
        self.finished = true;
    }
}

/// Bounded, ordered log of media items shared by one producer and any number
/// of consumers.
///
/// Items are not removed when read; each consumer advances its own `Cursor`.
/// The one exception is the trailer: the consumer that drains it clears the
/// buffer, and consumers still behind it observe a trailer on their next pop.
#[derive(Debug)]
pub struct StreamBuffer {
    inner: Mutex<Inner>,
    notify: Notify,
    config: BufferConfig,
}

impl StreamBuffer {
    /// Create a buffer with default configuration
    pub fn new() -> Self {
        Self::with_config(BufferConfig::default())
    }

    /// Create a buffer with custom configuration
    pub fn with_config(config: BufferConfig) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            notify: Notify::new(),
            config,
        }
    }

    /// Get the buffer configuration
    pub fn config(&self) -> &BufferConfig {
        &self.config
    }

    /// Append an item and wake every waiting consumer
    ///
    /// When the item count exceeds `max_items`, everything before the most
    /// recent keyframe is evicted, so the window always starts on a decodable
    /// entry point. Without a keyframe to anchor on nothing is evicted, unless
    /// the header declares no video track: then the oldest packets go.
    ///
    /// Pushing after a trailer was drained starts a new generation. Cursors
    /// left in the old one still get a trailer before reading it.
    pub fn push(&self, item: impl Into<MediaItem>) {
        let evicted = self.inner.lock().push(item.into(), self.config.max_items);
        if evicted > 0 {
            tracing::debug!(evicted = evicted, "Evicted buffered items");
        }
        self.notify.notify_waiters();
    }

    /// Return the next item for `cursor` without waiting
    pub fn try_pop(&self, cursor: &mut Cursor) -> Result<MediaItem> {
        self.inner
            .lock()
            .next_for(cursor)
            .ok_or(Error::BufferEmpty)
    }

    /// Wait for the next item for `cursor`
    ///
    /// Fails with `Error::Timeout` when nothing arrives within `wait` and with
    /// `Error::Cancelled` when `cancel` fires. A failed pop leaves the cursor
    /// where it was.
    pub async fn pop(
        &self,
        cursor: &mut Cursor,
        cancel: &CancellationToken,
        wait: Duration,
    ) -> Result<MediaItem> {
        let deadline = deadline_after(wait);

        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a push between check and await is not missed
            notified.as_mut().enable();

            let next = self.inner.lock().next_for(cursor);
            if let Some(item) = next {
                return Ok(item);
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                _ = sleep_until(deadline) => return Err(Error::Timeout(wait)),
            }
        }
    }

    /// Number of retained items
    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    /// Whether no items are retained
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The cached stream header, if one has been pushed
    pub fn header(&self) -> Option<CodecData> {
        self.inner.lock().header.clone()
    }

    /// Whether a consumer has drained the trailer
    pub fn is_finished(&self) -> bool {
        self.inner.lock().finished
    }

    /// Get buffer statistics
    pub fn stats(&self) -> BufferStats {
        let inner = self.inner.lock();
        BufferStats {
            pushed: inner.pushed,
            evicted: inner.evicted,
            retained: inner.items.len(),
            resyncs: inner.resyncs,
            has_header: inner.header.is_some(),
            finished: inner.finished,
        }
    }
}

impl Default for StreamBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Deadline `wait` from now; `None` when it lies beyond what `Instant` holds.
pub(crate) fn deadline_after(wait: Duration) -> Option<Instant> {
    Instant::now().checked_add(wait)
}

/// Sleep until `deadline`, or forever without one.
pub(crate) async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::media::{Packet, TrackInfo};

    const WAIT: Duration = Duration::from_millis(50);

    fn header() -> MediaItem {
        MediaItem::Header(CodecData::new(vec![TrackInfo::video(
            "h264",
            Bytes::from_static(&[0x01, 0x64]),
        )]))
    }

    fn packet(timestamp: u32, is_keyframe: bool) -> MediaItem {
        MediaItem::Packet(Packet::video(
            timestamp,
            Bytes::from_static(&[0x00, 0x00]),
            is_keyframe,
        ))
    }

    fn timestamp(item: &MediaItem) -> u32 {
        match item {
            MediaItem::Packet(p) => p.timestamp,
            other => panic!("expected packet, got {}", other.kind()),
        }
    }

    #[test]
    fn test_push_pop_in_order() {
        let buffer = StreamBuffer::new();
        buffer.push(header());
        buffer.push(packet(0, true));
        buffer.push(packet(33, false));
        buffer.push(MediaItem::Trailer);

        assert_eq!(buffer.len(), 4);

        let mut cursor = Cursor::new();
        assert!(matches!(buffer.try_pop(&mut cursor), Ok(MediaItem::Header(_))));
        assert_eq!(timestamp(&buffer.try_pop(&mut cursor).unwrap()), 0);
        assert_eq!(timestamp(&buffer.try_pop(&mut cursor).unwrap()), 33);
        assert!(buffer.try_pop(&mut cursor).unwrap().is_trailer());
    }

    #[test]
    fn test_try_pop_empty() {
        let buffer = StreamBuffer::new();
        let mut cursor = Cursor::new();

        assert!(matches!(buffer.try_pop(&mut cursor), Err(Error::BufferEmpty)));
        assert!(cursor.position().is_none());

        buffer.push(header());
        assert_ok!(buffer.try_pop(&mut cursor));
        assert!(matches!(buffer.try_pop(&mut cursor), Err(Error::BufferEmpty)));
    }

    #[test]
    fn test_reads_do_not_consume() {
        let buffer = StreamBuffer::new();
        buffer.push(header());
        buffer.push(packet(0, true));

        let mut first = Cursor::new();
        let mut second = Cursor::new();
        assert_ok!(buffer.try_pop(&mut first));
        assert_ok!(buffer.try_pop(&mut first));

        assert!(matches!(buffer.try_pop(&mut second), Ok(MediaItem::Header(_))));
        assert_eq!(timestamp(&buffer.try_pop(&mut second).unwrap()), 0);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_trailer_clears_buffer() {
        let buffer = StreamBuffer::new();
        buffer.push(header());
        for i in 0..10 {
            buffer.push(packet(i * 33, i == 0));
        }
        buffer.push(MediaItem::Trailer);
        assert_eq!(buffer.len(), 12);

        let mut cursor = Cursor::new();
        while !buffer.try_pop(&mut cursor).unwrap().is_trailer() {}

        assert_eq!(buffer.len(), 0);
        assert!(buffer.is_finished());
        assert!(buffer.header().is_none());
    }

    #[test]
    fn test_lagging_consumer_sees_trailer_after_clear() {
        let buffer = StreamBuffer::new();
        buffer.push(header());
        buffer.push(packet(0, true));
        buffer.push(packet(33, false));
        buffer.push(MediaItem::Trailer);

        let mut slow = Cursor::new();
        assert_ok!(buffer.try_pop(&mut slow));

        let mut fast = Cursor::new();
        while !buffer.try_pop(&mut fast).unwrap().is_trailer() {}

        assert!(buffer.try_pop(&mut slow).unwrap().is_trailer());
        assert!(matches!(buffer.try_pop(&mut slow), Err(Error::BufferEmpty)));
    }

    #[test]
    fn test_eviction_keeps_latest_keyframe() {
        let buffer = StreamBuffer::with_config(BufferConfig::default().max_items(5));
        buffer.push(header());
        buffer.push(packet(0, true));
        buffer.push(packet(33, false));
        buffer.push(packet(66, false));
        buffer.push(packet(100, true));
        assert_eq!(buffer.len(), 5);

        // Sixth item exceeds capacity: drop header, first GOP
        buffer.push(packet(133, false));
        assert_eq!(buffer.len(), 2);

        let stats = buffer.stats();
        assert_eq!(stats.evicted, 4);
        assert_eq!(stats.pushed, 6);
        assert!(stats.has_header);

        // Late joiner still gets the header, then lands on the keyframe
        let mut cursor = Cursor::new();
        assert!(matches!(buffer.try_pop(&mut cursor), Ok(MediaItem::Header(_))));
        let first = buffer.try_pop(&mut cursor).unwrap();
        assert!(first.is_keyframe());
        assert_eq!(timestamp(&first), 100);
    }

    #[test]
    fn test_no_eviction_without_keyframe() {
        let buffer = StreamBuffer::with_config(BufferConfig::default().max_items(3));
        buffer.push(header());
        for i in 0..5 {
            buffer.push(packet(i * 33, false));
        }

        // Nothing decodable to anchor on, so nothing is dropped
        assert_eq!(buffer.len(), 6);
        assert_eq!(buffer.stats().evicted, 0);
    }

    #[test]
    fn test_no_eviction_when_keyframe_at_head() {
        let buffer = StreamBuffer::with_config(BufferConfig::default().max_items(2));
        buffer.push(packet(0, true));
        buffer.push(packet(33, false));
        buffer.push(packet(66, false));

        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.stats().evicted, 0);
    }

    #[test]
    fn test_window_always_starts_on_entry_point() {
        let buffer = StreamBuffer::with_config(BufferConfig::default().max_items(4));
        buffer.push(header());
        for i in 0..50u32 {
            buffer.push(packet(i * 33, i % 7 == 0));

            let mut cursor = Cursor::new();
            assert_ok!(buffer.try_pop(&mut cursor));
            if let Ok(first) = buffer.try_pop(&mut cursor) {
                assert!(first.is_keyframe(), "window starts at {}", timestamp(&first));
            }
        }
    }

    #[test]
    fn test_lagging_consumer_resyncs_to_keyframe() {
        let buffer = StreamBuffer::with_config(BufferConfig::default().max_items(3));
        buffer.push(header());
        buffer.push(packet(0, true));

        let mut cursor = Cursor::new();
        assert_ok!(buffer.try_pop(&mut cursor));
        assert_eq!(timestamp(&buffer.try_pop(&mut cursor).unwrap()), 0);

        buffer.push(packet(33, false));
        buffer.push(packet(66, true));
        buffer.push(packet(100, false));

        // 33 was evicted before this consumer read it
        let next = buffer.try_pop(&mut cursor).unwrap();
        assert!(next.is_keyframe());
        assert_eq!(timestamp(&next), 66);
        assert_eq!(buffer.stats().resyncs, 1);
    }

    #[test]
    fn test_push_after_finish_starts_new_generation() {
        let buffer = StreamBuffer::new();
        buffer.push(header());
        buffer.push(MediaItem::Trailer);

        let mut cursor = Cursor::new();
        while !buffer.try_pop(&mut cursor).unwrap().is_trailer() {}
        assert!(buffer.is_finished());

        buffer.push(header());
        assert!(!buffer.is_finished());

        let mut fresh = Cursor::new();
        assert!(matches!(buffer.try_pop(&mut fresh), Ok(MediaItem::Header(_))));
        assert!(matches!(buffer.try_pop(&mut fresh), Err(Error::BufferEmpty)));
    }

    #[tokio::test]
    async fn test_pop_times_out() {
        let buffer = StreamBuffer::new();
        let mut cursor = Cursor::new();

        let start = std::time::Instant::now();
        let result = buffer.pop(&mut cursor, &CancellationToken::new(), WAIT).await;

        assert!(matches!(result, Err(Error::Timeout(d)) if d == WAIT));
        assert!(start.elapsed() >= WAIT);
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_pop_wakes_on_push() {
        let buffer = Arc::new(StreamBuffer::new());

        let producer = Arc::clone(&buffer);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            producer.push(header());
        });

        let mut cursor = Cursor::new();
        let item = buffer
            .pop(&mut cursor, &CancellationToken::new(), Duration::from_secs(5))
            .await;
        assert!(matches!(item, Ok(MediaItem::Header(_))));
    }

    #[tokio::test]
    async fn test_pop_cancelled_leaves_cursor() {
        let buffer = Arc::new(StreamBuffer::new());
        buffer.push(header());

        let mut cursor = Cursor::new();
        assert_ok!(buffer.try_pop(&mut cursor));
        let before = cursor.position();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = buffer
            .pop(&mut cursor, &cancel, Duration::from_secs(5))
            .await;
        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(cursor.position(), before);

        // The next packet is still there for this consumer
        buffer.push(packet(0, true));
        assert_eq!(timestamp(&buffer.try_pop(&mut cursor).unwrap()), 0);
    }

    #[tokio::test]
    async fn test_pop_already_cancelled() {
        let buffer = StreamBuffer::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut cursor = Cursor::new();
        assert_err!(buffer.pop(&mut cursor, &cancel, Duration::from_secs(5)).await);
    }

    #[test]
    fn test_audio_only_stays_bounded() {
        let buffer = StreamBuffer::with_config(BufferConfig::default().max_items(16));
        buffer.push(MediaItem::Header(CodecData::new(vec![TrackInfo::audio(
            "aac",
            Bytes::from_static(&[0x12, 0x10]),
        )])));
        for i in 0..1000u32 {
            buffer.push(Packet::audio(i * 23, Bytes::from_static(&[0xff])));
            assert!(buffer.len() <= 16);
        }

        assert_eq!(buffer.stats().evicted, 1001 - 16);

        // Late joiner gets the header, then the oldest retained packet
        let mut cursor = Cursor::new();
        assert!(matches!(buffer.try_pop(&mut cursor), Ok(MediaItem::Header(_))));
        assert_eq!(timestamp(&buffer.try_pop(&mut cursor).unwrap()), (1000 - 16) * 23);
    }

    #[test]
    fn test_stale_cursor_gets_trailer_of_its_generation() {
        let buffer = StreamBuffer::new();
        buffer.push(header());
        buffer.push(packet(0, true));
        buffer.push(MediaItem::Trailer);

        let mut slow = Cursor::new();
        assert_ok!(buffer.try_pop(&mut slow));

        let mut fast = Cursor::new();
        while !buffer.try_pop(&mut fast).unwrap().is_trailer() {}

        // A new publish reuses the buffer before the slow consumer catches up
        buffer.push(header());
        buffer.push(packet(0, true));
        assert!(!buffer.is_finished());

        assert!(buffer.try_pop(&mut slow).unwrap().is_trailer());
    }

    #[tokio::test]
    async fn test_pop_without_deadline_waits_for_cancel() {
        let buffer = StreamBuffer::new();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let mut cursor = Cursor::new();
        let result = buffer.pop(&mut cursor, &cancel, Duration::MAX).await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
