//! HLS media playlist
//!
//! A sliding-window live playlist. Entries are segment names relative to the
//! playlist URL, so `/stream/live.m3u8` lists `live_0.ts`, `live_1.ts`, ...

use std::collections::VecDeque;
use std::fmt::Write;
use std::time::Duration;

/// MIME type of an M3U8 playlist
pub const PLAYLIST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

/// One segment listed in a playlist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistEntry {
    /// Segment name (the URI written into the playlist)
    pub name: String,
    /// Segment duration
    pub duration: Duration,
}

/// Live media playlist snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPlaylist {
    /// Minimum target duration; raised to fit the longest segment when encoding
    pub target_duration: Duration,
    /// Sequence number of the first listed segment
    pub media_sequence: u64,
    /// Listed segments, oldest first
    pub entries: VecDeque<PlaylistEntry>,
    /// Whether the stream has ended (`#EXT-X-ENDLIST`)
    pub ended: bool,
}

impl MediaPlaylist {
    /// Create an empty playlist
    pub fn new(target_duration: Duration) -> Self {
        Self {
            target_duration,
            media_sequence: 0,
            entries: VecDeque::new(),
            ended: false,
        }
    }

    /// Append a segment, dropping the oldest ones beyond `window`.
    ///
    /// Returns the names of the dropped segments.
    pub fn push(&mut self, entry: PlaylistEntry, window: usize) -> Vec<String> {
        self.entries.push_back(entry);

        let mut dropped = Vec::new();
        while self.entries.len() > window {
            if let Some(old) = self.entries.pop_front() {
                self.media_sequence += 1;
                dropped.push(old.name);
            }
        }
        dropped
    }

    /// Whether a segment with this name is currently listed
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    /// `#EXT-X-TARGETDURATION` value in whole seconds
    pub fn target_duration_secs(&self) -> u64 {
        self.entries
            .iter()
            .map(|e| e.duration)
            .chain(std::iter::once(self.target_duration))
            .map(|d| d.as_millis().div_ceil(1000) as u64)
            .max()
            .unwrap_or(1)
            .max(1)
    }

    /// Encode as M3U8 text
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(128 + self.entries.len() * 48);

        out.push_str("#EXTM3U\n");
        out.push_str("#EXT-X-VERSION:3\n");
        let _ = writeln!(out, "#EXT-X-TARGETDURATION:{}", self.target_duration_secs());
        let _ = writeln!(out, "#EXT-X-MEDIA-SEQUENCE:{}", self.media_sequence);

        for entry in &self.entries {
            let _ = writeln!(out, "#EXTINF:{:.3},", entry.duration.as_secs_f64());
            out.push_str(&entry.name);
            out.push('\n');
        }

        if self.ended {
            out.push_str("#EXT-X-ENDLIST\n");
        }

        out
    }
}
