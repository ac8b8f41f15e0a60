//! HLS configuration

use std::time::Duration;

/// HLS buffer and segmenter configuration options
#[derive(Debug, Clone)]
pub struct HlsConfig {
    /// Number of segments kept in the buffer and listed in the playlist
    pub max_segments: usize,

    /// Minimum segment duration; segments are cut at the next keyframe after it
    pub target_duration: Duration,

    /// How long a playlist or segment request waits for it to be produced
    pub wait_timeout: Duration,
}

impl Default for HlsConfig {
    fn default() -> Self {
        Self {
            max_segments: 6,
            target_duration: Duration::from_secs(4),
            wait_timeout: Duration::from_secs(10),
        }
    }
}

impl HlsConfig {
    /// Set the segment window size (at least one segment)
    pub fn max_segments(mut self, max: usize) -> Self {
        self.max_segments = max.max(1);
        self
    }

    /// Set the target segment duration
    pub fn target_duration(mut self, duration: Duration) -> Self {
        self.target_duration = duration;
        self
    }

    /// Set the request wait timeout
    pub fn wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }
}
