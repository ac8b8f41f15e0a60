//! Stream configuration

use std::time::Duration;

use crate::buffer::BufferConfig;

/// Default time a consumer waits for the next item before giving up
pub const DEFAULT_STALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-stream configuration options
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Maximum time a consumer blocks waiting for the next buffer item
    pub stall_timeout: Duration,

    /// Buffer configuration
    pub buffer: BufferConfig,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            stall_timeout: DEFAULT_STALL_TIMEOUT,
            buffer: BufferConfig::default(),
        }
    }
}

impl StreamConfig {
    /// Set the stall timeout
    pub fn stall_timeout(mut self, timeout: Duration) -> Self {
        self.stall_timeout = timeout;
        self
    }

    /// Set the buffer eviction threshold
    pub fn max_items(mut self, max: usize) -> Self {
        self.buffer = self.buffer.max_items(max);
        self
    }
}
