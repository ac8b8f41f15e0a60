//! Buffer statistics

/// Snapshot of a stream buffer's counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferStats {
    /// Items pushed since creation
    pub pushed: u64,
    /// Items dropped by eviction
    pub evicted: u64,
    /// Items currently retained
    pub retained: usize,
    /// Times a consumer fell behind eviction and was moved to the window start
    pub resyncs: u64,
    /// Whether a header is cached for new consumers
    pub has_header: bool,
    /// Whether a consumer drained the trailer and the buffer was cleared
    pub finished: bool,
}

impl BufferStats {
    /// Fraction of pushed items that were evicted, as a percentage
    pub fn eviction_rate(&self) -> f32 {
        if self.pushed > 0 {
            (self.evicted as f32 / self.pushed as f32) * 100.0
        } else {
            0.0
        }
    }
}
