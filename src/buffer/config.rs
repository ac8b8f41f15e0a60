//! Stream buffer configuration

/// Default number of items retained before eviction kicks in
pub const DEFAULT_MAX_ITEMS: usize = 2048;

/// Stream buffer configuration options
#[derive(Debug, Clone)]
pub struct BufferConfig {
    /// Item count above which the buffer evicts up to the latest keyframe
    pub max_items: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            max_items: DEFAULT_MAX_ITEMS,
        }
    }
}

impl BufferConfig {
    /// Set the eviction threshold (at least one item)
    pub fn max_items(mut self, max: usize) -> Self {
        self.max_items = max.max(1);
        self
    }
}
