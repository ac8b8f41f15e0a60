//! Registry configuration

use std::time::Duration;

use crate::hls::HlsConfig;
use crate::stream::StreamConfig;

/// Registry configuration options
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Configuration for every stream created by the registry
    pub stream: StreamConfig,

    /// Configuration for every HLS buffer created by the registry
    pub hls: HlsConfig,

    /// How long a finished HLS buffer keeps serving its last playlist and
    /// segments before cleanup drops it
    pub hls_linger: Duration,

    /// How often the background cleanup task runs
    pub cleanup_interval: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            stream: StreamConfig::default(),
            hls: HlsConfig::default(),
            hls_linger: Duration::from_secs(30),
            cleanup_interval: Duration::from_secs(10),
        }
    }
}

impl RegistryConfig {
    /// Set the stream configuration
    pub fn stream(mut self, config: StreamConfig) -> Self {
        self.stream = config;
        self
    }

    /// Set the HLS configuration
    pub fn hls(mut self, config: HlsConfig) -> Self {
        self.hls = config;
        self
    }

    /// Set how long finished HLS buffers are kept
    pub fn hls_linger(mut self, linger: Duration) -> Self {
        self.hls_linger = linger;
        self
    }

    /// Set the cleanup interval
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();
        assert_eq!(config.hls_linger, Duration::from_secs(30));
        assert_eq!(config.cleanup_interval, Duration::from_secs(10));
        assert_eq!(config.hls.max_segments, 6);
    }

    #[test]
    fn test_builder_chaining() {
        let config = RegistryConfig::default()
            .stream(StreamConfig::default().stall_timeout(Duration::from_millis(200)))
            .hls(HlsConfig::default().max_segments(3))
            .hls_linger(Duration::ZERO)
            .cleanup_interval(Duration::from_secs(1));

        assert_eq!(config.stream.stall_timeout, Duration::from_millis(200));
        assert_eq!(config.hls.max_segments, 3);
        assert_eq!(config.hls_linger, Duration::ZERO);
        assert_eq!(config.cleanup_interval, Duration::from_secs(1));
    }
}
