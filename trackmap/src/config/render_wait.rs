//! Render readiness timing configuration.

use std::time::Duration;

use super::defaults::{
    DEFAULT_MAX_CHECKS, DEFAULT_POLL_INTERVAL, DEFAULT_SETTLE_DELAY, DEFAULT_SLICE_HEIGHT,
    DEFAULT_STRIDE, DEFAULT_TILE_WAIT_CHECKS,
};

/// Timing knobs for waiting on an asynchronous rendering surface.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use trackmap::config::RenderWaitConfig;
///
/// let config = RenderWaitConfig::new()
///     .with_poll_interval(Duration::from_millis(50))
///     .with_max_checks(20);
/// assert_eq!(config.max_checks(), 20);
/// assert_eq!(config.stride(), 7);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderWaitConfig {
    poll_interval: Duration,
    max_checks: u32,
    settle_delay: Duration,
    target_slice_height: u32,
    stride: u32,
    tile_wait_checks: u32,
}

impl RenderWaitConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the delay between two readiness checks. Default: 100ms.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the number of checks before giving up on content. Default: 50.
    ///
    /// Zero is raised to one so that at least one slice is sampled.
    pub fn with_max_checks(mut self, checks: u32) -> Self {
        self.max_checks = checks.max(1);
        self
    }

    /// Set the delay applied after content is first detected. Default: 150ms.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Set the desired slice height in pixels. Default: 100.
    pub fn with_target_slice_height(mut self, height: u32) -> Self {
        self.target_slice_height = height.max(1);
        self
    }

    /// Set the stride between sampled slices. Default: 7.
    pub fn with_stride(mut self, stride: u32) -> Self {
        self.stride = stride.max(1);
        self
    }

    /// Set the base poll budget for imagery tiles. Default: 300.
    pub fn with_tile_wait_checks(mut self, checks: u32) -> Self {
        self.tile_wait_checks = checks;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn max_checks(&self) -> u32 {
        self.max_checks
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    pub fn target_slice_height(&self) -> u32 {
        self.target_slice_height
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    pub fn tile_wait_checks(&self) -> u32 {
        self.tile_wait_checks
    }
}

impl Default for RenderWaitConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_checks: DEFAULT_MAX_CHECKS,
            settle_delay: DEFAULT_SETTLE_DELAY,
            target_slice_height: DEFAULT_SLICE_HEIGHT,
            stride: DEFAULT_STRIDE,
            tile_wait_checks: DEFAULT_TILE_WAIT_CHECKS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RenderWaitConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.max_checks(), 50);
        assert_eq!(config.settle_delay(), Duration::from_millis(150));
        assert_eq!(config.target_slice_height(), 100);
        assert_eq!(config.stride(), 7);
        assert_eq!(config.tile_wait_checks(), 300);
    }

    #[test]
    fn test_new_equals_default() {
        assert_eq!(RenderWaitConfig::new(), RenderWaitConfig::default());
    }

    #[test]
    fn test_builders_leave_other_fields_unchanged() {
        let config = RenderWaitConfig::new().with_stride(3);
        assert_eq!(config.stride(), 3);
        assert_eq!(config.max_checks(), DEFAULT_MAX_CHECKS);
        assert_eq!(config.poll_interval(), DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn test_zero_values_are_raised() {
        let config = RenderWaitConfig::new()
            .with_max_checks(0)
            .with_stride(0)
            .with_target_slice_height(0);
        assert_eq!(config.max_checks(), 1);
        assert_eq!(config.stride(), 1);
        assert_eq!(config.target_slice_height(), 1);
    }
}
