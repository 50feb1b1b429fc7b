//! Pipeline configuration

use std::time::Duration;

/// Tunables for the perception-to-control pipeline.
///
/// The stale timeout and the confidence threshold are deployment-tuned
/// values; defaults match a ~30Hz perception source feeding a ~60Hz loop.
#[derive(Clone, Copy, Debug)]
pub struct PipelineConfig {
    /// Samples below this confidence are suppressed at the source.
    pub confidence_threshold: f32,
    /// No sample within this window triggers the hold-last-position policy.
    pub stale_timeout: Duration,
    /// Catch-up window after a stale period; one nominal perception interval.
    pub resume_blend: Duration,
    /// Target engine tick interval.
    pub tick_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            confidence_threshold: 0.5,
            stale_timeout: Duration::from_millis(500),
            resume_blend: Duration::from_millis(33),
            tick_interval: Duration::from_micros(16_667),
        }
    }
}

impl PipelineConfig {
    /// Configuration for low-light captures where confidence runs lower.
    pub fn low_confidence_source() -> Self {
        PipelineConfig {
            confidence_threshold: 0.3,
            stale_timeout: Duration::from_millis(700),
            ..PipelineConfig::default()
        }
    }
}
