//! Feed metrics and timing
//!
//! Counters and histograms go through the `metrics` facade; they are no-ops
//! unless the binary installs a recorder (the `metrics` feature).

use std::time::{Duration, Instant};

use crate::models::SwipeDirection;

pub const SWIPES_RECORDED: &str = "swipefeed_swipes_recorded_total";
pub const SWIPES_DEDUPLICATED: &str = "swipefeed_swipes_deduplicated_total";
pub const FEED_SIZE: &str = "swipefeed_feed_size";
pub const FEED_DURATION: &str = "swipefeed_feed_duration_seconds";

pub fn record_swipe(direction: SwipeDirection) {
    metrics::counter!(SWIPES_RECORDED, "direction" => direction.as_str()).increment(1);
}

pub fn record_deduplicated_swipe(direction: SwipeDirection) {
    metrics::counter!(SWIPES_DEDUPLICATED, "direction" => direction.as_str()).increment(1);
}

pub fn record_feed(size: usize, elapsed: Duration) {
    metrics::histogram!(FEED_SIZE).record(size as f64);
    metrics::histogram!(FEED_DURATION).record(elapsed.as_secs_f64());
}

/// Performance timer for tracking operation duration
pub struct PerformanceTimer {
    start: Instant,
    label: &'static str,
}

impl PerformanceTimer {
    pub fn new(label: &'static str) -> Self {
        Self {
            start: Instant::now(),
            label,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    pub fn log_if_slow(&self, threshold: Duration) {
        let elapsed = self.elapsed();
        if elapsed > threshold {
            tracing::warn!(
                "⚠️ Slow operation: {} took {}ms (threshold: {}ms)",
                self.label,
                elapsed.as_millis(),
                threshold.as_millis()
            );
        }
    }
}

impl Drop for PerformanceTimer {
    fn drop(&mut self) {
        tracing::debug!("⏱️ {} completed in {}ms", self.label, self.elapsed_ms());
    }
}
