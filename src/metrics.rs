//! Pipeline observability counters.
//!
//! `PipelineMetrics` is an injected port rather than a process-wide
//! singleton: the embedding server constructs one and hands an `Arc` to
//! the bus and consumers, scoping the counters to its own lifetime. All
//! counters are lock-free atomics so incrementing on the hot path is
//! cheap and never blocks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Counters for the event pipeline: fan-out deliveries, drops, and
/// snapshot parse work.
#[derive(Debug)]
pub struct PipelineMetrics {
    events_processed: AtomicU64,
    events_dropped: AtomicU64,
    parse_count: AtomicU64,
    parse_nanos: AtomicU64,
    start_time: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            events_processed: AtomicU64::new(0),
            events_dropped: AtomicU64::new(0),
            parse_count: AtomicU64::new(0),
            parse_nanos: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record one successful enqueue into a subscriber queue.
    pub fn record_delivered(&self) {
        self.events_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one tick dropped because a subscriber queue was full.
    pub fn record_dropped(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the duration of one snapshot parse.
    pub fn record_parse(&self, duration: Duration) {
        self.parse_count.fetch_add(1, Ordering::Relaxed);
        self.parse_nanos
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    pub fn events_processed(&self) -> u64 {
        self.events_processed.load(Ordering::Relaxed)
    }

    pub fn events_dropped(&self) -> u64 {
        self.events_dropped.load(Ordering::Relaxed)
    }

    pub fn parse_count(&self) -> u64 {
        self.parse_count.load(Ordering::Relaxed)
    }

    /// Percentage of ticks dropped out of all fan-out attempts.
    pub fn drop_rate(&self) -> f64 {
        let processed = self.events_processed() as f64;
        let dropped = self.events_dropped() as f64;
        let total = processed + dropped;
        if total == 0.0 {
            return 0.0;
        }
        dropped / total * 100.0
    }

    /// Collect the current counters into a serializable report.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let parse_count = self.parse_count();
        let parse_nanos = self.parse_nanos.load(Ordering::Relaxed);
        let avg_parse_time_ms = if parse_count > 0 {
            parse_nanos as f64 / parse_count as f64 / 1_000_000.0
        } else {
            0.0
        };

        MetricsSnapshot {
            events_processed: self.events_processed(),
            events_dropped: self.events_dropped(),
            parse_count,
            avg_parse_time_ms,
            drop_rate: self.drop_rate(),
            uptime_seconds: self.start_time.elapsed().as_secs_f64(),
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of the pipeline counters, suitable for a stats
/// endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub events_processed: u64,
    pub events_dropped: u64,
    pub parse_count: u64,
    pub avg_parse_time_ms: f64,
    pub drop_rate: f64,
    pub uptime_seconds: f64,
}
