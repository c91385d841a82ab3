//! # Metrics
//!
//! Counters are recorded through the injected [`MetricsSink`] trait so
//! simulation code never decides how or when numbers are reported.
//! [`CounterMetrics`] is the built-in sink: lock-free atomics that can be shared
//! with the sync thread. [`MetricsReporter`] periodically logs a snapshot.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use web_time::{Duration, Instant};

/// The counters the runtime records.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Counter {
    ChunksGenerated,
    ChunksRestoredFromCache,
    ChunksEvicted,
    GenerationFailures,
    BlocksPlaced,
    BlocksBroken,
    InteractionsRejected,
    SyncBatchesSent,
    SyncFailures,
    ViewpointNotifications,
}

const COUNTER_COUNT: usize = 10;

impl Counter {
    fn slot(self) -> usize {
        self as usize
    }
}

/// Destination for counter increments.
pub trait MetricsSink: Send + Sync {
    /// Adds `amount` to `counter`.
    fn record(&self, counter: Counter, amount: u64);

    /// Adds one to `counter`.
    fn increment(&self, counter: Counter) {
        self.record(counter, 1);
    }
}

/// Atomic counters.
#[derive(Debug, Default)]
pub struct CounterMetrics {
    values: [AtomicU64; COUNTER_COUNT],
}

impl CounterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of one counter.
    pub fn get(&self, counter: Counter) -> u64 {
        self.values[counter.slot()].load(Ordering::Relaxed)
    }

    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            chunks_generated: self.get(Counter::ChunksGenerated),
            chunks_restored_from_cache: self.get(Counter::ChunksRestoredFromCache),
            chunks_evicted: self.get(Counter::ChunksEvicted),
            generation_failures: self.get(Counter::GenerationFailures),
            blocks_placed: self.get(Counter::BlocksPlaced),
            blocks_broken: self.get(Counter::BlocksBroken),
            interactions_rejected: self.get(Counter::InteractionsRejected),
            sync_batches_sent: self.get(Counter::SyncBatchesSent),
            sync_failures: self.get(Counter::SyncFailures),
            viewpoint_notifications: self.get(Counter::ViewpointNotifications),
        }
    }
}

impl MetricsSink for CounterMetrics {
    fn record(&self, counter: Counter, amount: u64) {
        self.values[counter.slot()].fetch_add(amount, Ordering::Relaxed);
    }
}

/// Serializable copy of all counters.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub chunks_generated: u64,
    pub chunks_restored_from_cache: u64,
    pub chunks_evicted: u64,
    pub generation_failures: u64,
    pub blocks_placed: u64,
    pub blocks_broken: u64,
    pub interactions_rejected: u64,
    pub sync_batches_sent: u64,
    pub sync_failures: u64,
    pub viewpoint_notifications: u64,
}

/// Logs a metrics snapshot at a fixed interval.
pub struct MetricsReporter {
    interval: Duration,
    last_report: Option<Instant>,
}

impl MetricsReporter {
    pub fn new(interval: Duration) -> Self {
        MetricsReporter {
            interval,
            last_report: None,
        }
    }

    /// Emits a snapshot if the interval has passed since the last one.
    ///
    /// The first call only starts the clock.
    ///
    /// # Returns
    /// The snapshot that was logged, if any.
    pub fn poll(&mut self, metrics: &CounterMetrics, now: Instant) -> Option<MetricsSnapshot> {
        let Some(last) = self.last_report else {
            self.last_report = Some(now);
            return None;
        };
        if now.saturating_duration_since(last) < self.interval {
            return None;
        }
        self.last_report = Some(now);

        let snapshot = metrics.snapshot();
        match serde_json::to_string(&snapshot) {
            Ok(json) => log::info!("metrics {json}"),
            Err(err) => log::warn!("could not serialize metrics snapshot: {err}"),
        }
        Some(snapshot)
    }
}
