// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for the tier coordinator.
//!
//! Uses the `metrics` crate facade; the embedding application picks the
//! exporter. With no recorder installed every call is a no-op.
//!
//! # Metric Naming Convention
//! - `cache_tiers_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//! - `_bytes` suffix for sizes
//!
//! # Labels
//! - `tier`: fast, durable-small, durable-large
//! - `operation`: get, set, delete, clear, optimize
//! - `status`: success, error, rejected

use metrics::{counter, gauge, histogram};
use std::time::{Duration, Instant};

/// Record the outcome of a tier operation
pub fn record_operation(tier: &str, operation: &str, status: &str) {
    counter!(
        "cache_tiers_operations_total",
        "tier" => tier.to_string(),
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record operation latency
pub fn record_latency(tier: &str, operation: &str, duration: Duration) {
    histogram!(
        "cache_tiers_operation_seconds",
        "tier" => tier.to_string(),
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record a read served by `tier`
pub fn record_hit(tier: &str) {
    counter!("cache_tiers_hits_total", "tier" => tier.to_string()).increment(1);
}

/// Record a read that found nothing in any tier
pub fn record_miss() {
    counter!("cache_tiers_misses_total").increment(1);
}

/// Record an entry moving between tiers (`direction`: promote or demote)
pub fn record_move(direction: &str, from: &str, to: &str) {
    counter!(
        "cache_tiers_moves_total",
        "direction" => direction.to_string(),
        "from" => from.to_string(),
        "to" => to.to_string()
    )
    .increment(1);
}

/// Record a coordinator-initiated removal (`reason`: expired or capacity)
pub fn record_eviction(tier: &str, reason: &str, bytes: u64) {
    counter!(
        "cache_tiers_evictions_total",
        "tier" => tier.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
    counter!("cache_tiers_evicted_bytes_total", "tier" => tier.to_string()).increment(bytes);
}

/// Record a write refused because the entry exceeds its tier's limit
pub fn record_capacity_rejection(tier: &str) {
    counter!("cache_tiers_capacity_rejections_total", "tier" => tier.to_string()).increment(1);
}

/// Set bytes currently tracked in the fast tier
pub fn set_fast_tier_bytes(bytes: u64) {
    gauge!("cache_tiers_fast_tier_bytes").set(bytes as f64);
}

/// Set entry count for a tier
pub fn set_tier_entries(tier: &str, count: usize) {
    gauge!("cache_tiers_tier_entries", "tier" => tier.to_string()).set(count as f64);
}

/// Set current hit rate (0.0 - 1.0)
pub fn set_hit_rate(rate: f64) {
    gauge!("cache_tiers_hit_rate").set(rate);
}

/// Record one optimization sweep
pub fn record_optimization(duration: Duration, errors: usize) {
    histogram!("cache_tiers_optimize_seconds").record(duration.as_secs_f64());
    counter!("cache_tiers_optimize_runs_total").increment(1);
    if errors > 0 {
        counter!("cache_tiers_optimize_errors_total").increment(errors as u64);
    }
}

/// A timing guard that records latency on drop
pub struct LatencyTimer {
    tier: &'static str,
    operation: &'static str,
    start: Instant,
}

impl LatencyTimer {
    /// Start a new latency timer
    pub fn new(tier: &'static str, operation: &'static str) -> Self {
        Self {
            tier,
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        record_latency(self.tier, self.operation, self.start.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};

    fn counter_value(
        snapshot: &[(metrics_util::CompositeKey, Option<metrics::Unit>, Option<metrics::SharedString>, DebugValue)],
        name: &str,
    ) -> u64 {
        snapshot
            .iter()
            .filter(|(key, _, _, _)| key.key().name() == name)
            .map(|(_, _, _, value)| match value {
                DebugValue::Counter(v) => *v,
                _ => 0,
            })
            .sum()
    }

    #[test]
    fn test_calls_without_recorder_are_noops() {
        record_operation("fast", "get", "success");
        record_latency("durable-small", "set", Duration::from_micros(100));
        record_hit("fast");
        record_miss();
        record_move("promote", "durable-large", "fast");
        record_eviction("fast", "capacity", 1024);
        record_capacity_rejection("durable-small");
        set_fast_tier_bytes(4096);
        set_tier_entries("fast", 3);
        set_hit_rate(0.5);
        record_optimization(Duration::from_millis(3), 0);
    }

    #[test]
    fn test_hits_and_misses_are_counted() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            record_hit("fast");
            record_hit("durable-large");
            record_miss();
        });

        let snapshot = snapshotter.snapshot().into_vec();
        assert_eq!(counter_value(&snapshot, "cache_tiers_hits_total"), 2);
        assert_eq!(counter_value(&snapshot, "cache_tiers_misses_total"), 1);
    }

    #[test]
    fn test_eviction_counts_bytes() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            record_eviction("fast", "expired", 100);
            record_eviction("fast", "capacity", 50);
        });

        let snapshot = snapshotter.snapshot().into_vec();
        assert_eq!(counter_value(&snapshot, "cache_tiers_evictions_total"), 2);
        assert_eq!(counter_value(&snapshot, "cache_tiers_evicted_bytes_total"), 150);
    }

    #[test]
    fn test_latency_timer() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            let _timer = LatencyTimer::new("fast", "get");
        });

        let recorded = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .any(|(key, _, _, value)| {
                key.key().name() == "cache_tiers_operation_seconds"
                    && matches!(value, DebugValue::Histogram(ref samples) if samples.len() == 1)
            });
        assert!(recorded);
    }
}
