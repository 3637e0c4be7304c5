//! Per-locator counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

#[derive(Debug, Default)]
pub struct LocatorMetrics {
    locate_total: AtomicU64,
    locate_nanos: AtomicU64,
    matches: AtomicU64,
    stale_lookups: AtomicU64,
    invalid_keys: AtomicU64,
    partial_captures: AtomicU64,
    resets: AtomicU64,
}

#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct MetricCounter {
    pub total: u64,
    pub avg_ms: f64,
}

#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct MetricsSnapshot {
    pub locate: MetricCounter,
    pub matches: u64,
    pub stale_lookups: u64,
    pub invalid_keys: u64,
    pub partial_captures: u64,
    pub resets: u64,
}

impl LocatorMetrics {
    pub fn record_locate(&self, elapsed: Duration, matches: usize, partial: bool) {
        self.locate_total.fetch_add(1, Ordering::Relaxed);
        self.locate_nanos
            .fetch_add(duration_to_nanos(elapsed), Ordering::Relaxed);
        self.matches.fetch_add(matches as u64, Ordering::Relaxed);
        if partial {
            self.partial_captures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_stale(&self) {
        self.stale_lookups.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalid_key(&self) {
        self.invalid_keys.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reset(&self) {
        self.resets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            locate: make_counter(
                self.locate_total.load(Ordering::Relaxed),
                self.locate_nanos.load(Ordering::Relaxed),
            ),
            matches: self.matches.load(Ordering::Relaxed),
            stale_lookups: self.stale_lookups.load(Ordering::Relaxed),
            invalid_keys: self.invalid_keys.load(Ordering::Relaxed),
            partial_captures: self.partial_captures.load(Ordering::Relaxed),
            resets: self.resets.load(Ordering::Relaxed),
        }
    }
}

fn make_counter(total: u64, nanos: u64) -> MetricCounter {
    let avg_ms = if total == 0 {
        0.0
    } else {
        (nanos as f64 / total as f64) / 1_000_000.0
    };
    MetricCounter { total, avg_ms }
}

fn duration_to_nanos(duration: Duration) -> u64 {
    duration.as_nanos().min(u128::from(u64::MAX)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_latency() {
        let metrics = LocatorMetrics::default();
        metrics.record_locate(Duration::from_millis(2), 1, false);
        metrics.record_locate(Duration::from_millis(4), 0, true);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.locate.total, 2);
        assert!((snapshot.locate.avg_ms - 3.0).abs() < 1e-9);
        assert_eq!(snapshot.matches, 1);
        assert_eq!(snapshot.partial_captures, 1);
    }
}
