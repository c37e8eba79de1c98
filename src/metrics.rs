//! Ambient counters for observability, mirroring `kaos::metrics`.
//!
//! Every `Queue` owns one `Metrics` (process-local, not stored in shared
//! memory — the point is per-handle visibility, not cross-process
//! aggregation).

use std::sync::atomic::{AtomicU64, Ordering};

pub struct Metrics {
    pub puts: AtomicU64,
    pub gets: AtomicU64,
    pub bytes_put: AtomicU64,
    pub bytes_got: AtomicU64,
    pub full_events: AtomicU64,
    pub empty_events: AtomicU64,
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            puts: AtomicU64::new(0),
            gets: AtomicU64::new(0),
            bytes_put: AtomicU64::new(0),
            bytes_got: AtomicU64::new(0),
            full_events: AtomicU64::new(0),
            empty_events: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_put(&self, bytes: u64) {
        self.puts.fetch_add(1, Ordering::Relaxed);
        self.bytes_put.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_get(&self, bytes: u64) {
        self.gets.fetch_add(1, Ordering::Relaxed);
        self.bytes_got.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_full(&self) {
        self.full_events.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_empty(&self) {
        self.empty_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            puts: self.puts.load(Ordering::Relaxed),
            gets: self.gets.load(Ordering::Relaxed),
            bytes_put: self.bytes_put.load(Ordering::Relaxed),
            bytes_got: self.bytes_got.load(Ordering::Relaxed),
            full_events: self.full_events.load(Ordering::Relaxed),
            empty_events: self.empty_events.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MetricsSnapshot {
    pub puts: u64,
    pub gets: u64,
    pub bytes_put: u64,
    pub bytes_got: u64,
    pub full_events: u64,
    pub empty_events: u64,
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "puts={} gets={} bytes_put={} bytes_got={} full={} empty={}",
            self.puts, self.gets, self.bytes_put, self.bytes_got, self.full_events, self.empty_events
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let m = Metrics::new();
        m.record_put(8);
        m.record_get(8);
        m.record_full();

        let s = m.snapshot();
        assert_eq!(s.puts, 1);
        assert_eq!(s.gets, 1);
        assert_eq!(s.bytes_put, 8);
        assert_eq!(s.full_events, 1);
    }
}
