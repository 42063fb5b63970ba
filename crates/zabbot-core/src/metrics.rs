//! Runtime metrics for the assistant.
//!
//! Counts processed messages, cache hits and misses and fetch failures,
//! and keeps a bounded window of fetch latencies per operation.

use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Latency samples kept when no window is given.
const DEFAULT_WINDOW: usize = 1000;

/// Latency summary for one fetch operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchLatency {
    pub operation: &'static str,
    /// Samples in the current window
    pub samples: usize,
    pub p50: Duration,
    pub p99: Duration,
}

/// Counters shared by every request.
pub struct Metrics {
    /// Messages processed end to end
    pub requests_total: AtomicU64,
    /// Sum of message latencies in microseconds
    pub requests_latency_us: AtomicU64,
    pub cache_hits: AtomicU64,
    pub cache_misses: AtomicU64,
    /// Fetches replaced by empty results
    pub fetch_failures: AtomicU64,
    fetch_window: RwLock<VecDeque<(&'static str, Duration)>>,
    window: usize,
    started: Instant,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self::with_window(DEFAULT_WINDOW)
    }

    /// Keep at most `window` fetch latency samples across all operations.
    pub fn with_window(window: usize) -> Self {
        Self {
            requests_total: AtomicU64::new(0),
            requests_latency_us: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            fetch_failures: AtomicU64::new(0),
            fetch_window: RwLock::new(VecDeque::with_capacity(window)),
            window,
            started: Instant::now(),
        }
    }

    pub fn record_request(&self, latency: Duration) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        self.requests_latency_us
            .fetch_add(latency.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetch_failure(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Add a fetch latency sample, evicting the oldest past the window.
    pub fn record_fetch(&self, operation: &'static str, duration: Duration) {
        let mut window = self.fetch_window.write();
        if window.len() == self.window {
            window.pop_front();
        }
        if self.window > 0 {
            window.push_back((operation, duration));
        }
    }

    pub fn requests(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    /// Seconds since these metrics were created.
    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    /// Fraction of cached reads served from the cache, 0.0 when none happened.
    pub fn cache_hit_rate(&self) -> f64 {
        let hits = self.cache_hits.load(Ordering::Relaxed);
        let lookups = hits + self.cache_misses.load(Ordering::Relaxed);
        if lookups == 0 {
            return 0.0;
        }
        hits as f64 / lookups as f64
    }

    /// Mean latency of processed messages.
    pub fn avg_latency(&self) -> Duration {
        match self.requests() {
            0 => Duration::ZERO,
            n => Duration::from_micros(self.requests_latency_us.load(Ordering::Relaxed) / n),
        }
    }

    /// Per-operation latency summaries, in order of first appearance.
    pub fn fetch_latencies(&self) -> Vec<FetchLatency> {
        let mut grouped: Vec<(&'static str, Vec<Duration>)> = Vec::new();
        for &(operation, duration) in self.fetch_window.read().iter() {
            match grouped.iter_mut().find(|(op, _)| *op == operation) {
                Some((_, durations)) => durations.push(duration),
                None => grouped.push((operation, vec![duration])),
            }
        }

        grouped
            .into_iter()
            .map(|(operation, mut durations)| {
                durations.sort();
                FetchLatency {
                    operation,
                    samples: durations.len(),
                    p50: percentile(&durations, 0.50),
                    p99: percentile(&durations, 0.99),
                }
            })
            .collect()
    }
}

/// Nearest-rank percentile over sorted, non-empty samples.
fn percentile(sorted: &[Duration], p: f64) -> Duration {
    let rank = (sorted.len() as f64 * p) as usize;
    sorted[rank.min(sorted.len() - 1)]
}
