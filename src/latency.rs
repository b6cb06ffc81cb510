//! Query latency ring buffer with nearest-rank percentiles.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// How many recent query durations are retained.
pub const LATENCY_WINDOW: usize = 100;

/// Percentile summary over the retained window.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct LatencySummary {
    pub p50_ms: u64,
    pub p95_ms: u64,
    pub p99_ms: u64,
    pub mean_ms: f64,
    pub count: usize,
}

/// Bounded ring buffer of query durations. Recording is O(1); reading sorts
/// a copy of the window.
#[derive(Debug, Default)]
pub struct LatencyTracker {
    samples: Mutex<VecDeque<u64>>,
}

impl LatencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, duration: Duration) {
        let mut samples = self.samples.lock().unwrap_or_else(|p| p.into_inner());
        if samples.len() == LATENCY_WINDOW {
            samples.pop_front();
        }
        samples.push_back(duration.as_millis() as u64);
    }

    pub fn summary(&self) -> LatencySummary {
        let samples = self.samples.lock().unwrap_or_else(|p| p.into_inner());
        if samples.is_empty() {
            return LatencySummary::default();
        }
        let mut sorted: Vec<u64> = samples.iter().copied().collect();
        sorted.sort_unstable();

        let total: u64 = sorted.iter().sum();
        LatencySummary {
            p50_ms: nearest_rank(&sorted, 50),
            p95_ms: nearest_rank(&sorted, 95),
            p99_ms: nearest_rank(&sorted, 99),
            mean_ms: total as f64 / sorted.len() as f64,
            count: sorted.len(),
        }
    }
}

/// Nearest-rank percentile: `index = ceil(p/100 * n) - 1` on sorted data.
fn nearest_rank(sorted: &[u64], percentile: usize) -> u64 {
    let n = sorted.len();
    let rank = (percentile * n).div_ceil(100);
    sorted[rank.saturating_sub(1).min(n - 1)]
}
