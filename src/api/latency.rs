//! In-memory histogram of cycle durations (fetch through publish).

use std::sync::Mutex;
use std::time::Duration;

use hdrhistogram::Histogram;

/// Shared cycle timing. Scheduler records, API reads.
/// Values stored in milliseconds.
pub struct CycleLatency {
    inner: Mutex<Option<Histogram<u64>>>,
}

impl CycleLatency {
    /// Tracks 1ms to 10min, 3 significant figures.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Histogram::new_with_bounds(1, 600_000, 3).ok()),
        }
    }

    pub fn record(&self, d: Duration) {
        let ms = d.as_millis().clamp(1, 600_000) as u64;
        if let Ok(mut guard) = self.inner.lock() {
            if let Some(h) = guard.as_mut() {
                let _ = h.record(ms);
            }
        }
    }

    /// Return (p50_ms, p95_ms, p99_ms). None if no samples.
    pub fn percentiles(&self) -> (Option<u64>, Option<u64>, Option<u64>) {
        let Ok(guard) = self.inner.lock() else {
            return (None, None, None);
        };
        match guard.as_ref() {
            Some(h) if h.len() > 0 => (
                Some(h.value_at_quantile(0.5)),
                Some(h.value_at_quantile(0.95)),
                Some(h.value_at_quantile(0.99)),
            ),
            _ => (None, None, None),
        }
    }

    pub fn len(&self) -> u64 {
        self.inner
            .lock()
            .ok()
            .and_then(|g| g.as_ref().map(|h| h.len()))
            .unwrap_or(0)
    }
}

impl Default for CycleLatency {
    fn default() -> Self {
        Self::new()
    }
}
