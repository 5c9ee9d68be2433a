//! Shared cycle counters for the /api/stats endpoint.
//! Updated by the Scheduler, read by the API.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};

/// Cycle outcome counters. Relaxed ordering: these are observability only.
#[derive(Default)]
pub struct CycleStats {
    pub cycles_started: AtomicU64,
    pub cycles_published: AtomicU64,
    pub fetch_failures: AtomicU64,
    pub parse_failures: AtomicU64,
    pub extraction_failures: AtomicU64,
    /// Triggers dropped because a cycle was already running.
    pub triggers_dropped: AtomicU64,
    pub cycle_in_flight: AtomicBool,
    /// Millisecond timestamp of the last finished cycle (0 = none).
    last_cycle_at_ms: AtomicI64,
    last_strategy: Mutex<Option<&'static str>>,
}

impl CycleStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cycle_started(&self) {
        self.cycles_started.fetch_add(1, Ordering::Relaxed);
        self.cycle_in_flight.store(true, Ordering::Relaxed);
    }

    pub fn cycle_finished(&self, at: DateTime<Utc>) {
        self.cycle_in_flight.store(false, Ordering::Relaxed);
        self.last_cycle_at_ms.store(at.timestamp_millis(), Ordering::Relaxed);
    }

    pub fn published(&self, strategy: &'static str) {
        self.cycles_published.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_strategy.lock() {
            *last = Some(strategy);
        }
    }

    pub fn inc_fetch_failures(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_parse_failures(&self) {
        self.parse_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_extraction_failures(&self) {
        self.extraction_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_triggers_dropped(&self) {
        self.triggers_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cycles_started(&self) -> u64 {
        self.cycles_started.load(Ordering::Relaxed)
    }

    pub fn cycles_published(&self) -> u64 {
        self.cycles_published.load(Ordering::Relaxed)
    }

    pub fn fetch_failures(&self) -> u64 {
        self.fetch_failures.load(Ordering::Relaxed)
    }

    pub fn parse_failures(&self) -> u64 {
        self.parse_failures.load(Ordering::Relaxed)
    }

    pub fn extraction_failures(&self) -> u64 {
        self.extraction_failures.load(Ordering::Relaxed)
    }

    pub fn triggers_dropped(&self) -> u64 {
        self.triggers_dropped.load(Ordering::Relaxed)
    }

    pub fn cycle_in_flight(&self) -> bool {
        self.cycle_in_flight.load(Ordering::Relaxed)
    }

    pub fn last_strategy(&self) -> Option<&'static str> {
        self.last_strategy.lock().ok().and_then(|s| *s)
    }

    pub fn last_cycle_at(&self) -> Option<DateTime<Utc>> {
        match self.last_cycle_at_ms.load(Ordering::Relaxed) {
            0 => None,
            ms => DateTime::from_timestamp_millis(ms),
        }
    }
}
