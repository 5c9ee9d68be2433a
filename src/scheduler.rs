use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::{watch, Mutex, OwnedMutexGuard};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::api::health::CycleStats;
use crate::api::latency::CycleLatency;
use crate::config::Config;
use crate::error::CycleError;
use crate::fetcher::Fetcher;
use crate::pipeline::{ExtractionReport, Pipeline};
use crate::state::SnapshotStore;
use crate::types::Snapshot;

/// Result of asking for a cycle. Triggers that arrive while one is running
/// are dropped, not queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Accepted,
    AlreadyRunning,
}

impl TriggerOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            TriggerOutcome::Accepted => "accepted",
            TriggerOutcome::AlreadyRunning => "already_running",
        }
    }
}

/// Owns the fetch → extract → publish cycle. The timer loop and on-demand
/// triggers share one lock, so at most one cycle is ever in flight; readers
/// go straight to the store and never touch it.
pub struct Scheduler {
    source_url: String,
    sport_key: String,
    refresh_interval: Duration,
    fetcher: Fetcher,
    pipeline: Pipeline,
    store: Arc<SnapshotStore>,
    stats: Arc<CycleStats>,
    latency: Arc<CycleLatency>,
    cycle_lock: Arc<Mutex<()>>,
}

impl Scheduler {
    pub fn new(
        cfg: &Config,
        fetcher: Fetcher,
        pipeline: Pipeline,
        store: Arc<SnapshotStore>,
        stats: Arc<CycleStats>,
        latency: Arc<CycleLatency>,
    ) -> Self {
        Self {
            source_url: cfg.source_url.clone(),
            sport_key: cfg.sport_key.clone(),
            refresh_interval: cfg.refresh_interval,
            fetcher,
            pipeline,
            store,
            stats,
            latency,
            cycle_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Timer loop. The first tick fires immediately so the store fills at
    /// startup. Returns once `shutdown` flips to true or its sender is gone.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.refresh_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            url = %self.source_url,
            sport = %self.sport_key,
            interval_secs = self.refresh_interval.as_secs(),
            "Scheduler started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Scheduler stopping");
                        break;
                    }
                }
            }
        }
    }

    /// Timer trigger: runs the cycle inline when the lock is free.
    pub async fn tick(&self) -> TriggerOutcome {
        match Arc::clone(&self.cycle_lock).try_lock_owned() {
            Ok(guard) => {
                self.run_cycle(guard).await;
                TriggerOutcome::Accepted
            }
            Err(_) => {
                self.dropped("timer");
                TriggerOutcome::AlreadyRunning
            }
        }
    }

    /// On-demand trigger: starts a cycle in the background and returns
    /// without waiting for it.
    pub fn trigger_refresh(self: &Arc<Self>) -> TriggerOutcome {
        match Arc::clone(&self.cycle_lock).try_lock_owned() {
            Ok(guard) => {
                let this = Arc::clone(self);
                tokio::spawn(async move { this.run_cycle(guard).await });
                TriggerOutcome::Accepted
            }
            Err(_) => {
                self.dropped("on_demand");
                TriggerOutcome::AlreadyRunning
            }
        }
    }

    fn dropped(&self, trigger: &'static str) {
        self.stats.inc_triggers_dropped();
        debug!(trigger, "Cycle already in flight, trigger dropped");
    }

    /// One cycle. Holding `_guard` is what makes it exclusive. Publishes only
    /// on success; every failure leaves the previous snapshot in place.
    async fn run_cycle(&self, _guard: OwnedMutexGuard<()>) {
        let started = Instant::now();
        self.stats.cycle_started();

        match self.cycle().await {
            Ok(report) => {
                let records = report.records.len();
                self.store.publish(Snapshot {
                    sport_key: self.sport_key.clone(),
                    records: report.records,
                    last_updated: Some(Utc::now()),
                    strategy: Some(report.strategy),
                });
                self.stats.published(report.strategy);
                info!(
                    sport = %self.sport_key,
                    strategy = report.strategy,
                    candidates = report.candidates,
                    skipped = report.skipped.len(),
                    records,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Snapshot published: {records} games via {}",
                    report.strategy,
                );
            }
            Err(e) => self.log_failure(&e, started.elapsed()),
        }

        self.latency.record(started.elapsed());
        self.stats.cycle_finished(Utc::now());
    }

    async fn cycle(&self) -> Result<ExtractionReport, CycleError> {
        let body = self.fetcher.fetch(&self.source_url).await?;
        // Sync from here on: the parsed document is not Send and must not
        // live across an await.
        self.pipeline.run(&body, Utc::now())
    }

    fn log_failure(&self, e: &CycleError, elapsed: Duration) {
        let duration_ms = elapsed.as_millis() as u64;
        match e {
            CycleError::Fetch(_) => {
                self.stats.inc_fetch_failures();
                error!(
                    outcome = e.outcome(),
                    url = %self.source_url,
                    duration_ms,
                    "Cycle aborted, keeping previous snapshot: {e}"
                );
            }
            CycleError::Parse(_) => {
                self.stats.inc_parse_failures();
                error!(outcome = e.outcome(), duration_ms, "Cycle aborted, keeping previous snapshot: {e}");
            }
            CycleError::TotalExtraction { strategy, candidates, skipped } => {
                self.stats.inc_extraction_failures();
                warn!(
                    outcome = e.outcome(),
                    strategy,
                    candidates,
                    skipped,
                    duration_ms,
                    "No games extracted, keeping previous snapshot"
                );
            }
        }
    }
}
