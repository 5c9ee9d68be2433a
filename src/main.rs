mod api;
mod config;
mod document;
mod error;
mod extract;
mod fetcher;
mod pipeline;
mod scheduler;
mod state;
mod types;

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::api::routes::{router, ApiState};
use crate::api::{CycleLatency, CycleStats};
use crate::config::Config;
use crate::error::Result;
use crate::fetcher::Fetcher;
use crate::pipeline::Pipeline;
use crate::scheduler::Scheduler;
use crate::state::SnapshotStore;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Cycle components; a bad header profile or class marker stops startup ---
    let fetcher = Fetcher::new(&cfg.headers, cfg.fetch_timeout)?;
    let pipeline = Pipeline::new(&cfg.extraction)?;
    info!(
        url = %cfg.source_url,
        sport = %cfg.sport_key,
        timeout_secs = cfg.fetch_timeout.as_secs(),
        stoplist = cfg.extraction.stoplist.len(),
        max_candidates = cfg.extraction.max_candidates,
        strategies = ?pipeline.strategy_names(),
        "Pipeline ready"
    );

    // --- In-memory snapshot store, empty until the first cycle publishes ---
    let store = SnapshotStore::new([cfg.sport_key.as_str()]);
    let stats = Arc::new(CycleStats::new());
    let latency = Arc::new(CycleLatency::new());

    let scheduler = Arc::new(Scheduler::new(
        &cfg,
        fetcher,
        pipeline,
        Arc::clone(&store),
        Arc::clone(&stats),
        Arc::clone(&latency),
    ));

    // --- Shutdown signal: Ctrl-C stops the timer and the HTTP server ---
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {e}");
            return;
        }
        info!("Shutdown requested");
        let _ = shutdown_tx.send(true);
    });

    // Scheduler (background, first cycle immediately)
    let scheduler_task = tokio::spawn(Arc::clone(&scheduler).run(shutdown_rx.clone()));

    // HTTP API server
    let api_state = ApiState {
        store,
        scheduler,
        stats,
        latency,
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    let mut server_shutdown = shutdown_rx;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = server_shutdown.wait_for(|stop| *stop).await;
        })
        .await?;

    // in-flight cycles are abandoned with the runtime
    scheduler_task.abort();
    info!("Stopped");
    Ok(())
}
