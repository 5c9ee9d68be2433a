use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use crate::api::health::CycleStats;
use crate::api::latency::CycleLatency;
use crate::error::AppError;
use crate::scheduler::Scheduler;
use crate::state::SnapshotStore;
use crate::types::GameRecord;

/// Handlers only read the store; the single exception is `POST /api/refresh`,
/// which asks the scheduler for a cycle and returns without waiting.
#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<SnapshotStore>,
    pub scheduler: Arc<Scheduler>,
    pub stats: Arc<CycleStats>,
    pub latency: Arc<CycleLatency>,
}

pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/api/health", get(health))
        .route("/api/betting/all", get(get_all))
        .route("/api/betting/:sport", get(get_sport))
        .route("/api/refresh", post(refresh))
        .route("/api/stats", get(get_stats))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct IndexResponse {
    pub message: &'static str,
    pub endpoints: BTreeMap<String, &'static str>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct SportResponse {
    pub sport: String,
    pub data: Vec<GameRecord>,
    pub count: usize,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub struct AllResponse {
    pub data: BTreeMap<String, Vec<GameRecord>>,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub cycles_started: u64,
    pub cycles_published: u64,
    pub fetch_failures: u64,
    pub parse_failures: u64,
    pub extraction_failures: u64,
    pub triggers_dropped: u64,
    pub cycle_in_flight: bool,
    pub last_strategy: Option<&'static str>,
    pub last_cycle_at: Option<DateTime<Utc>>,
    pub p50_ms: Option<u64>,
    pub p95_ms: Option<u64>,
    pub p99_ms: Option<u64>,
    pub sample_count: u64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn index(State(state): State<ApiState>) -> Json<IndexResponse> {
    let mut endpoints = BTreeMap::new();
    endpoints.insert("/api/health".to_string(), "Health check");
    endpoints.insert("/api/betting/all".to_string(), "Betting trends for every sport");
    for sport in state.store.sport_keys() {
        endpoints.insert(format!("/api/betting/{sport}"), "Betting trends for one sport");
    }
    endpoints.insert("/api/refresh".to_string(), "POST: start a scrape cycle");
    endpoints.insert("/api/stats".to_string(), "Scrape cycle counters and timings");

    Json(IndexResponse {
        message: "Public Betting Trends API",
        endpoints,
    })
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
    })
}

async fn get_sport(
    State(state): State<ApiState>,
    Path(sport): Path<String>,
) -> Result<Json<SportResponse>, AppError> {
    let snapshot = state
        .store
        .current(&sport.to_lowercase())
        .ok_or_else(|| AppError::NotFound(format!("unknown sport '{sport}'")))?;

    Ok(Json(SportResponse {
        sport: snapshot.sport_key.clone(),
        data: snapshot.records.clone(),
        count: snapshot.records.len(),
        last_updated: snapshot.last_updated,
    }))
}

async fn get_all(State(state): State<ApiState>) -> Json<AllResponse> {
    let data = state
        .store
        .all()
        .iter()
        .map(|s| (s.sport_key.clone(), s.records.clone()))
        .collect();

    Json(AllResponse {
        data,
        last_updated: state.store.last_updated(),
    })
}

async fn refresh(State(state): State<ApiState>) -> (StatusCode, Json<RefreshResponse>) {
    let outcome = state.scheduler.trigger_refresh();
    (
        StatusCode::ACCEPTED,
        Json(RefreshResponse {
            status: outcome.as_str(),
        }),
    )
}

async fn get_stats(State(state): State<ApiState>) -> Json<StatsResponse> {
    let stats = &state.stats;
    let (p50_ms, p95_ms, p99_ms) = state.latency.percentiles();

    Json(StatsResponse {
        cycles_started: stats.cycles_started(),
        cycles_published: stats.cycles_published(),
        fetch_failures: stats.fetch_failures(),
        parse_failures: stats.parse_failures(),
        extraction_failures: stats.extraction_failures(),
        triggers_dropped: stats.triggers_dropped(),
        cycle_in_flight: stats.cycle_in_flight(),
        last_strategy: stats.last_strategy(),
        last_cycle_at: stats.last_cycle_at(),
        p50_ms,
        p95_ms,
        p99_ms,
        sample_count: state.latency.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::Value;

    use crate::config::Config;
    use crate::extract::fixtures;
    use crate::fetcher::Fetcher;
    use crate::pipeline::Pipeline;
    use crate::types::Snapshot;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }

    /// API over a scheduler whose source serves `page` after a short delay.
    async fn api(page: &'static str) -> (String, ApiState) {
        let source = Router::new().route(
            "/page",
            get(move || async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                page
            }),
        );
        let source_url = format!("{}/page", serve(source).await);
        let cfg = Config::from_lookup(|key| match key {
            "SOURCE_URL" => Some(source_url.clone()),
            _ => None,
        })
        .unwrap();

        let store = SnapshotStore::new([cfg.sport_key.as_str()]);
        let stats = Arc::new(CycleStats::new());
        let latency = Arc::new(CycleLatency::new());
        let scheduler = Arc::new(Scheduler::new(
            &cfg,
            Fetcher::new(&cfg.headers, cfg.fetch_timeout).unwrap(),
            Pipeline::new(&cfg.extraction).unwrap(),
            Arc::clone(&store),
            Arc::clone(&stats),
            Arc::clone(&latency),
        ));
        let state = ApiState { store, scheduler, stats, latency };
        (serve(router(state.clone())).await, state)
    }

    async fn get_json(url: String) -> (StatusCode, Value) {
        let resp = reqwest::get(url).await.unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap())
    }

    #[tokio::test]
    async fn health_does_not_trigger_a_cycle() {
        let (base, state) = api(fixtures::EXACT_TBODY).await;
        let (status, body) = get_json(format!("{base}/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert!(body["timestamp"].as_str().is_some());
        assert_eq!(state.stats.cycles_started(), 0);
    }

    #[tokio::test]
    async fn index_lists_endpoints() {
        let (base, _) = api(fixtures::EXACT_TBODY).await;
        let (_, body) = get_json(format!("{base}/")).await;
        assert!(body["message"].is_string());
        assert!(body["endpoints"]["/api/betting/mlb"].is_string());
    }

    #[tokio::test]
    async fn empty_store_serves_empty_data() {
        let (base, _) = api(fixtures::EXACT_TBODY).await;
        let (status, body) = get_json(format!("{base}/api/betting/mlb")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sport"], "mlb");
        assert_eq!(body["count"], 0);
        assert_eq!(body["data"], Value::Array(vec![]));
        assert_eq!(body["last_updated"], Value::Null);
    }

    #[tokio::test]
    async fn published_snapshot_is_served() {
        let (base, state) = api(fixtures::EXACT_TBODY).await;
        let now = Utc::now();
        state.store.publish(Snapshot {
            sport_key: "mlb".to_string(),
            records: Pipeline::new(&Config::from_lookup(|_| None).unwrap().extraction)
                .unwrap()
                .run(fixtures::EXACT_TBODY.as_bytes(), now)
                .unwrap()
                .records,
            last_updated: Some(now),
            strategy: Some("exact_tbody_class"),
        });

        let (_, body) = get_json(format!("{base}/api/betting/mlb")).await;
        assert_eq!(body["count"], 2);
        let first = &body["data"][0];
        assert_eq!(first["away_team"], "NYY");
        assert_eq!(first["home_team"], "BOS");
        assert_eq!(first["moneyline_bets_pct"], "45%");
        assert_eq!(first["game_time"], "Jun 26, 1:10 PM");

        let (_, all) = get_json(format!("{base}/api/betting/all")).await;
        assert_eq!(all["data"]["mlb"].as_array().unwrap().len(), 2);
        assert_eq!(all["last_updated"], body["last_updated"]);
    }

    #[tokio::test]
    async fn unknown_sport_is_404() {
        let (base, _) = api(fixtures::EXACT_TBODY).await;
        let (status, body) = get_json(format!("{base}/api/betting/curling")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("curling"));
    }

    #[tokio::test]
    async fn refresh_acknowledges_and_drops_overlaps() {
        let (base, state) = api(fixtures::EXACT_TBODY).await;
        let client = reqwest::Client::new();

        let first = client.post(format!("{base}/api/refresh")).send().await.unwrap();
        assert_eq!(first.status(), StatusCode::ACCEPTED);
        let first: Value = first.json().await.unwrap();
        assert_eq!(first["status"], "accepted");

        let second: Value = client
            .post(format!("{base}/api/refresh"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(second["status"], "already_running");

        for _ in 0..50 {
            if state.stats.last_cycle_at().is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        let (_, stats) = get_json(format!("{base}/api/stats")).await;
        assert_eq!(stats["cycles_started"], 1);
        assert_eq!(stats["cycles_published"], 1);
        assert_eq!(stats["triggers_dropped"], 1);
        assert_eq!(stats["last_strategy"], "exact_tbody_class");
        assert_eq!(stats["sample_count"], 1);
    }
}
