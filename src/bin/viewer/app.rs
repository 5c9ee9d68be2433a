use std::collections::BTreeMap;

use chrono::{DateTime, Local, Utc};
use serde::Deserialize;

// ---------------------------------------------------------------------------
// API response types (mirror routes.rs shapes)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GameRow {
    pub game_time: String,
    pub away_team: String,
    pub home_team: String,
    pub moneyline_bets_pct: String,
    pub moneyline_money_pct: String,
    pub spread_bets_pct: String,
    pub spread_money_pct: String,
    pub total_bets_pct: String,
    pub total_money_pct: String,
}

impl GameRow {
    /// The six slots in table column order.
    pub fn slots(&self) -> [&str; 6] {
        [
            &self.moneyline_bets_pct,
            &self.moneyline_money_pct,
            &self.spread_bets_pct,
            &self.spread_money_pct,
            &self.total_bets_pct,
            &self.total_money_pct,
        ]
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AllResponse {
    pub data: BTreeMap<String, Vec<GameRow>>,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StatsResponse {
    pub cycles_started: u64,
    pub cycles_published: u64,
    pub fetch_failures: u64,
    pub parse_failures: u64,
    pub extraction_failures: u64,
    pub triggers_dropped: u64,
    pub cycle_in_flight: bool,
    pub last_strategy: Option<String>,
    pub last_cycle_at: Option<DateTime<Utc>>,
    pub p50_ms: Option<u64>,
    pub p99_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub status: String,
}

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Error(String),
    Connecting,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub status: ConnectionStatus,
    /// (sport, game) in sport order, then discovery order.
    pub games: Vec<(String, GameRow)>,
    pub last_updated: Option<DateTime<Utc>>,
    pub health: HealthResponse,
    pub stats: StatsResponse,
    /// Result of the last `f` press.
    pub notice: Option<String>,
    pub base_url: String,
}

impl AppState {
    pub fn new(base_url: String) -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            games: Vec::new(),
            last_updated: None,
            health: HealthResponse::default(),
            stats: StatsResponse::default(),
            notice: None,
            base_url,
        }
    }

    pub fn apply_all(&mut self, all: AllResponse) {
        self.games = all
            .data
            .into_iter()
            .flat_map(|(sport, games)| games.into_iter().map(move |g| (sport.clone(), g)))
            .collect();
        self.last_updated = all.last_updated;
    }

    pub async fn refresh(&mut self, client: &reqwest::Client) {
        let all_url = format!("{}/api/betting/all", self.base_url);
        let health_url = format!("{}/api/health", self.base_url);
        let stats_url = format!("{}/api/stats", self.base_url);

        let (all_res, health_res, stats_res) = tokio::join!(
            client.get(&all_url).send(),
            client.get(&health_url).send(),
            client.get(&stats_url).send(),
        );

        let all = match all_res {
            Ok(resp) => resp.json::<AllResponse>().await,
            Err(e) => {
                self.status = ConnectionStatus::Error(format!("{e}"));
                return;
            }
        };
        match all {
            Ok(all) => {
                self.apply_all(all);
                self.status = ConnectionStatus::Connected;
            }
            Err(e) => {
                self.status = ConnectionStatus::Error(format!("parse error: {e}"));
                return;
            }
        }

        if let Ok(h) = health_res {
            if let Ok(health) = h.json::<HealthResponse>().await {
                self.health = health;
            }
        }
        if let Ok(s) = stats_res {
            if let Ok(stats) = s.json::<StatsResponse>().await {
                self.stats = stats;
            }
        }
    }

    /// Asks the service for a cycle. Only the acknowledgement comes back.
    pub async fn request_cycle(&mut self, client: &reqwest::Client) {
        let url = format!("{}/api/refresh", self.base_url);
        let notice = match client.post(&url).send().await {
            Ok(resp) => match resp.json::<RefreshResponse>().await {
                Ok(ack) if ack.status == "accepted" => "cycle started".to_string(),
                Ok(ack) => ack.status.replace('_', " "),
                Err(e) => format!("bad ack: {e}"),
            },
            Err(e) => format!("refresh failed: {e}"),
        };
        self.notice = Some(notice);
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Local HH:MM:SS, or a dash before the first publish.
pub fn format_clock(ts: Option<DateTime<Utc>>) -> String {
    match ts {
        Some(t) => t.with_timezone(&Local).format("%H:%M:%S").to_string(),
        None => "—".to_string(),
    }
}

pub fn format_ms(ms: Option<u64>) -> String {
    match ms {
        Some(v) if v >= 1000 => format!("{:.1}s", v as f64 / 1000.0),
        Some(v) => format!("{v}ms"),
        None => "—".to_string(),
    }
}

/// Integer value of a "45%" slot; `None` for "N/A".
pub fn pct_value(slot: &str) -> Option<u32> {
    slot.strip_suffix('%').and_then(|n| n.parse().ok())
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}
