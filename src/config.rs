use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::types::PctSlot;

pub const SOURCE_URL: &str = "https://www.sportsbettingdime.com/mlb/public-betting-trends/";
pub const SPORT_KEY: &str = "mlb";

/// Browser-like header profile; the source serves a stripped page to bare clients.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
pub const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Upper bound on the single fetch a cycle performs (seconds).
pub const FETCH_TIMEOUT_SECS: u64 = 30;

/// Scheduler interval (seconds).
pub const REFRESH_INTERVAL_SECS: u64 = 300;

pub const API_PORT: u16 = 5000;

/// Candidates consumed from the winning strategy, in document order.
pub const MAX_CANDIDATES: usize = 50;

/// Uppercase tokens that look like team codes but never are.
pub const DEFAULT_STOPLIST: &[&str] = &[
    // time
    "AM", "PM", "ET", "EST", "EDT", "CT", "CST", "CDT", "MT", "MST", "MDT", "PT", "PST", "PDT",
    "UTC", "GMT", "TBD", "LIVE",
    // leagues
    "MLB", "NFL", "NBA", "NHL", "NCAA", "WNBA", "MLS", "UFC", "PGA", "CFB", "CBB",
    // betting jargon
    "ML", "ATS", "VS", "OU", "RL", "PL", "PK", "EV", "OVER", "BET", "BETS", "PCT", "ODDS",
    "LINE", "OPEN", "HOME", "AWAY", "TEAM", "GAME", "DATE", "TIME", "FINAL",
];

/// Strategy 1: tbody class markers that must match a class exactly.
pub const EXACT_TBODY_CLASSES: &[&str] = &["text-base-300"];

/// Strategy 2: substrings looked for inside tbody class attributes.
pub const LOOSE_TBODY_CLASSES: &[&str] = &["text-base", "betting", "trends"];

/// Strategy 4: keywords looked for inside generic container class attributes.
pub const CONTAINER_KEYWORDS: &[&str] = &["game", "match", "betting", "trend", "contest"];

/// Request headers sent with every fetch.
#[derive(Debug, Clone)]
pub struct HeaderProfile {
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
    /// Additional `(name, value)` pairs (EXTRA_HEADERS, `Name: value;Name: value`).
    pub extra: Vec<(String, String)>,
}

impl Default for HeaderProfile {
    fn default() -> Self {
        Self {
            user_agent: USER_AGENT.to_string(),
            accept: ACCEPT.to_string(),
            accept_language: ACCEPT_LANGUAGE.to_string(),
            extra: Vec::new(),
        }
    }
}

/// Everything the parse → locate → extract → assemble pipeline reads.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    pub stoplist: HashSet<String>,
    pub exact_tbody_classes: Vec<String>,
    pub loose_tbody_classes: Vec<String>,
    pub container_keywords: Vec<String>,
    /// Slot receiving each extracted percentage position (PCT_SLOT_ORDER).
    pub slot_order: [PctSlot; 6],
    pub max_candidates: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            stoplist: owned(DEFAULT_STOPLIST).into_iter().collect(),
            exact_tbody_classes: owned(EXACT_TBODY_CLASSES),
            loose_tbody_classes: owned(LOOSE_TBODY_CLASSES),
            container_keywords: owned(CONTAINER_KEYWORDS),
            slot_order: PctSlot::ALL,
            max_candidates: MAX_CANDIDATES,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub source_url: String,
    /// Key the snapshot is served under (SPORT_KEY).
    pub sport_key: String,
    pub headers: HeaderProfile,
    pub fetch_timeout: Duration,
    pub refresh_interval: Duration,
    pub extraction: ExtractionConfig,
    pub api_port: u16,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. A value that is present but
    /// unparseable is an error; absent values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let refresh_secs: u64 = parse_var(&var, "REFRESH_INTERVAL_SECS", REFRESH_INTERVAL_SECS)?;
        if refresh_secs == 0 {
            return Err(AppError::Config("REFRESH_INTERVAL_SECS must be greater than zero".to_string()));
        }
        let timeout_secs: u64 = parse_var(&var, "FETCH_TIMEOUT_SECS", FETCH_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(AppError::Config("FETCH_TIMEOUT_SECS must be greater than zero".to_string()));
        }

        let max_candidates: usize = parse_var(&var, "MAX_CANDIDATES", MAX_CANDIDATES)?;
        if max_candidates == 0 {
            return Err(AppError::Config("MAX_CANDIDATES must be greater than zero".to_string()));
        }

        let defaults = ExtractionConfig::default();
        let stoplist = match var("TEAM_STOPLIST") {
            Some(raw) => split_list(&raw).into_iter().map(|t| t.to_uppercase()).collect(),
            None => defaults.stoplist,
        };
        let slot_order = match var("PCT_SLOT_ORDER") {
            Some(raw) => parse_slot_order(&raw)?,
            None => defaults.slot_order,
        };

        Ok(Self {
            source_url: var("SOURCE_URL").unwrap_or_else(|| SOURCE_URL.to_string()),
            sport_key: var("SPORT_KEY")
                .map(|s| s.to_lowercase())
                .unwrap_or_else(|| SPORT_KEY.to_string()),
            headers: HeaderProfile {
                user_agent: var("USER_AGENT").unwrap_or_else(|| USER_AGENT.to_string()),
                accept: var("ACCEPT").unwrap_or_else(|| ACCEPT.to_string()),
                accept_language: var("ACCEPT_LANGUAGE").unwrap_or_else(|| ACCEPT_LANGUAGE.to_string()),
                extra: match var("EXTRA_HEADERS") {
                    Some(raw) => parse_extra_headers(&raw)?,
                    None => Vec::new(),
                },
            },
            fetch_timeout: Duration::from_secs(timeout_secs),
            refresh_interval: Duration::from_secs(refresh_secs),
            extraction: ExtractionConfig {
                stoplist,
                exact_tbody_classes: var("EXACT_TBODY_CLASSES")
                    .map(|raw| split_list(&raw))
                    .unwrap_or(defaults.exact_tbody_classes),
                loose_tbody_classes: var("LOOSE_TBODY_CLASSES")
                    .map(|raw| split_list(&raw))
                    .unwrap_or(defaults.loose_tbody_classes),
                container_keywords: var("CONTAINER_KEYWORDS")
                    .map(|raw| split_list(&raw))
                    .unwrap_or(defaults.container_keywords),
                slot_order,
                max_candidates,
            },
            api_port: parse_var(&var, "API_PORT", API_PORT)?,
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn parse_var<T, F>(var: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| AppError::Config(format!("{key} has an invalid value: {raw:?}"))),
        None => Ok(default),
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// `moneyline_bets,moneyline_money,...` → six distinct slots.
pub fn parse_slot_order(raw: &str) -> Result<[PctSlot; 6]> {
    let slots = split_list(raw)
        .iter()
        .map(|s| s.parse::<PctSlot>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(AppError::Config)?;

    let unique: HashSet<PctSlot> = slots.iter().copied().collect();
    if slots.len() != 6 || unique.len() != 6 {
        return Err(AppError::Config(format!(
            "PCT_SLOT_ORDER must name each of the six slots exactly once, got {raw:?}"
        )));
    }
    let mut order = PctSlot::ALL;
    order.copy_from_slice(&slots);
    Ok(order)
}

/// `Name: value;Name: value` → header pairs.
fn parse_extra_headers(raw: &str) -> Result<Vec<(String, String)>> {
    raw.split(';')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, value) = pair
                .split_once(':')
                .ok_or_else(|| AppError::Config(format!("EXTRA_HEADERS entry {pair:?} is not `Name: value`")))?;
            Ok((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}
