use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

// ---------------------------------------------------------------------------
// Percentage slots
// ---------------------------------------------------------------------------

/// One of the six market/metric positions a percentage can land in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PctSlot {
    MoneylineBets,
    MoneylineMoney,
    SpreadBets,
    SpreadMoney,
    TotalBets,
    TotalMoney,
}

impl PctSlot {
    /// Default positional order: moneyline, spread, total; bets before money.
    pub const ALL: [PctSlot; 6] = [
        PctSlot::MoneylineBets,
        PctSlot::MoneylineMoney,
        PctSlot::SpreadBets,
        PctSlot::SpreadMoney,
        PctSlot::TotalBets,
        PctSlot::TotalMoney,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PctSlot::MoneylineBets => "moneyline_bets",
            PctSlot::MoneylineMoney => "moneyline_money",
            PctSlot::SpreadBets => "spread_bets",
            PctSlot::SpreadMoney => "spread_money",
            PctSlot::TotalBets => "total_bets",
            PctSlot::TotalMoney => "total_money",
        }
    }
}

impl FromStr for PctSlot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PctSlot::ALL
            .into_iter()
            .find(|slot| slot.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown percentage slot {s:?}"))
    }
}

impl fmt::Display for PctSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A slot value: `"<int>%"` when the position was extracted, `"N/A"` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PctValue(pub Option<u32>);

impl PctValue {
    pub const NOT_AVAILABLE: &'static str = "N/A";
}

impl fmt::Display for PctValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{v}%"),
            None => f.write_str(Self::NOT_AVAILABLE),
        }
    }
}

impl Serialize for PctValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The six named percentage slots for one side (or the whole game).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Splits {
    pub moneyline_bets_pct: PctValue,
    pub moneyline_money_pct: PctValue,
    pub spread_bets_pct: PctValue,
    pub spread_money_pct: PctValue,
    pub total_bets_pct: PctValue,
    pub total_money_pct: PctValue,
}

impl Splits {
    pub fn get(&self, slot: PctSlot) -> PctValue {
        match slot {
            PctSlot::MoneylineBets => self.moneyline_bets_pct,
            PctSlot::MoneylineMoney => self.moneyline_money_pct,
            PctSlot::SpreadBets => self.spread_bets_pct,
            PctSlot::SpreadMoney => self.spread_money_pct,
            PctSlot::TotalBets => self.total_bets_pct,
            PctSlot::TotalMoney => self.total_money_pct,
        }
    }

    pub fn set(&mut self, slot: PctSlot, value: PctValue) {
        let field = match slot {
            PctSlot::MoneylineBets => &mut self.moneyline_bets_pct,
            PctSlot::MoneylineMoney => &mut self.moneyline_money_pct,
            PctSlot::SpreadBets => &mut self.spread_bets_pct,
            PctSlot::SpreadMoney => &mut self.spread_money_pct,
            PctSlot::TotalBets => &mut self.total_bets_pct,
            PctSlot::TotalMoney => &mut self.total_money_pct,
        };
        *field = value;
    }
}

// ---------------------------------------------------------------------------
// Extraction output
// ---------------------------------------------------------------------------

/// Tokens pulled out of one candidate container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFields {
    pub time_text: String,
    /// Stoplist-filtered team codes, away first.
    pub team_tokens: Vec<String>,
    /// All percentages in document order.
    pub percentages: Vec<u32>,
    /// Present when the candidate spans an away row and a home row.
    pub split: Option<SideSequences>,
}

/// Per-side percentage sequences for two-row candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideSequences {
    pub away: Vec<u32>,
    pub home: Vec<u32>,
}

// ---------------------------------------------------------------------------
// GameRecord / Snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameRecord {
    pub game_time: String,
    pub away_team: String,
    pub home_team: String,
    /// Single-sequence mapping; for two-row candidates, derived from the away side.
    #[serde(flatten)]
    pub splits: Splits,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub away_splits: Option<Splits>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_splits: Option<Splits>,
    pub timestamp: DateTime<Utc>,
}

impl GameRecord {
    pub fn matchup(&self) -> (&str, &str) {
        (&self.away_team, &self.home_team)
    }
}

/// The published result of one successful cycle. Immutable once stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub sport_key: String,
    /// Discovery order.
    pub records: Vec<GameRecord>,
    /// `None` until the first successful cycle.
    pub last_updated: Option<DateTime<Utc>>,
    /// Locator strategy that produced the records.
    pub strategy: Option<&'static str>,
}

impl Snapshot {
    pub fn empty(sport_key: &str) -> Self {
        Self {
            sport_key: sport_key.to_string(),
            records: Vec::new(),
            last_updated: None,
            strategy: None,
        }
    }
}
