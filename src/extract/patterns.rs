use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// `<digits>%`
pub static PCT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)%").expect("invalid regex: percentage"));

/// Candidate team code: 2–4 uppercase letters on word boundaries.
pub static TEAM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z]{2,4}\b").expect("invalid regex: team code"));

/// `Jun 26, 1:10 PM`
pub static TIME_LONG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2},?\s+\d{1,2}:\d{2}\s*[ap]m\b",
    )
    .expect("invalid regex: long time")
});

/// `1:10 PM`
pub static TIME_SHORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b\d{1,2}:\d{2}\s*[ap]m\b").expect("invalid regex: short time"));

/// Free-text game line: optional time, team, two percentages, team, two percentages.
pub static GAME_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i:\d{1,2}:\d{2}\s*[ap]m\s+)?\b[A-Z]{2,4}\b\s+\d+%\s+\d+%\s+\b[A-Z]{2,4}\b\s+\d+%\s+\d+%",
    )
    .expect("invalid regex: game line")
});

pub const TBD: &str = "TBD";

/// Token alphabet shared by the locator and the field extractor.
#[derive(Debug, Clone)]
pub struct TokenRules {
    stoplist: HashSet<String>,
}

impl TokenRules {
    pub fn new(stoplist: HashSet<String>) -> Self {
        Self { stoplist }
    }

    pub fn is_stopword(&self, token: &str) -> bool {
        self.stoplist.contains(token)
    }

    /// Team-code tokens in document order, stoplist removed.
    pub fn team_tokens(&self, text: &str) -> Vec<String> {
        TEAM_RE
            .find_iter(text)
            .map(|m| m.as_str())
            .filter(|t| !self.is_stopword(t))
            .map(str::to_string)
            .collect()
    }

    pub fn percentages(&self, text: &str) -> Vec<u32> {
        percentages(text)
    }

    /// Long form first, then short form.
    pub fn game_time(&self, text: &str) -> Option<String> {
        TIME_LONG_RE
            .find(text)
            .or_else(|| TIME_SHORT_RE.find(text))
            .map(|m| collapse_whitespace(m.as_str()))
    }
}

/// One value per `<digits>%` match, so positions line up with
/// `count_percentages`. Values too large for `u32` saturate.
pub fn percentages(text: &str) -> Vec<u32> {
    PCT_RE
        .captures_iter(text)
        .map(|c| c[1].parse::<u32>().unwrap_or(u32::MAX))
        .collect()
}

pub fn count_percentages(text: &str) -> usize {
    PCT_RE.find_iter(text).count()
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
