use std::fmt;

use crate::document;
use crate::extract::locator::Candidate;
use crate::extract::patterns::{TokenRules, TBD};
use crate::types::{ExtractedFields, SideSequences};

/// Per-candidate result. A skip is an expected outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Fields(ExtractedFields),
    Skip(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Fewer than two distinct team codes survived the stoplist.
    TooFewTeams { found: usize },
    TooFewPercentages { found: usize },
    /// Away and home sub-rows lead with the same code.
    SameTeam(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::TooFewTeams { found } => write!(f, "too few team codes ({found})"),
            SkipReason::TooFewPercentages { found } => write!(f, "too few percentages ({found})"),
            SkipReason::SameTeam(code) => write!(f, "away and home are both {code}"),
        }
    }
}

/// Pulls the time, team codes and percentages out of one candidate.
pub fn extract(candidate: &Candidate<'_>, rules: &TokenRules) -> Extraction {
    match candidate {
        Candidate::Rows { time, away, home } => {
            let away_text = document::text(*away, " ");
            let home_text = document::text(*home, " ");
            let time_source = match time {
                Some(row) => document::text(*row, " "),
                None => format!("{away_text} {home_text}"),
            };
            extract_rows(&time_source, &away_text, &home_text, rules)
        }
        Candidate::Container(_) | Candidate::Span(_) => extract_flat(&candidate.text(), rules),
    }
}

/// Single text run: the first two distinct surviving codes are away and home.
fn extract_flat(text: &str, rules: &TokenRules) -> Extraction {
    let mut distinct: Vec<String> = Vec::with_capacity(2);
    for token in rules.team_tokens(text) {
        if !distinct.contains(&token) {
            distinct.push(token);
        }
        if distinct.len() == 2 {
            break;
        }
    }
    if distinct.len() < 2 {
        return Extraction::Skip(SkipReason::TooFewTeams { found: distinct.len() });
    }

    let percentages = rules.percentages(text);
    if percentages.len() < 2 {
        return Extraction::Skip(SkipReason::TooFewPercentages { found: percentages.len() });
    }

    Extraction::Fields(ExtractedFields {
        time_text: rules.game_time(text).unwrap_or_else(|| TBD.to_string()),
        team_tokens: distinct,
        percentages,
        split: None,
    })
}

/// Away and home sub-rows: the first surviving code of each row is authoritative.
fn extract_rows(time_source: &str, away_text: &str, home_text: &str, rules: &TokenRules) -> Extraction {
    let away_team = rules.team_tokens(away_text).into_iter().next();
    let home_team = rules.team_tokens(home_text).into_iter().next();
    let (away_team, home_team) = match (away_team, home_team) {
        (Some(a), Some(h)) => (a, h),
        (a, h) => {
            let found = usize::from(a.is_some()) + usize::from(h.is_some());
            return Extraction::Skip(SkipReason::TooFewTeams { found });
        }
    };
    if away_team == home_team {
        return Extraction::Skip(SkipReason::SameTeam(away_team));
    }

    let away = rules.percentages(away_text);
    let home = rules.percentages(home_text);
    let percentages: Vec<u32> = away.iter().chain(home.iter()).copied().collect();
    if percentages.len() < 2 {
        return Extraction::Skip(SkipReason::TooFewPercentages { found: percentages.len() });
    }

    Extraction::Fields(ExtractedFields {
        time_text: rules.game_time(time_source).unwrap_or_else(|| TBD.to_string()),
        team_tokens: vec![away_team, home_team],
        percentages,
        split: Some(SideSequences { away, home }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractionConfig;
    use crate::document::Document;

    fn rules() -> TokenRules {
        TokenRules::new(ExtractionConfig::default().stoplist)
    }

    fn fields(e: Extraction) -> ExtractedFields {
        match e {
            Extraction::Fields(f) => f,
            Extraction::Skip(reason) => panic!("unexpected skip: {reason}"),
        }
    }

    #[test]
    fn flat_text_takes_first_two_distinct_codes() {
        let c = Candidate::Span("ML 8:05 PM NYY NYY vs BOS 45% 42% 55%".to_string());
        let f = fields(extract(&c, &rules()));
        assert_eq!(f.team_tokens, vec!["NYY", "BOS"]);
        assert_eq!(f.percentages, vec![45, 42, 55]);
        assert_eq!(f.time_text, "8:05 PM");
        assert!(f.split.is_none());
    }

    #[test]
    fn missing_time_is_tbd() {
        let c = Candidate::Span("LAD 60% 40% SD".to_string());
        assert_eq!(fields(extract(&c, &rules())).time_text, "TBD");
    }

    #[test]
    fn too_few_teams_or_percentages_is_skipped() {
        let r = rules();
        assert_eq!(
            extract(&Candidate::Span("NYY 45% 55% ATS ML".to_string()), &r),
            Extraction::Skip(SkipReason::TooFewTeams { found: 1 })
        );
        assert_eq!(
            extract(&Candidate::Span("NYY BOS 45%".to_string()), &r),
            Extraction::Skip(SkipReason::TooFewPercentages { found: 1 })
        );
    }

    #[test]
    fn two_rows_extract_per_side() {
        let html = r#"<table><tbody>
            <tr><td>Jun 26, 1:10 PM</td></tr>
            <tr><td>NYY</td><td>(ML)</td><td>45%</td><td>42%</td><td>48%</td></tr>
            <tr><td>BOS</td><td>NYY fans</td><td>55%</td><td>58%</td></tr>
        </tbody></table>"#;
        let doc = Document::parse(html.as_bytes()).unwrap();
        let rows = doc.find_all(&["tr"], None);
        let c = Candidate::Rows {
            time: Some(rows[0]),
            away: rows[1],
            home: rows[2],
        };
        let f = fields(extract(&c, &rules()));
        assert_eq!(f.time_text, "Jun 26, 1:10 PM");
        assert_eq!(f.team_tokens, vec!["NYY", "BOS"]);
        assert_eq!(f.percentages, vec![45, 42, 48, 55, 58]);
        assert_eq!(
            f.split,
            Some(SideSequences {
                away: vec![45, 42, 48],
                home: vec![55, 58],
            })
        );
    }

    #[test]
    fn same_code_on_both_rows_is_skipped() {
        let html = "<table><tbody><tr><td>NYY 50%</td></tr><tr><td>NYY 50%</td></tr></tbody></table>";
        let doc = Document::parse(html.as_bytes()).unwrap();
        let rows = doc.find_all(&["tr"], None);
        let c = Candidate::Rows {
            time: None,
            away: rows[0],
            home: rows[1],
        };
        assert_eq!(
            extract(&c, &rules()),
            Extraction::Skip(SkipReason::SameTeam("NYY".to_string()))
        );
    }
}
