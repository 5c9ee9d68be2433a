//! Candidate location: an ordered chain of strategies, each proposing the
//! nodes it believes hold one game. The first strategy that proposes at
//! least one qualifying candidate wins; later strategies are not consulted.

use std::collections::{HashMap, HashSet};

use regex::Regex;
use scraper::ElementRef;
use tracing::debug;

use crate::config::ExtractionConfig;
use crate::document::{self, Document};
use crate::extract::fields::{self, Extraction};
use crate::extract::patterns::{count_percentages, TokenRules, GAME_LINE_RE};

/// Generic containers strategy 4 looks at.
const CONTAINER_TAGS: &[&str] = &["div", "tr", "section", "article", "li"];

/// Block-level ancestors strategy 5 may climb to.
const BLOCK_TAGS: &[&str] = &[
    "div", "tr", "li", "section", "article", "p", "tbody", "table", "ul", "ol", "main",
];

/// A node (or run of text) suspected to hold one game's data. Borrows from
/// the document, so it only lives as long as the cycle.
#[derive(Debug, Clone)]
pub enum Candidate<'a> {
    /// One element whose text holds the whole game.
    Container(ElementRef<'a>),
    /// Away and home sub-rows, with an optional preceding time row.
    Rows {
        time: Option<ElementRef<'a>>,
        away: ElementRef<'a>,
        home: ElementRef<'a>,
    },
    /// A span of flattened page text.
    Span(String),
}

impl Candidate<'_> {
    pub fn text(&self) -> String {
        match self {
            Candidate::Container(el) => document::text(*el, " "),
            Candidate::Rows { time, away, home } => time
                .iter()
                .chain([away, home])
                .map(|row| document::text(*row, " "))
                .collect::<Vec<_>>()
                .join(" "),
            Candidate::Span(text) => text.clone(),
        }
    }
}

/// One heuristic for finding candidates.
pub trait LocatorStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Candidates in document order. Must not consult other strategies.
    fn propose<'a>(&self, doc: &'a Document, rules: &TokenRules) -> Vec<Candidate<'a>>;
}

/// Winning strategy and its candidates.
#[derive(Debug)]
pub struct Located<'a> {
    pub strategy: &'static str,
    pub candidates: Vec<Candidate<'a>>,
}

pub struct Locator {
    strategies: Vec<Box<dyn LocatorStrategy>>,
    max_candidates: usize,
}

impl Locator {
    /// Builds the default chain, most specific structural signal first.
    pub fn from_config(cfg: &ExtractionConfig) -> Result<Self, regex::Error> {
        let strategies: Vec<Box<dyn LocatorStrategy>> = vec![
            Box::new(MarkedTableBody {
                name: "exact_tbody_class",
                class_re: class_regex(&cfg.exact_tbody_classes, ClassMatch::Exact)?,
            }),
            Box::new(MarkedTableBody {
                name: "loose_tbody_class",
                class_re: class_regex(&cfg.loose_tbody_classes, ClassMatch::Substring)?,
            }),
            Box::new(AnyTableBody),
            Box::new(KeywordContainer {
                class_re: class_regex(&cfg.container_keywords, ClassMatch::Substring)?,
            }),
            Box::new(PercentAncestor),
            Box::new(TextScan),
        ];
        Ok(Self::with_strategies(strategies, cfg.max_candidates))
    }

    pub fn with_strategies(strategies: Vec<Box<dyn LocatorStrategy>>, max_candidates: usize) -> Self {
        Self { strategies, max_candidates }
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Candidates from the first strategy that yields a qualifying one, or
    /// `None` when every strategy fails. The cap counts qualifying
    /// candidates only; non-qualifying ones before the cutoff are kept so
    /// they show up as skips.
    pub fn locate<'a>(&self, doc: &'a Document, rules: &TokenRules) -> Option<Located<'a>> {
        for strategy in &self.strategies {
            let proposed = strategy.propose(doc, rules);
            let proposed_count = proposed.len();

            let mut candidates = Vec::new();
            let mut qualifying = 0;
            for candidate in proposed {
                if qualifying == self.max_candidates {
                    break;
                }
                if qualifies(&candidate, rules) {
                    qualifying += 1;
                }
                candidates.push(candidate);
            }

            debug!(
                strategy = strategy.name(),
                proposed = proposed_count,
                qualifying,
                "locator strategy tried"
            );
            if qualifying > 0 {
                return Some(Located {
                    strategy: strategy.name(),
                    candidates,
                });
            }
        }
        None
    }
}

/// ≥2 percentages and ≥2 team codes once filtered.
pub fn qualifies(candidate: &Candidate<'_>, rules: &TokenRules) -> bool {
    matches!(fields::extract(candidate, rules), Extraction::Fields(_))
}

// ---------------------------------------------------------------------------
// Strategies 1 + 2: marked table bodies
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
enum ClassMatch {
    /// One of the element's classes equals a marker.
    Exact,
    /// The class attribute contains a marker, case-insensitively.
    Substring,
}

/// `None` when there are no markers, so the strategy proposes nothing.
fn class_regex(markers: &[String], mode: ClassMatch) -> Result<Option<Regex>, regex::Error> {
    if markers.is_empty() {
        return Ok(None);
    }
    let alternation = markers.iter().map(|m| regex::escape(m)).collect::<Vec<_>>().join("|");
    let pattern = match mode {
        ClassMatch::Exact => format!(r"(?:^|\s)(?:{alternation})(?:\s|$)"),
        ClassMatch::Substring => format!(r"(?i)(?:{alternation})"),
    };
    Regex::new(&pattern).map(Some)
}

/// Rows under table bodies whose class attribute matches a marker.
struct MarkedTableBody {
    name: &'static str,
    class_re: Option<Regex>,
}

impl LocatorStrategy for MarkedTableBody {
    fn name(&self) -> &'static str {
        self.name
    }

    fn propose<'a>(&self, doc: &'a Document, rules: &TokenRules) -> Vec<Candidate<'a>> {
        let Some(class_re) = &self.class_re else {
            return Vec::new();
        };
        doc.find_all(&["tbody"], Some(class_re))
            .into_iter()
            .flat_map(|tbody| group_rows(&document::child_elements(tbody, &["tr"]), rules))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Strategy 3: any table body
// ---------------------------------------------------------------------------

/// Rows under any table body. A lone tbody is cut into fixed groups of
/// three rows: time, away, home.
struct AnyTableBody;

impl LocatorStrategy for AnyTableBody {
    fn name(&self) -> &'static str {
        "any_tbody"
    }

    fn propose<'a>(&self, doc: &'a Document, rules: &TokenRules) -> Vec<Candidate<'a>> {
        let bodies = doc.find_all(&["tbody"], None);
        if let [tbody] = bodies.as_slice() {
            return document::child_elements(*tbody, &["tr"])
                .chunks_exact(3)
                .map(|group| Candidate::Rows {
                    time: Some(group[0]),
                    away: group[1],
                    home: group[2],
                })
                .collect();
        }
        bodies
            .into_iter()
            .flat_map(|tbody| group_rows(&document::child_elements(tbody, &["tr"]), rules))
            .collect()
    }
}

/// Walks table rows pairing away/home sub-rows. A row carrying a time and no
/// percentages starts a new game; a row with both teams and percentages is a
/// game on its own.
fn group_rows<'a>(rows: &[ElementRef<'a>], rules: &TokenRules) -> Vec<Candidate<'a>> {
    let mut out = Vec::new();
    let mut time: Option<ElementRef<'a>> = None;
    let mut away: Option<ElementRef<'a>> = None;

    for &row in rows {
        let text = document::text(row, " ");
        let pcts = count_percentages(&text);
        let teams = rules.team_tokens(&text).len();

        if pcts == 0 {
            if rules.game_time(&text).is_some() {
                time = Some(row);
                away = None;
            }
            continue;
        }
        if teams >= 2 && away.is_none() {
            out.push(Candidate::Container(row));
            time = None;
            continue;
        }
        if teams >= 1 {
            match away.take() {
                None => away = Some(row),
                Some(away_row) => out.push(Candidate::Rows {
                    time: time.take(),
                    away: away_row,
                    home: row,
                }),
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Strategy 4: keyword containers
// ---------------------------------------------------------------------------

/// div/tr/section nodes whose class mentions game, match, betting, ...
/// An outer match is dropped when a match inside it already qualifies.
struct KeywordContainer {
    class_re: Option<Regex>,
}

impl LocatorStrategy for KeywordContainer {
    fn name(&self) -> &'static str {
        "keyword_container"
    }

    fn propose<'a>(&self, doc: &'a Document, rules: &TokenRules) -> Vec<Candidate<'a>> {
        let Some(class_re) = &self.class_re else {
            return Vec::new();
        };
        let matches = doc.find_all(CONTAINER_TAGS, Some(class_re));
        let qualifying: Vec<ElementRef<'a>> = matches
            .iter()
            .copied()
            .filter(|el| qualifies(&Candidate::Container(*el), rules))
            .collect();

        matches
            .into_iter()
            .filter(|outer| {
                !qualifying
                    .iter()
                    .any(|inner| inner.id() != outer.id() && document::is_inside(*inner, *outer))
            })
            .map(Candidate::Container)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Strategy 5: ancestors of percentage text
// ---------------------------------------------------------------------------

/// For each text chunk holding a percentage, the nearest block-level
/// ancestor whose text carries at least two percentages. Innermost wins
/// when results nest.
struct PercentAncestor;

impl PercentAncestor {
    /// `pct_count` is memoized by the caller, so each block's text is
    /// flattened at most once per document.
    fn nearest_block<'a, F>(start: ElementRef<'a>, pct_count: &mut F) -> Option<ElementRef<'a>>
    where
        F: FnMut(ElementRef<'a>) -> usize,
    {
        let mut node = Some(start);
        while let Some(el) = node {
            let tag = document::tag_name(el);
            if tag == "body" || tag == "html" {
                return None;
            }
            if BLOCK_TAGS.contains(&tag) && pct_count(el) >= 2 {
                return Some(el);
            }
            node = document::parent(el);
        }
        None
    }
}

impl LocatorStrategy for PercentAncestor {
    fn name(&self) -> &'static str {
        "percent_ancestor"
    }

    fn propose<'a>(&self, doc: &'a Document, _rules: &TokenRules) -> Vec<Candidate<'a>> {
        let mut counts = HashMap::new();
        let mut pct_count = |el: ElementRef<'a>| {
            *counts
                .entry(el.id())
                .or_insert_with(|| count_percentages(&document::text(el, " ")))
        };

        let mut seen = HashSet::new();
        let blocks: Vec<ElementRef<'a>> = doc
            .text_nodes()
            .into_iter()
            .filter(|(_, text)| count_percentages(text) > 0)
            .filter_map(|(parent, _)| Self::nearest_block(parent, &mut pct_count))
            .filter(|block| seen.insert(block.id()))
            .collect();

        blocks
            .iter()
            .copied()
            .filter(|outer| {
                !blocks
                    .iter()
                    .any(|inner| inner.id() != outer.id() && document::is_inside(*inner, *outer))
            })
            .map(Candidate::Container)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Strategy 6: flat text scan
// ---------------------------------------------------------------------------

/// Last resort: regex over the flattened page text for
/// `[time] TEAM n% n% TEAM n% n%`.
struct TextScan;

impl LocatorStrategy for TextScan {
    fn name(&self) -> &'static str {
        "text_scan"
    }

    fn propose<'a>(&self, doc: &'a Document, _rules: &TokenRules) -> Vec<Candidate<'a>> {
        let text = doc.full_text(" ");
        GAME_LINE_RE
            .find_iter(&text)
            .map(|m| Candidate::Span(m.as_str().to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::fixtures;

    fn setup(html: &str) -> (Document, Locator, TokenRules) {
        let cfg = ExtractionConfig::default();
        (
            Document::parse(html.as_bytes()).unwrap(),
            Locator::from_config(&cfg).unwrap(),
            TokenRules::new(cfg.stoplist),
        )
    }

    fn propose_with<'a>(name: &str, locator: &Locator, doc: &'a Document, rules: &TokenRules) -> Vec<Candidate<'a>> {
        locator
            .strategies
            .iter()
            .find(|s| s.name() == name)
            .unwrap()
            .propose(doc, rules)
    }

    #[test]
    fn chain_order_is_fixed() {
        let (_, locator, _) = setup("<p></p>");
        assert_eq!(
            locator.strategy_names(),
            vec![
                "exact_tbody_class",
                "loose_tbody_class",
                "any_tbody",
                "keyword_container",
                "percent_ancestor",
                "text_scan"
            ]
        );
    }

    #[test]
    fn exact_tbody_groups_time_away_home_rows() {
        let (doc, locator, rules) = setup(fixtures::EXACT_TBODY);
        let located = locator.locate(&doc, &rules).unwrap();
        assert_eq!(located.strategy, "exact_tbody_class");
        assert_eq!(located.candidates.len(), 2);
        assert!(matches!(located.candidates[0], Candidate::Rows { time: Some(_), .. }));
    }

    #[test]
    fn exact_marker_does_not_match_prefixes() {
        let (doc, locator, rules) = setup(fixtures::LOOSE_TBODY);
        assert!(propose_with("exact_tbody_class", &locator, &doc, &rules).is_empty());
        let located = locator.locate(&doc, &rules).unwrap();
        assert_eq!(located.strategy, "loose_tbody_class");
    }

    #[test]
    fn lone_unmarked_tbody_is_cut_into_threes() {
        let (doc, locator, rules) = setup(fixtures::PLAIN_TBODY);
        let candidates = propose_with("any_tbody", &locator, &doc, &rules);
        // 7 rows → two full groups, trailing row dropped
        assert_eq!(candidates.len(), 2);
        let located = locator.locate(&doc, &rules).unwrap();
        assert_eq!(located.strategy, "any_tbody");
    }

    #[test]
    fn several_unmarked_tbodies_are_grouped_per_body() {
        let (doc, locator, rules) = setup(fixtures::MULTI_TBODY);
        let candidates = propose_with("any_tbody", &locator, &doc, &rules);
        assert_eq!(candidates.len(), 2);
        assert!(matches!(candidates[0], Candidate::Rows { time: Some(_), .. }));
        assert!(matches!(candidates[1], Candidate::Container(_)));
        assert!(candidates[1].text().contains("LAD"));

        let located = locator.locate(&doc, &rules).unwrap();
        assert_eq!(located.strategy, "any_tbody");
        assert_eq!(located.candidates.len(), 2);
    }

    #[test]
    fn keyword_containers_prefer_innermost_qualifying() {
        let (doc, locator, rules) = setup(fixtures::GAME_CARDS);
        let candidates = propose_with("keyword_container", &locator, &doc, &rules);
        let texts: Vec<String> = candidates.iter().map(Candidate::text).collect();
        assert_eq!(texts.len(), 2, "{texts:?}");
        assert!(texts[0].contains("LAD"));
        assert!(texts[1].contains("SF"));
    }

    #[test]
    fn percent_ancestor_finds_unclassed_blocks() {
        let (doc, locator, rules) = setup(fixtures::BARE_DIVS);
        for name in ["exact_tbody_class", "loose_tbody_class", "any_tbody", "keyword_container"] {
            assert!(propose_with(name, &locator, &doc, &rules).is_empty(), "{name}");
        }
        let located = locator.locate(&doc, &rules).unwrap();
        assert_eq!(located.strategy, "percent_ancestor");
        assert_eq!(located.candidates.len(), 2);
    }

    #[test]
    fn text_scan_is_last_resort() {
        let (doc, locator, rules) = setup(fixtures::FLAT_TEXT);
        let located = locator.locate(&doc, &rules).unwrap();
        assert_eq!(located.strategy, "text_scan");
        assert_eq!(located.candidates.len(), 2);
        assert_eq!(located.candidates[0].text(), "7:10 PM NYY 45% 42% BOS 55% 58%");
    }

    #[test]
    fn no_percentages_means_no_candidates() {
        let (doc, locator, rules) = setup(fixtures::NO_PERCENTAGES);
        assert!(locator.locate(&doc, &rules).is_none());
    }

    #[test]
    fn earlier_strategy_wins_even_when_later_ones_match() {
        let (doc, locator, rules) = setup(fixtures::EXACT_TBODY);
        assert!(!propose_with("percent_ancestor", &locator, &doc, &rules).is_empty());
        assert_eq!(locator.locate(&doc, &rules).unwrap().strategy, "exact_tbody_class");
    }

    #[test]
    fn nested_percent_blocks_keep_innermost() {
        // first div qualifies on its own text but holds a qualifying <p>;
        // second div is reached twice, once per span
        let html = r#"<html><body><section>
            <div>NYY 45% 42% <p>BOS 55% 58%</p></div>
            <div><span>TB 62%</span> <span>58%</span></div>
        </section></body></html>"#;
        let (doc, locator, rules) = setup(html);
        let candidates = propose_with("percent_ancestor", &locator, &doc, &rules);
        let texts: Vec<String> = candidates.iter().map(Candidate::text).collect();
        assert_eq!(texts, vec!["BOS 55% 58%", "TB 62% 58%"]);
    }

    #[test]
    fn cap_counts_only_qualifying_candidates() {
        let html = fixtures::nav_before_card(60);
        let (doc, locator, rules) = setup(&html);
        let located = locator.locate(&doc, &rules).unwrap();
        assert_eq!(located.strategy, "keyword_container");
        assert_eq!(located.candidates.len(), 61);
        assert!(qualifies(&located.candidates[60], &rules));
    }

    struct FixedLine {
        name: &'static str,
        line: &'static str,
    }

    impl LocatorStrategy for FixedLine {
        fn name(&self) -> &'static str {
            self.name
        }

        fn propose<'a>(&self, _doc: &'a Document, _rules: &TokenRules) -> Vec<Candidate<'a>> {
            vec![Candidate::Span(self.line.to_string())]
        }
    }

    #[test]
    fn custom_strategies_run_in_given_order() {
        let (doc, _, rules) = setup(fixtures::NO_PERCENTAGES);
        let strategies: Vec<Box<dyn LocatorStrategy>> = vec![
            Box::new(FixedLine { name: "jargon_only", line: "ML 50% 50%" }),
            Box::new(FixedLine { name: "one_game", line: "NYY 45% 42% BOS 55% 58%" }),
            Box::new(FixedLine { name: "never_reached", line: "TB 62% 58% TOR 38% 42%" }),
        ];
        let locator = Locator::with_strategies(strategies, 10);
        assert_eq!(locator.strategy_names(), vec!["jargon_only", "one_game", "never_reached"]);

        let located = locator.locate(&doc, &rules).unwrap();
        assert_eq!(located.strategy, "one_game");
        assert_eq!(located.candidates[0].text(), "NYY 45% 42% BOS 55% 58%");
    }

    #[test]
    fn candidate_cap_is_applied() {
        let cfg = ExtractionConfig {
            max_candidates: 1,
            ..ExtractionConfig::default()
        };
        let doc = Document::parse(fixtures::EXACT_TBODY.as_bytes()).unwrap();
        let locator = Locator::from_config(&cfg).unwrap();
        let located = locator.locate(&doc, &TokenRules::new(cfg.stoplist)).unwrap();
        assert_eq!(located.candidates.len(), 1);
    }
}
