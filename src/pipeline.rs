use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::ExtractionConfig;
use crate::document::Document;
use crate::error::{AppError, CycleError, Result};
use crate::extract::{assembler, fields, Extraction, Locator, TokenRules};
use crate::types::{GameRecord, PctSlot};

/// Parse → locate → extract → assemble. Pure and synchronous; the parsed
/// document never leaves `run`.
pub struct Pipeline {
    rules: TokenRules,
    locator: Locator,
    slot_order: [PctSlot; 6],
}

/// What one successful extraction produced.
#[derive(Debug, Clone)]
pub struct ExtractionReport {
    pub strategy: &'static str,
    pub candidates: usize,
    pub skipped: Vec<String>,
    pub records: Vec<GameRecord>,
}

impl Pipeline {
    pub fn new(cfg: &ExtractionConfig) -> Result<Self> {
        let locator = Locator::from_config(cfg)
            .map_err(|e| AppError::Config(format!("invalid class marker: {e}")))?;
        Ok(Self {
            rules: TokenRules::new(cfg.stoplist.clone()),
            locator,
            slot_order: cfg.slot_order,
        })
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.locator.strategy_names()
    }

    pub fn run(
        &self,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> std::result::Result<ExtractionReport, CycleError> {
        let doc = Document::parse(body)?;

        let Some(located) = self.locator.locate(&doc, &self.rules) else {
            return Err(CycleError::TotalExtraction {
                strategy: "none",
                candidates: 0,
                skipped: 0,
            });
        };

        let mut extracted = Vec::with_capacity(located.candidates.len());
        let mut skipped = Vec::new();
        for (idx, candidate) in located.candidates.iter().enumerate() {
            match fields::extract(candidate, &self.rules) {
                Extraction::Fields(f) => extracted.push(f),
                Extraction::Skip(reason) => {
                    debug!(strategy = located.strategy, candidate = idx, %reason, "candidate skipped");
                    skipped.push(reason.to_string());
                }
            }
        }

        let records = assembler::assemble(&extracted, &self.slot_order, now);
        if records.is_empty() {
            return Err(CycleError::TotalExtraction {
                strategy: located.strategy,
                candidates: located.candidates.len(),
                skipped: skipped.len(),
            });
        }

        Ok(ExtractionReport {
            strategy: located.strategy,
            candidates: located.candidates.len(),
            skipped,
            records,
        })
    }
}
