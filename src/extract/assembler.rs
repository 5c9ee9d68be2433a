use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::types::{ExtractedFields, GameRecord, PctSlot, PctValue, Splits};

/// Position `i` of a percentage sequence lands in `order[i]`; positions past
/// the end of the sequence stay "N/A".
pub fn map_slots(sequence: &[u32], order: &[PctSlot; 6]) -> Splits {
    let mut splits = Splits::default();
    for (i, slot) in order.iter().enumerate() {
        splits.set(*slot, PctValue(sequence.get(i).copied()));
    }
    splits
}

/// Builds records in discovery order, keeping only the first record for
/// each (away, home) pair.
pub fn assemble<'a, I>(extracted: I, order: &[PctSlot; 6], now: DateTime<Utc>) -> Vec<GameRecord>
where
    I: IntoIterator<Item = &'a ExtractedFields>,
{
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut records = Vec::new();

    for fields in extracted {
        let Some(record) = build_record(fields, order, now) else {
            continue;
        };
        if seen.insert((record.away_team.clone(), record.home_team.clone())) {
            records.push(record);
        }
    }
    records
}

fn build_record(fields: &ExtractedFields, order: &[PctSlot; 6], now: DateTime<Utc>) -> Option<GameRecord> {
    let [away_team, home_team, ..] = fields.team_tokens.as_slice() else {
        return None;
    };
    if away_team == home_team {
        return None;
    }

    let (splits, away_splits, home_splits) = match &fields.split {
        Some(sides) => {
            let away = map_slots(&sides.away, order);
            let home = map_slots(&sides.home, order);
            (away, Some(away), Some(home))
        }
        None => (map_slots(&fields.percentages, order), None, None),
    };

    Some(GameRecord {
        game_time: fields.time_text.clone(),
        away_team: away_team.clone(),
        home_team: home_team.clone(),
        splits,
        away_splits,
        home_splits,
        timestamp: now,
    })
}
