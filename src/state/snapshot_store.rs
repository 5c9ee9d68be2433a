use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::types::Snapshot;

// ---------------------------------------------------------------------------
// SnapshotStore
// ---------------------------------------------------------------------------

/// Current snapshot per sport key. Publishing swaps the whole `Arc`, so a
/// reader holding the old one keeps a complete view while the new one lands.
pub struct SnapshotStore {
    /// sport_key → last published snapshot
    snapshots: DashMap<String, Arc<Snapshot>>,
}

impl SnapshotStore {
    /// Starts with an empty snapshot for each served sport.
    pub fn new<I, S>(sport_keys: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let snapshots = DashMap::new();
        for key in sport_keys {
            let key = key.as_ref();
            snapshots.insert(key.to_string(), Arc::new(Snapshot::empty(key)));
        }
        Arc::new(Self { snapshots })
    }

    /// `None` for a sport the store was never created for.
    pub fn current(&self, sport_key: &str) -> Option<Arc<Snapshot>> {
        self.snapshots.get(sport_key).map(|s| Arc::clone(s.value()))
    }

    /// Replaces the snapshot for `snapshot.sport_key` wholesale.
    pub fn publish(&self, snapshot: Snapshot) {
        self.snapshots.insert(snapshot.sport_key.clone(), Arc::new(snapshot));
    }

    /// Every sport's snapshot, sorted by sport key.
    pub fn all(&self) -> Vec<Arc<Snapshot>> {
        let mut all: Vec<Arc<Snapshot>> = self.snapshots.iter().map(|r| Arc::clone(r.value())).collect();
        all.sort_by(|a, b| a.sport_key.cmp(&b.sport_key));
        all
    }

    pub fn sport_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.snapshots.iter().map(|r| r.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Most recent publication across all sports.
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.snapshots.iter().filter_map(|r| r.value().last_updated).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GameRecord, Splits};

    fn record(away: &str, home: &str, now: DateTime<Utc>) -> GameRecord {
        GameRecord {
            game_time: "7:10 PM".to_string(),
            away_team: away.to_string(),
            home_team: home.to_string(),
            splits: Splits::default(),
            away_splits: None,
            home_splits: None,
            timestamp: now,
        }
    }

    fn populated(records: Vec<GameRecord>, now: DateTime<Utc>) -> Snapshot {
        Snapshot {
            sport_key: "mlb".to_string(),
            records,
            last_updated: Some(now),
            strategy: Some("exact_tbody_class"),
        }
    }

    #[test]
    fn starts_empty() {
        let store = SnapshotStore::new(["mlb"]);
        let snap = store.current("mlb").unwrap();
        assert!(snap.records.is_empty());
        assert!(snap.last_updated.is_none());
        assert!(store.current("nfl").is_none());
        assert!(store.last_updated().is_none());
    }

    #[test]
    fn publish_replaces_whole_snapshot() {
        let store = SnapshotStore::new(["mlb"]);
        let now = Utc::now();
        store.publish(populated(vec![record("NYY", "BOS", now), record("TB", "TOR", now)], now));

        let before = store.current("mlb").unwrap();
        store.publish(populated(vec![record("LAD", "SD", now)], now));
        let after = store.current("mlb").unwrap();

        // the reader's old handle is untouched by the swap
        assert_eq!(before.records.len(), 2);
        assert_eq!(after.records.len(), 1);
        assert_eq!(after.records[0].matchup(), ("LAD", "SD"));
        assert_eq!(store.last_updated(), Some(now));
    }

    #[test]
    fn all_is_sorted_by_sport() {
        let store = SnapshotStore::new(["nfl", "mlb"]);
        assert_eq!(store.sport_keys(), vec!["mlb", "nfl"]);
        let keys: Vec<String> = store.all().iter().map(|s| s.sport_key.clone()).collect();
        assert_eq!(keys, vec!["mlb", "nfl"]);
    }
}
