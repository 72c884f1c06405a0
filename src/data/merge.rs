//! Merge of stored history with freshly ingested fixtures
//!
//! Records are keyed by `(date, league, home_team, away_team)`. A settled
//! record is never replaced by an unsettled one; otherwise the later record
//! wins. Output is sorted by key, so merging the same batch twice gives the
//! same dataset.

use crate::{MatchKey, MatchRecord};
use std::collections::BTreeMap;

/// What the incoming batch did to the dataset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// New fixtures
    pub added: usize,
    /// Placeholders replaced by a final score
    pub settled: usize,
    /// Existing fixtures whose content changed otherwise
    pub updated: usize,
    pub unchanged: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    pub records: Vec<MatchRecord>,
    pub stats: MergeStats,
}

/// Record change when `incoming` meets `existing` under the same key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Change {
    Settled,
    Updated,
    Unchanged,
}

/// Pick the record to keep for one key
fn resolve(existing: &mut MatchRecord, mut incoming: MatchRecord) -> Change {
    if existing.is_settled() && !incoming.is_settled() {
        fill_missing(existing, &incoming);
        return Change::Unchanged;
    }

    fill_missing(&mut incoming, existing);
    if incoming == *existing {
        return Change::Unchanged;
    }

    let change = if !existing.is_settled() && incoming.is_settled() {
        Change::Settled
    } else {
        Change::Updated
    };
    *existing = incoming;
    change
}

/// Fill in details the winner lacks from the record it replaces
fn fill_missing(winner: &mut MatchRecord, other: &MatchRecord) {
    if winner.time.is_none() {
        winner.time = other.time;
    }
    if winner.country.is_empty() {
        winner.country = other.country.clone();
    }
}

fn insert(map: &mut BTreeMap<MatchKey, MatchRecord>, record: MatchRecord) -> Option<Change> {
    let key = record.key();
    match map.get_mut(&key) {
        Some(existing) => Some(resolve(existing, record)),
        None => {
            map.insert(key, record);
            None
        }
    }
}

/// Merge an incoming batch into the historical dataset
pub fn merge(historical: Vec<MatchRecord>, incoming: Vec<MatchRecord>) -> MergeOutcome {
    let mut map = BTreeMap::new();

    let history_len = historical.len();
    for record in historical {
        insert(&mut map, record);
    }
    if map.len() < history_len {
        log::info!(
            "Collapsed {} duplicate rows in stored history",
            history_len - map.len()
        );
    }

    let mut stats = MergeStats::default();
    for record in incoming {
        match insert(&mut map, record) {
            None => stats.added += 1,
            Some(Change::Settled) => stats.settled += 1,
            Some(Change::Updated) => stats.updated += 1,
            Some(Change::Unchanged) => stats.unchanged += 1,
        }
    }

    MergeOutcome {
        records: map.into_values().collect(),
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Score;
    use chrono::{NaiveDate, NaiveTime};

    fn fixture(day: u32, home: &str, away: &str, score: Option<(u8, u8)>) -> MatchRecord {
        MatchRecord {
            date: NaiveDate::from_ymd_opt(2024, 8, day).unwrap(),
            time: None,
            home_team: home.to_string(),
            away_team: away.to_string(),
            score: score.map(|(h, a)| Score::new(h, a)),
            league: "Premier League".to_string(),
            country: "England".to_string(),
        }
    }

    #[test]
    fn test_merge_is_idempotent() {
        let history = vec![
            fixture(17, "Arsenal", "Wolves", Some((2, 0))),
            fixture(24, "Villa", "Arsenal", None),
        ];
        let incoming = vec![
            fixture(24, "Villa", "Arsenal", Some((0, 2))),
            fixture(31, "Arsenal", "Brighton", None),
        ];

        let once = merge(history.clone(), incoming.clone());
        let twice = merge(once.records.clone(), incoming);
        let folded = merge(history, once.records.clone());

        assert_eq!(once.records, twice.records);
        assert_eq!(folded.records, once.records);
        assert_eq!(once.records.len(), 3);
        assert_eq!(twice.stats.unchanged, 2);
        assert_eq!(twice.stats.added, 0);
    }

    #[test]
    fn test_settled_result_replaces_placeholder() {
        let placeholder = fixture(24, "Villa", "Arsenal", None);
        let result = fixture(24, "Villa", "Arsenal", Some((0, 2)));

        let outcome = merge(vec![placeholder.clone()], vec![result.clone()]);
        assert_eq!(outcome.records, vec![result.clone()]);
        assert_eq!(outcome.stats.settled, 1);

        // A late placeholder never unsettles a result
        let outcome = merge(vec![result.clone()], vec![placeholder]);
        assert_eq!(outcome.records, vec![result]);
        assert_eq!(outcome.stats.unchanged, 1);
    }

    #[test]
    fn test_latest_settled_wins() {
        let original = fixture(17, "Arsenal", "Wolves", Some((2, 0)));
        let corrected = fixture(17, "Arsenal", "Wolves", Some((2, 1)));

        let outcome = merge(vec![original], vec![corrected.clone()]);
        assert_eq!(outcome.records, vec![corrected]);
        assert_eq!(outcome.stats.updated, 1);
    }

    #[test]
    fn test_missing_details_carried_over() {
        let mut stored = fixture(24, "Villa", "Arsenal", None);
        stored.time = NaiveTime::from_hms_opt(16, 30, 0);
        let result = fixture(24, "Villa", "Arsenal", Some((0, 2)));

        let outcome = merge(vec![stored], vec![result]);
        assert_eq!(outcome.records[0].time, NaiveTime::from_hms_opt(16, 30, 0));
        assert!(outcome.records[0].is_settled());
    }

    #[test]
    fn test_duplicate_history_collapsed() {
        let history = vec![
            fixture(17, "Arsenal", "Wolves", None),
            fixture(17, "Arsenal", "Wolves", Some((2, 0))),
            fixture(17, "Arsenal", "Wolves", None),
        ];
        let outcome = merge(history, vec![]);
        assert_eq!(outcome.records.len(), 1);
        assert!(outcome.records[0].is_settled());
    }

    #[test]
    fn test_empty_incoming_keeps_history() {
        let history = vec![
            fixture(24, "Villa", "Arsenal", Some((0, 2))),
            fixture(17, "Arsenal", "Wolves", Some((2, 0))),
        ];
        let outcome = merge(history.clone(), vec![]);

        assert_eq!(outcome.stats, MergeStats::default());
        // Same records, in key order
        assert_eq!(outcome.records, vec![history[1].clone(), history[0].clone()]);
    }

    #[test]
    fn test_same_teams_other_league_kept_apart() {
        let mut cup = fixture(17, "Arsenal", "Wolves", Some((1, 1)));
        cup.league = "FA Cup".to_string();
        let outcome = merge(vec![fixture(17, "Arsenal", "Wolves", Some((2, 0)))], vec![cup]);
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.stats.added, 1);
    }
}
