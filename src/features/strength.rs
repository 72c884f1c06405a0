//! Team strength indices
//!
//! Each index compares a team's scoring or conceding rate at one venue with
//! the league-wide rate, so 1.0 is league average. Only settled matches
//! count.

use crate::{MatchRecord, StrengthIndex};
use std::collections::BTreeMap;

/// Decimal places kept in the output
const PRECISION: i32 = 4;

/// Goals for and against over a set of matches at one venue
#[derive(Debug, Clone, Copy, Default)]
pub struct GoalTally {
    pub matches: u32,
    pub scored: u32,
    pub conceded: u32,
}

impl GoalTally {
    pub fn add(&mut self, scored: u8, conceded: u8) {
        self.matches += 1;
        self.scored += scored as u32;
        self.conceded += conceded as u32;
    }

    /// Average goals scored, `None` with no matches
    pub fn avg_for(&self) -> Option<f64> {
        (self.matches > 0).then(|| self.scored as f64 / self.matches as f64)
    }

    pub fn avg_against(&self) -> Option<f64> {
        (self.matches > 0).then(|| self.conceded as f64 / self.matches as f64)
    }
}

/// League-wide home and away scoring
#[derive(Debug, Clone, Copy, Default)]
pub struct LeagueTally {
    pub matches: u32,
    pub home_goals: u32,
    pub away_goals: u32,
}

impl LeagueTally {
    pub fn home_avg(&self) -> f64 {
        if self.matches == 0 {
            0.0
        } else {
            self.home_goals as f64 / self.matches as f64
        }
    }

    pub fn away_avg(&self) -> f64 {
        if self.matches == 0 {
            0.0
        } else {
            self.away_goals as f64 / self.matches as f64
        }
    }
}

/// Home and away tallies for one team
#[derive(Debug, Clone, Copy, Default)]
pub struct VenueSplit {
    pub home: GoalTally,
    pub away: GoalTally,
}

/// Accumulates settled matches and derives strength indices
#[derive(Debug, Default)]
pub struct StrengthCalculator {
    leagues: BTreeMap<String, LeagueTally>,
    /// Keyed by (league, team)
    teams: BTreeMap<(String, String), VenueSplit>,
}

impl StrengthCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one match; unsettled fixtures are ignored
    pub fn update(&mut self, record: &MatchRecord) {
        let Some(score) = record.score else {
            return;
        };

        let league = self.leagues.entry(record.league.clone()).or_default();
        league.matches += 1;
        league.home_goals += score.home as u32;
        league.away_goals += score.away as u32;

        self.teams
            .entry((record.league.clone(), record.home_team.clone()))
            .or_default()
            .home
            .add(score.home, score.away);
        self.teams
            .entry((record.league.clone(), record.away_team.clone()))
            .or_default()
            .away
            .add(score.away, score.home);
    }

    pub fn process_matches(&mut self, records: &[MatchRecord]) {
        for record in records {
            self.update(record);
        }
    }

    /// Indices for every team with settled matches both at home and away
    pub fn indices(&self) -> Vec<StrengthIndex> {
        let mut indices = Vec::new();

        for ((league, team), split) in &self.teams {
            let (Some(for_home), Some(against_home), Some(for_away), Some(against_away)) = (
                split.home.avg_for(),
                split.home.avg_against(),
                split.away.avg_for(),
                split.away.avg_against(),
            ) else {
                log::debug!("{} ({}): needs both home and away results, skipped", team, league);
                continue;
            };

            let tally = self.leagues.get(league).copied().unwrap_or_default();
            let home_avg = divisor(tally.home_avg());
            let away_avg = divisor(tally.away_avg());

            indices.push(StrengthIndex {
                league: league.clone(),
                team: team.clone(),
                attack_home: round(for_home / home_avg),
                defense_home: round(against_home / away_avg),
                attack_away: round(for_away / away_avg),
                defense_away: round(against_away / home_avg),
            });
        }

        indices
    }
}

/// A zero league average divides by one instead
fn divisor(avg: f64) -> f64 {
    if avg == 0.0 {
        1.0
    } else {
        avg
    }
}

fn round(value: f64) -> f64 {
    let scale = 10f64.powi(PRECISION);
    (value * scale).round() / scale
}

/// Strength indices for a dataset
pub fn compute(records: &[MatchRecord]) -> Vec<StrengthIndex> {
    let mut calculator = StrengthCalculator::new();
    calculator.process_matches(records);
    calculator.indices()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Score;
    use chrono::NaiveDate;

    fn played(day: u32, league: &str, home: &str, away: &str, score: Option<(u8, u8)>) -> MatchRecord {
        MatchRecord {
            date: NaiveDate::from_ymd_opt(2024, 8, day).unwrap(),
            time: None,
            home_team: home.to_string(),
            away_team: away.to_string(),
            score: score.map(|(h, a)| Score::new(h, a)),
            league: league.to_string(),
            country: String::new(),
        }
    }

    fn find<'a>(indices: &'a [StrengthIndex], team: &str) -> &'a StrengthIndex {
        indices.iter().find(|i| i.team == team).unwrap()
    }

    #[test]
    fn test_two_match_league() {
        let records = vec![
            played(1, "X", "A", "B", Some((3, 1))),
            played(8, "X", "B", "A", Some((2, 2))),
        ];
        let indices = compute(&records);
        assert_eq!(indices.len(), 2);

        let a = find(&indices, "A");
        assert_eq!(a.attack_home, 1.2);
        assert_eq!(a.defense_home, 0.6667);
        assert_eq!(a.attack_away, 1.3333);
        assert_eq!(a.defense_away, 0.8);

        let b = find(&indices, "B");
        assert_eq!(b.attack_home, 0.8);
        assert_eq!(b.defense_away, 1.2);
    }

    #[test]
    fn test_zero_league_average_divides_by_one() {
        // No home side ever scores
        let records = vec![
            played(1, "X", "A", "B", Some((0, 1))),
            played(8, "X", "B", "A", Some((0, 2))),
        ];
        let indices = compute(&records);
        assert_eq!(indices.len(), 2);

        for index in &indices {
            for value in [index.attack_home, index.defense_home, index.attack_away, index.defense_away] {
                assert!(value.is_finite());
            }
            assert_eq!(index.attack_home, 0.0);
            assert_eq!(index.defense_away, 0.0);
        }
        assert_eq!(find(&indices, "A").attack_away, 1.3333);
    }

    #[test]
    fn test_team_needs_both_venues() {
        let records = vec![
            played(1, "X", "A", "B", Some((1, 0))),
            played(8, "X", "B", "A", Some((1, 1))),
            played(15, "X", "C", "A", Some((2, 0))),
        ];
        let indices = compute(&records);
        let teams: Vec<&str> = indices.iter().map(|i| i.team.as_str()).collect();
        assert_eq!(teams, vec!["A", "B"]);
    }

    #[test]
    fn test_unsettled_and_empty_input() {
        assert!(compute(&[]).is_empty());
        let records = vec![played(1, "X", "A", "B", None), played(8, "X", "B", "A", None)];
        assert!(compute(&records).is_empty());
    }

    #[test]
    fn test_order_independent() {
        let records = vec![
            played(1, "X", "A", "B", Some((3, 1))),
            played(8, "X", "B", "A", Some((2, 2))),
            played(9, "Y", "C", "D", Some((0, 1))),
            played(15, "X", "A", "C", Some((1, 0))),
            played(16, "Y", "D", "C", Some((4, 2))),
            played(22, "X", "C", "A", Some((1, 1))),
        ];
        let mut reversed = records.clone();
        reversed.reverse();
        assert_eq!(compute(&records), compute(&reversed));
    }

    #[test]
    fn test_leagues_kept_apart() {
        let records = vec![
            played(1, "X", "A", "B", Some((3, 1))),
            played(8, "X", "B", "A", Some((2, 2))),
            played(1, "Y", "A", "B", Some((0, 0))),
            played(8, "Y", "B", "A", Some((1, 0))),
        ];
        let indices = compute(&records);
        assert_eq!(indices.len(), 4);
        let in_x = indices.iter().find(|i| i.league == "X" && i.team == "A").unwrap();
        assert_eq!(in_x.attack_home, 1.2);
    }
}
