//! Match normalizer
//!
//! Turns adapter rows into canonical [`MatchRecord`]s. This stage never fails
//! a batch: a row that can't become a valid fixture is dropped with a reason,
//! and a score that can't be read leaves the fixture unsettled.

use super::scrapers::{RawMatch, RawScore};
use crate::{MatchRecord, Score};
use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use std::sync::LazyLock;

static FOOTNOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]").expect("valid footnote pattern"));
static LOGO_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*\blogo\s*$").expect("valid logo pattern"));

/// Separators providers put between home and away goals
const SCORE_SEPARATORS: &[char] = &['–', '—', '−', '-'];

/// Placeholders some providers use instead of the current date
const TODAY_PLACEHOLDERS: &[&str] = &["today", "hoje"];

const TEXT_DATE_FORMATS: &[&str] = &[
    "%d %B %Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%a %d %b %Y",
    "%A, %d %B %Y",
    "%a, %d %b %Y",
];

/// Why a row didn't make it into the dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    MissingDate,
    MissingTeam,
}

#[derive(Debug, Clone)]
pub struct Dropped {
    pub raw: RawMatch,
    pub reason: DropReason,
}

/// Result of normalizing one batch
#[derive(Debug, Clone, Default)]
pub struct NormalizeReport {
    pub records: Vec<MatchRecord>,
    pub dropped: Vec<Dropped>,
}

impl NormalizeReport {
    pub fn dropped_for(&self, reason: DropReason) -> usize {
        self.dropped.iter().filter(|d| d.reason == reason).count()
    }
}

/// Converts raw adapter rows into canonical records
pub struct Normalizer {
    /// Run date, substituted for "today" placeholders
    today: NaiveDate,
}

impl Normalizer {
    pub fn new(today: NaiveDate) -> Self {
        Normalizer { today }
    }

    pub fn normalize(&self, rows: Vec<RawMatch>) -> NormalizeReport {
        let mut report = NormalizeReport::default();

        for raw in rows {
            match self.normalize_one(raw) {
                Ok(record) => report.records.push(record),
                Err(dropped) => {
                    log::debug!(
                        "Dropping {} vs {} ({:?}): {:?}",
                        dropped.raw.home_team,
                        dropped.raw.away_team,
                        dropped.raw.date,
                        dropped.reason
                    );
                    report.dropped.push(dropped);
                }
            }
        }

        report
    }

    pub fn normalize_one(&self, raw: RawMatch) -> std::result::Result<MatchRecord, Dropped> {
        let Some(date) = raw.date.as_deref().and_then(|d| resolve_date(d, self.today)) else {
            return Err(Dropped {
                raw,
                reason: DropReason::MissingDate,
            });
        };

        let home_team = clean_team_name(&raw.home_team);
        let away_team = clean_team_name(&raw.away_team);
        if home_team.is_empty() || away_team.is_empty() {
            return Err(Dropped {
                raw,
                reason: DropReason::MissingTeam,
            });
        }

        let time = raw.time.as_deref().and_then(parse_kickoff);
        let score = match &raw.score {
            RawScore::Combined(text) => parse_score(text),
            RawScore::Split { home, away } => parse_split_score(home, away),
            RawScore::Missing => None,
        };

        Ok(MatchRecord {
            date,
            time,
            home_team,
            away_team,
            score,
            league: raw.league,
            country: raw.country,
        })
    }
}

/// Goal count, accepting integral decimals like "2.0"
pub fn parse_goals(text: &str) -> Option<u8> {
    let text = text.trim();
    if let Ok(goals) = text.parse::<u8>() {
        return Some(goals);
    }

    let value = text.parse::<f64>().ok()?;
    (value.is_finite() && value.fract() == 0.0 && (0.0..=255.0).contains(&value))
        .then_some(value as u8)
}

/// Combined score such as "2–1"; anything unreadable is `None`
pub fn parse_score(text: &str) -> Option<Score> {
    let parts: Vec<&str> = text.trim().split(SCORE_SEPARATORS).collect();
    match parts.as_slice() {
        [home, away] => Some(Score::new(parse_goals(home)?, parse_goals(away)?)),
        _ => None,
    }
}

/// Score from separate goal cells; both must parse
pub fn parse_split_score(home: &str, away: &str) -> Option<Score> {
    Some(Score::new(parse_goals(home)?, parse_goals(away)?))
}

/// Calendar date in any of the accepted layouts, placeholders excluded
pub fn parse_calendar_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();

    // ISO, possibly with a time part attached
    if let Some(iso) = text.get(..10) {
        if let Ok(date) = NaiveDate::parse_from_str(iso, "%Y-%m-%d") {
            return Some(date);
        }
    }

    if let Some(date) = text.split_whitespace().next().and_then(parse_day_month_year) {
        return Some(date);
    }

    TEXT_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

/// DD/MM/YYYY, DD/MM/YY or DD.MM.YYYY
fn parse_day_month_year(text: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = text.split(['/', '.']).collect();
    let [day, month, year] = parts.as_slice() else {
        return None;
    };
    if !year.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let year: i32 = match year.len() {
        2 => {
            let yy: i32 = year.parse().ok()?;
            if yy < 70 {
                2000 + yy
            } else {
                1900 + yy
            }
        }
        4 => year.parse().ok()?,
        _ => return None,
    };

    NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)
}

/// Calendar date, or the run date for a "today" placeholder
pub fn resolve_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let lowered = text.trim().to_lowercase();
    if TODAY_PLACEHOLDERS.contains(&lowered.as_str()) {
        return Some(today);
    }
    parse_calendar_date(text)
}

/// Kickoff time; trailing text such as "(21:00)" is ignored
pub fn parse_kickoff(text: &str) -> Option<NaiveTime> {
    let token = text.split_whitespace().next()?;
    NaiveTime::parse_from_str(token, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(token, "%H:%M"))
        .ok()
}

/// Strip footnotes, markers and the "logo" suffix from a team name
pub fn clean_team_name(name: &str) -> String {
    let name = FOOTNOTE.replace_all(name, "");
    let name = name.replace(['*', '†'], "");
    let name = LOGO_SUFFIX.replace(&name, "");
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MatchResult;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 1).unwrap()
    }

    fn raw(date: Option<&str>, home: &str, away: &str, score: RawScore) -> RawMatch {
        RawMatch {
            date: date.map(str::to_string),
            time: Some("20:00 (21:00)".to_string()),
            home_team: home.to_string(),
            away_team: away.to_string(),
            score,
            league: "Premier League".to_string(),
            country: "England".to_string(),
        }
    }

    #[test]
    fn test_parse_score_separators() {
        assert_eq!(parse_score("2–1"), Some(Score::new(2, 1)));
        assert_eq!(parse_score(" 0 - 0 "), Some(Score::new(0, 0)));
        assert_eq!(parse_score("3—2"), Some(Score::new(3, 2)));
        assert_eq!(parse_score("1−4"), Some(Score::new(1, 4)));
    }

    #[test]
    fn test_parse_score_garbage_is_unsettled() {
        assert_eq!(parse_score("Postponed"), None);
        assert_eq!(parse_score("–"), None);
        assert_eq!(parse_score("1–2–3"), None);
        assert_eq!(parse_score("a–1"), None);
        assert_eq!(parse_score(""), None);
    }

    #[test]
    fn test_parse_goals_accepts_decimals() {
        assert_eq!(parse_goals("2"), Some(2));
        assert_eq!(parse_goals("2.0"), Some(2));
        assert_eq!(parse_goals("2.5"), None);
        assert_eq!(parse_goals("-1"), None);
        assert_eq!(parse_split_score("1.0", "3"), Some(Score::new(1, 3)));
        assert_eq!(parse_split_score("1", ""), None);
    }

    #[test]
    fn test_parse_dates() {
        let d = NaiveDate::from_ymd_opt(2024, 8, 17).unwrap();
        assert_eq!(parse_calendar_date("2024-08-17"), Some(d));
        assert_eq!(parse_calendar_date("2024-08-17 00:00:00"), Some(d));
        assert_eq!(parse_calendar_date("17/08/2024"), Some(d));
        assert_eq!(parse_calendar_date("17/08/24"), Some(d));
        assert_eq!(parse_calendar_date("17.08.2024"), Some(d));
        assert_eq!(parse_calendar_date("17 August 2024"), Some(d));
        assert_eq!(parse_calendar_date("August 17, 2024"), Some(d));
        assert_eq!(parse_calendar_date("Sat 17 Aug 2024"), Some(d));
        assert_eq!(
            parse_calendar_date("17/08/98"),
            NaiveDate::from_ymd_opt(1998, 8, 17)
        );
        assert_eq!(parse_calendar_date("31/02/2024"), None);
        assert_eq!(parse_calendar_date("TBD"), None);
    }

    #[test]
    fn test_today_placeholder() {
        assert_eq!(resolve_date("Today", today()), Some(today()));
        assert_eq!(resolve_date("hoje", today()), Some(today()));
        assert_eq!(parse_calendar_date("today"), None);
    }

    #[test]
    fn test_parse_kickoff() {
        assert_eq!(parse_kickoff("20:00"), NaiveTime::from_hms_opt(20, 0, 0));
        assert_eq!(parse_kickoff("12:30 (13:30)"), NaiveTime::from_hms_opt(12, 30, 0));
        assert_eq!(parse_kickoff("15:00:00"), NaiveTime::from_hms_opt(15, 0, 0));
        assert_eq!(parse_kickoff("TBC"), None);
        assert_eq!(parse_kickoff(""), None);
    }

    #[test]
    fn test_clean_team_name() {
        assert_eq!(clean_team_name("Flamengo logo"), "Flamengo");
        assert_eq!(clean_team_name("Vasco LOGO"), "Vasco");
        assert_eq!(clean_team_name("Liverpool[a]"), "Liverpool");
        assert_eq!(clean_team_name("Arsenal *"), "Arsenal");
        assert_eq!(clean_team_name("  Man   United "), "Man United");
        // Only a trailing marker counts
        assert_eq!(clean_team_name("Logotown"), "Logotown");
    }

    #[test]
    fn test_normalize_settled_and_upcoming() {
        let rows = vec![
            raw(Some("2024-08-17"), "Ipswich Town", "Liverpool", RawScore::Combined("0–2".to_string())),
            raw(Some("2025-05-25"), "Liverpool", "Crystal Palace", RawScore::Missing),
        ];
        let report = Normalizer::new(today()).normalize(rows);

        assert_eq!(report.records.len(), 2);
        assert!(report.dropped.is_empty());

        let settled = &report.records[0];
        assert_eq!(settled.score, Some(Score::new(0, 2)));
        assert_eq!(settled.result(), Some(MatchResult::AwayWin));
        assert_eq!(settled.time, NaiveTime::from_hms_opt(20, 0, 0));
        assert_eq!(settled.country, "England");

        assert!(!report.records[1].is_settled());
    }

    #[test]
    fn test_malformed_score_keeps_fixture() {
        let rows = vec![raw(
            Some("2024-08-17"),
            "Arsenal",
            "Wolves",
            RawScore::Combined("abandoned".to_string()),
        )];
        let report = Normalizer::new(today()).normalize(rows);
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].score, None);
    }

    #[test]
    fn test_rows_without_date_or_team_dropped() {
        let rows = vec![
            raw(None, "Arsenal", "Wolves", RawScore::Missing),
            raw(Some("TBD"), "Arsenal", "Wolves", RawScore::Missing),
            raw(Some("2024-08-17"), "logo", "Wolves", RawScore::Missing),
            raw(Some("hoje"), "Santos", "Palmeiras", RawScore::Missing),
        ];
        let report = Normalizer::new(today()).normalize(rows);

        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].date, today());
        assert_eq!(report.dropped_for(DropReason::MissingDate), 2);
        assert_eq!(report.dropped_for(DropReason::MissingTeam), 1);
    }
}
