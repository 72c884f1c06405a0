//! Delimited codecs for the stored artifacts
//!
//! The canonical dataset and the strength table are kept as comma-separated
//! text with a header row. Missing values are empty fields.

use super::normalize::{parse_calendar_date, parse_kickoff, parse_split_score};
use crate::{FootballError, MatchRecord, Result, StrengthIndex};
use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Canonical dataset columns, in file order
pub const DATASET_HEADER: [&str; 9] = [
    "date",
    "time",
    "home_team",
    "away_team",
    "home_goals",
    "away_goals",
    "result",
    "league",
    "country",
];

/// Strength table columns, in file order
pub const STRENGTH_HEADER: [&str; 6] = [
    "league",
    "team",
    "attack_home",
    "defense_home",
    "attack_away",
    "defense_away",
];

/// One dataset line. Aliases accept files written before the columns were
/// renamed.
#[derive(Debug, Serialize, Deserialize)]
struct DatasetRow {
    #[serde(alias = "Data")]
    date: String,
    #[serde(alias = "Hora", default)]
    time: Option<String>,
    #[serde(alias = "Mandante")]
    home_team: String,
    #[serde(alias = "Visitante")]
    away_team: String,
    #[serde(alias = "Gols_Mandante", default)]
    home_goals: Option<String>,
    #[serde(alias = "Gols_Visitante", default)]
    away_goals: Option<String>,
    #[serde(alias = "Resultado_Letra", default)]
    result: Option<String>,
    #[serde(alias = "Liga")]
    league: String,
    #[serde(alias = "Pais", default)]
    country: String,
}

impl From<&MatchRecord> for DatasetRow {
    fn from(record: &MatchRecord) -> Self {
        DatasetRow {
            date: record.date.format("%Y-%m-%d").to_string(),
            time: record.time.map(format_kickoff),
            home_team: record.home_team.clone(),
            away_team: record.away_team.clone(),
            home_goals: record.home_goals().map(|g| g.to_string()),
            away_goals: record.away_goals().map(|g| g.to_string()),
            result: record.result().map(|r| r.letter().to_string()),
            league: record.league.clone(),
            country: record.country.clone(),
        }
    }
}

/// `HH:MM`, widened to `HH:MM:SS` only when seconds are set
fn format_kickoff(time: NaiveTime) -> String {
    if time.second() == 0 {
        time.format("%H:%M").to_string()
    } else {
        time.format("%H:%M:%S").to_string()
    }
}

impl DatasetRow {
    /// `None` for rows without a readable date
    fn into_record(self) -> Option<MatchRecord> {
        let date = parse_calendar_date(&self.date)?;
        let score = match (&self.home_goals, &self.away_goals) {
            (Some(home), Some(away)) => parse_split_score(home, away),
            _ => None,
        };

        // The result column is derived, so it's recomputed from the goals
        Some(MatchRecord {
            date,
            time: self.time.as_deref().and_then(parse_kickoff),
            home_team: self.home_team,
            away_team: self.away_team,
            score,
            league: self.league,
            country: self.country,
        })
    }
}

fn serialize_rows<T: Serialize>(header: &[&str], rows: impl IntoIterator<Item = T>) -> Result<String> {
    // Header written by hand so an empty table still has one
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    wtr.write_record(header)?;
    for row in rows {
        wtr.serialize(row)?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| FootballError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| FootballError::Parse(e.to_string()))
}

fn reader(content: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.trim_start_matches('\u{feff}').as_bytes())
}

/// Serialize the canonical dataset
pub fn write_dataset(records: &[MatchRecord]) -> Result<String> {
    serialize_rows(&DATASET_HEADER, records.iter().map(DatasetRow::from))
}

/// Parse a stored dataset; rows with an unreadable date are skipped
pub fn read_dataset(content: &str) -> Result<Vec<MatchRecord>> {
    let mut records = Vec::new();
    let mut skipped = 0;

    for row in reader(content).deserialize::<DatasetRow>() {
        match row?.into_record() {
            Some(record) => records.push(record),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        log::warn!("Skipped {} stored rows with unreadable dates", skipped);
    }
    Ok(records)
}

/// Serialize the strength table
pub fn write_strength(indices: &[StrengthIndex]) -> Result<String> {
    serialize_rows(&STRENGTH_HEADER, indices)
}

pub fn read_strength(content: &str) -> Result<Vec<StrengthIndex>> {
    let indices = reader(content)
        .deserialize()
        .collect::<std::result::Result<Vec<StrengthIndex>, _>>()?;
    Ok(indices)
}
