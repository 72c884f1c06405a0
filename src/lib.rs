//! Football fixture ingestion and team strength indices
//!
//! Pulls schedules and results from several providers, normalizes them into
//! one canonical dataset, merges that with the stored history, and derives
//! home/away attack and defense indices per team.

pub mod data;
pub mod features;
pub mod pipeline;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Final outcome of a settled match, from the home side's perspective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchResult {
    HomeWin,
    Draw,
    AwayWin,
}

impl MatchResult {
    pub fn from_goals(home_goals: u8, away_goals: u8) -> Self {
        match home_goals.cmp(&away_goals) {
            std::cmp::Ordering::Greater => MatchResult::HomeWin,
            std::cmp::Ordering::Less => MatchResult::AwayWin,
            std::cmp::Ordering::Equal => MatchResult::Draw,
        }
    }

    /// Single-letter code used in the dataset file
    pub fn letter(&self) -> &'static str {
        match self {
            MatchResult::HomeWin => "H",
            MatchResult::Draw => "D",
            MatchResult::AwayWin => "A",
        }
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Final score. Goals only ever exist as a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Score {
    pub home: u8,
    pub away: u8,
}

impl Score {
    pub fn new(home: u8, away: u8) -> Self {
        Score { home, away }
    }
}

/// Identity of a fixture: two records with the same key are the same match
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MatchKey {
    pub date: NaiveDate,
    pub league: String,
    pub home_team: String,
    pub away_team: String,
}

/// A single fixture in canonical form
///
/// Team names keep the provider's spelling. A record without a score is an
/// upcoming fixture: it stays in the dataset but is ignored by the strength
/// calculator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub date: NaiveDate,
    /// Local kickoff time, `None` when the provider doesn't say
    pub time: Option<NaiveTime>,
    pub home_team: String,
    pub away_team: String,
    pub score: Option<Score>,
    pub league: String,
    pub country: String,
}

impl MatchRecord {
    /// Both final goal counts are known
    pub fn is_settled(&self) -> bool {
        self.score.is_some()
    }

    pub fn home_goals(&self) -> Option<u8> {
        self.score.map(|s| s.home)
    }

    pub fn away_goals(&self) -> Option<u8> {
        self.score.map(|s| s.away)
    }

    /// Result letter, derived from the goals so it can never disagree with them
    pub fn result(&self) -> Option<MatchResult> {
        self.score.map(|s| MatchResult::from_goals(s.home, s.away))
    }

    pub fn key(&self) -> MatchKey {
        MatchKey {
            date: self.date,
            league: self.league.clone(),
            home_team: self.home_team.clone(),
            away_team: self.away_team.clone(),
        }
    }
}

/// Attack/defense ratios for one team in one league
///
/// Each value is a team average divided by the matching league average,
/// so 1.0 is exactly league-average.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrengthIndex {
    pub league: String,
    pub team: String,
    pub attack_home: f64,
    pub defense_home: f64,
    pub attack_away: f64,
    pub defense_away: f64,
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum FootballError {
    #[error("Source unavailable for {provider}: {message}")]
    SourceUnavailable { provider: String, message: String },

    #[error("Provider {provider} is missing required columns: {}", .columns.join(", "))]
    MissingColumns {
        provider: String,
        columns: Vec<String>,
    },

    #[error("Write conflict on {key}: the document changed since it was read")]
    PersistenceConflict { key: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, FootballError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub providers: Vec<ProviderConfig>,
    pub storage: StorageConfig,
    pub fetch: FetchConfig,
}

/// One upstream source of fixtures for a single league
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    pub league: String,
    pub country: String,
    pub url: String,
    pub source: SourceKind,
}

/// Shape of a provider's payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceKind {
    /// Known column names, either a delimited file or an HTML table
    Fixed {
        format: PayloadFormat,
        columns: ColumnLayout,
    },
    /// HTML page with tables of unknown shape
    FreeForm,
}

impl SourceKind {
    pub fn format(&self) -> PayloadFormat {
        match self {
            SourceKind::Fixed { format, .. } => *format,
            SourceKind::FreeForm => PayloadFormat::Html,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadFormat {
    Csv,
    Html,
}

/// Provider column names for a fixed-schema source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnLayout {
    pub date: String,
    #[serde(default)]
    pub time: Option<String>,
    pub home: String,
    pub away: String,
    /// Combined "2–1" score column
    #[serde(default)]
    pub score: Option<String>,
    #[serde(default)]
    pub home_goals: Option<String>,
    #[serde(default)]
    pub away_goals: Option<String>,
}

impl ColumnLayout {
    /// Columns without which a row can't become a fixture
    pub fn required(&self) -> Vec<&str> {
        vec![self.date.as_str(), self.home.as_str(), self.away.as_str()]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub database_path: String,
    pub historical_key: String,
    pub strength_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Delay between consecutive network fetches
    pub pacing_secs: u64,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub user_agent: String,
    #[serde(default)]
    pub cache_dir: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let leagues = [
            ("premier-league", "Premier League", "England", 9, "Premier-League"),
            ("la-liga", "La Liga", "Spain", 12, "La-Liga"),
            ("serie-a", "Serie A", "Italy", 11, "Serie-A"),
            ("bundesliga", "Bundesliga", "Germany", 20, "Bundesliga"),
            ("ligue-1", "Ligue 1", "France", 13, "Ligue-1"),
            ("primeira-liga", "Primeira Liga", "Portugal", 32, "Primeira-Liga"),
            ("eredivisie", "Eredivisie", "Netherlands", 23, "Eredivisie"),
        ];

        let providers = leagues
            .into_iter()
            .map(|(name, league, country, comp, slug)| ProviderConfig {
                name: name.to_string(),
                league: league.to_string(),
                country: country.to_string(),
                url: format!(
                    "https://fbref.com/en/comps/{}/schedule/{}-Scores-and-Fixtures",
                    comp, slug
                ),
                source: SourceKind::Fixed {
                    format: PayloadFormat::Html,
                    columns: ColumnLayout {
                        date: "Date".to_string(),
                        time: Some("Time".to_string()),
                        home: "Home".to_string(),
                        away: "Away".to_string(),
                        score: Some("Score".to_string()),
                        home_goals: None,
                        away_goals: None,
                    },
                },
            })
            .collect();

        Config {
            providers,
            storage: StorageConfig {
                database_path: "data/football.db".to_string(),
                historical_key: "matches.csv".to_string(),
                strength_key: "team_strength.csv".to_string(),
            },
            fetch: FetchConfig {
                pacing_secs: 5,
                timeout_secs: 30,
                max_attempts: 3,
                user_agent: "football-etl/0.1".to_string(),
                cache_dir: None,
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FootballError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| FootballError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| FootballError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Provider names must be unique and the two storage keys distinct
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for provider in &self.providers {
            if !seen.insert(provider.name.as_str()) {
                return Err(FootballError::Config(format!(
                    "Duplicate provider name: {}",
                    provider.name
                )));
            }
        }
        if self.storage.historical_key == self.storage.strength_key {
            return Err(FootballError::Config(
                "historical_key and strength_key must differ".to_string(),
            ));
        }
        Ok(())
    }

    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.name == name)
    }
}
