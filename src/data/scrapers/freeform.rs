//! Free-form HTML providers
//!
//! Pages with tables of unknown shape. Each table is run through a chain of
//! detection strategies, tried in order; the first one that recognises the
//! team columns wins. Tables nobody recognises (navigation, standings,
//! footers) are skipped.

use super::{RawMatch, RawScore, SourceAdapter};
use crate::data::normalize::{parse_calendar_date, parse_kickoff, parse_score};
use crate::data::table::{RawPayload, RawTable};
use crate::{ProviderConfig, Result};
use regex::Regex;
use std::sync::LazyLock;

/// Tables with fewer data rows than this are noise
pub const MIN_DATA_ROWS: usize = 2;

/// Positional fallback needs at least this many columns
pub const MIN_POSITIONAL_COLUMNS: usize = 4;

static VERSUS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(.+?)\s+(?:vs\.?|v\.?|x|-|–|—)\s+(.+?)\s*$").expect("valid versus pattern")
});

const DATE_HEADERS: &[&str] = &["date", "data", "fecha", "datum"];
const TIME_HEADERS: &[&str] = &["time", "hora", "kickoff", "ko", "hour"];
const SCORE_HEADERS: &[&str] = &["score", "result", "resultado", "placar", "ft"];

/// Where the team names sit in a table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamColumns {
    /// One column holding "Home vs Away"
    Versus(usize),
    /// Separate home and away columns
    Pair { home: usize, away: usize },
}

impl TeamColumns {
    fn contains(&self, idx: usize) -> bool {
        match *self {
            TeamColumns::Versus(col) => col == idx,
            TeamColumns::Pair { home, away } => home == idx || away == idx,
        }
    }
}

/// Everything needed to read fixtures out of a detected table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    pub strategy: &'static str,
    pub teams: TeamColumns,
    pub date: Option<usize>,
    pub time: Option<usize>,
    pub score: Option<usize>,
}

/// One way of recognising the team columns of an unknown table
pub trait DetectionStrategy {
    fn name(&self) -> &'static str;

    fn detect(&self, table: &RawTable) -> Option<TeamColumns>;
}

/// A column whose values read "Home vs Away"
pub struct VersusColumn;

impl DetectionStrategy for VersusColumn {
    fn name(&self) -> &'static str {
        "versus_column"
    }

    fn detect(&self, table: &RawTable) -> Option<TeamColumns> {
        (0..table.column_count())
            .find(|&idx| majority(table, idx, |v| split_versus(v).is_some()))
            .map(TeamColumns::Versus)
    }
}

/// First two columns as home and away, for wide enough tables
pub struct PositionalPair;

impl DetectionStrategy for PositionalPair {
    fn name(&self) -> &'static str {
        "positional"
    }

    fn detect(&self, table: &RawTable) -> Option<TeamColumns> {
        (table.column_count() >= MIN_POSITIONAL_COLUMNS).then_some(TeamColumns::Pair { home: 0, away: 1 })
    }
}

/// Split "Home vs Away" into its two sides
pub fn split_versus(text: &str) -> Option<(String, String)> {
    let caps = VERSUS.captures(text)?;
    let home = caps.get(1)?.as_str().trim();
    let away = caps.get(2)?.as_str().trim();
    let has_letter = |s: &str| s.chars().any(char::is_alphabetic);
    (has_letter(home) && has_letter(away)).then(|| (home.to_string(), away.to_string()))
}

/// At least half of the column's non-empty values satisfy `pred`
fn majority(table: &RawTable, idx: usize, pred: impl Fn(&str) -> bool) -> bool {
    let (hits, total) = table
        .column_values(idx)
        .fold((0usize, 0usize), |(hits, total), v| (hits + pred(v) as usize, total + 1));
    hits > 0 && hits * 2 >= total
}

/// Adapter for providers with no fixed table layout
pub struct FreeFormAdapter {
    provider: ProviderConfig,
    strategies: Vec<Box<dyn DetectionStrategy>>,
}

impl FreeFormAdapter {
    pub fn new(provider: ProviderConfig) -> Self {
        Self::with_strategies(provider, vec![Box::new(VersusColumn), Box::new(PositionalPair)])
    }

    /// Use a custom strategy chain, tried in the given order
    pub fn with_strategies(provider: ProviderConfig, strategies: Vec<Box<dyn DetectionStrategy>>) -> Self {
        FreeFormAdapter {
            provider,
            strategies,
        }
    }

    /// Work out the layout of a table, or `None` if it holds no fixtures
    pub fn detect(&self, table: &RawTable) -> Option<TableLayout> {
        if table.rows.len() < MIN_DATA_ROWS {
            return None;
        }

        let strategy = self.strategies.iter().find_map(|s| s.detect(table).map(|teams| (s.name(), teams)));
        let (name, teams) = strategy?;

        Some(TableLayout {
            strategy: name,
            teams,
            date: find_column(table, teams, DATE_HEADERS, |v| parse_calendar_date(v).is_some()),
            time: find_column(table, teams, TIME_HEADERS, |v| parse_kickoff(v).is_some()),
            score: find_column(table, teams, SCORE_HEADERS, |v| parse_score(v).is_some()),
        })
    }

    fn row_to_raw(&self, row: &[String], layout: &TableLayout) -> Option<RawMatch> {
        let text = |i: usize| RawTable::cell(row, i).map(str::to_string);

        let (home_team, away_team) = match layout.teams {
            TeamColumns::Versus(col) => split_versus(RawTable::cell(row, col)?)?,
            TeamColumns::Pair { home, away } => (text(home)?, text(away)?),
        };

        Some(RawMatch {
            date: layout.date.and_then(text),
            time: layout.time.and_then(text),
            home_team,
            away_team,
            score: layout.score.and_then(text).map_or(RawScore::Missing, RawScore::Combined),
            ..RawMatch::for_provider(&self.provider)
        })
    }
}

/// Locate a column by header name, falling back to its content
fn find_column(
    table: &RawTable,
    teams: TeamColumns,
    headers: &[&str],
    looks_right: impl Fn(&str) -> bool,
) -> Option<usize> {
    let by_header = table.headers.iter().enumerate().find_map(|(idx, h)| {
        let h = h.trim().to_lowercase();
        (!teams.contains(idx) && headers.contains(&h.as_str())).then_some(idx)
    });

    by_header.or_else(|| {
        (0..table.column_count())
            .filter(|idx| !teams.contains(*idx))
            .find(|&idx| majority(table, idx, &looks_right))
    })
}

impl SourceAdapter for FreeFormAdapter {
    fn normalize_raw(&self, payload: &RawPayload) -> Result<Vec<RawMatch>> {
        let mut matches = Vec::new();

        for (i, table) in payload.tables()?.iter().enumerate() {
            let Some(layout) = self.detect(table) else {
                log::debug!("{}: skipping table {} ({} rows)", self.provider.name, i, table.rows.len());
                continue;
            };

            let before = matches.len();
            matches.extend(table.rows.iter().filter_map(|row| self.row_to_raw(row, &layout)));
            log::debug!(
                "{}: table {} read by {} strategy, {} rows",
                self.provider.name,
                i,
                layout.strategy,
                matches.len() - before
            );
        }

        Ok(matches)
    }
}
