//! Fixed-schema providers
//!
//! Sources whose column names are known up front: league CSV exports and
//! results tables with stable headers.

use super::{RawMatch, RawScore, SourceAdapter};
use crate::data::table::{RawPayload, RawTable};
use crate::{ColumnLayout, FootballError, ProviderConfig, Result};

/// Adapter for a provider with a known column layout
pub struct FixedSchemaAdapter {
    provider: ProviderConfig,
    columns: ColumnLayout,
}

/// Resolved column positions within one table
struct ColumnIndices {
    date: usize,
    time: Option<usize>,
    home: usize,
    away: usize,
    score: ScoreColumns,
}

enum ScoreColumns {
    Combined(usize),
    Split { home: usize, away: usize },
    None,
}

impl FixedSchemaAdapter {
    pub fn new(provider: ProviderConfig, columns: ColumnLayout) -> Self {
        FixedSchemaAdapter { provider, columns }
    }

    /// First table carrying every required column
    fn select_table<'t>(&self, tables: &'t [RawTable]) -> Result<&'t RawTable> {
        let required = self.columns.required();

        if let Some(table) = tables
            .iter()
            .find(|t| required.iter().all(|c| t.column_index(c).is_some()))
        {
            return Ok(table);
        }

        let missing = match tables.first() {
            Some(first) => required
                .iter()
                .filter(|c| first.column_index(c).is_none())
                .map(|c| c.to_string())
                .collect(),
            None => required.iter().map(|c| c.to_string()).collect(),
        };

        Err(FootballError::MissingColumns {
            provider: self.provider.name.clone(),
            columns: missing,
        })
    }

    fn resolve(&self, table: &RawTable) -> Option<ColumnIndices> {
        let optional = |name: &Option<String>| name.as_deref().and_then(|n| table.column_index(n));

        let score = match (
            optional(&self.columns.score),
            optional(&self.columns.home_goals),
            optional(&self.columns.away_goals),
        ) {
            (Some(idx), _, _) => ScoreColumns::Combined(idx),
            (None, Some(home), Some(away)) => ScoreColumns::Split { home, away },
            _ => {
                log::debug!("{}: no score columns, reading fixtures only", self.provider.name);
                ScoreColumns::None
            }
        };

        Some(ColumnIndices {
            date: table.column_index(&self.columns.date)?,
            time: optional(&self.columns.time),
            home: table.column_index(&self.columns.home)?,
            away: table.column_index(&self.columns.away)?,
            score,
        })
    }

    fn row_to_raw(&self, row: &[String], idx: &ColumnIndices) -> RawMatch {
        let text = |i: usize| RawTable::cell(row, i).map(str::to_string);

        let score = match idx.score {
            ScoreColumns::Combined(i) => text(i).map_or(RawScore::Missing, RawScore::Combined),
            ScoreColumns::Split { home, away } => match (text(home), text(away)) {
                (Some(home), Some(away)) => RawScore::Split { home, away },
                _ => RawScore::Missing,
            },
            ScoreColumns::None => RawScore::Missing,
        };

        RawMatch {
            date: text(idx.date),
            time: idx.time.and_then(text),
            home_team: text(idx.home).unwrap_or_default(),
            away_team: text(idx.away).unwrap_or_default(),
            score,
            ..RawMatch::for_provider(&self.provider)
        }
    }
}

impl SourceAdapter for FixedSchemaAdapter {
    fn normalize_raw(&self, payload: &RawPayload) -> Result<Vec<RawMatch>> {
        let tables = payload.tables()?;
        let table = self.select_table(&tables)?;
        let Some(indices) = self.resolve(table) else {
            return Err(FootballError::MissingColumns {
                provider: self.provider.name.clone(),
                columns: self.columns.required().iter().map(|c| c.to_string()).collect(),
            });
        };

        let matches: Vec<RawMatch> = table
            .rows
            .iter()
            .map(|row| self.row_to_raw(row, &indices))
            .collect();

        log::debug!("{}: extracted {} rows", self.provider.name, matches.len());
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PayloadFormat, SourceKind};

    fn csv_layout() -> ColumnLayout {
        ColumnLayout {
            date: "Date".to_string(),
            time: Some("Time".to_string()),
            home: "HomeTeam".to_string(),
            away: "AwayTeam".to_string(),
            score: None,
            home_goals: Some("FTHG".to_string()),
            away_goals: Some("FTAG".to_string()),
        }
    }

    fn html_layout() -> ColumnLayout {
        ColumnLayout {
            date: "Date".to_string(),
            time: Some("Time".to_string()),
            home: "Home".to_string(),
            away: "Away".to_string(),
            score: Some("Score".to_string()),
            home_goals: None,
            away_goals: None,
        }
    }

    fn adapter(format: PayloadFormat, columns: ColumnLayout) -> FixedSchemaAdapter {
        let provider = ProviderConfig {
            name: "epl".to_string(),
            league: "Premier League".to_string(),
            country: "England".to_string(),
            url: "https://example.com/E0.csv".to_string(),
            source: SourceKind::Fixed {
                format,
                columns: columns.clone(),
            },
        };
        FixedSchemaAdapter::new(provider, columns)
    }

    #[test]
    fn test_csv_split_goals() {
        let body = "Div,Date,Time,HomeTeam,AwayTeam,FTHG,FTAG\n\
                    E0,16/08/2024,20:00,Man United,Fulham,1,0\n\
                    E0,23/05/2025,15:00,Arsenal,Spurs,,\n";
        let payload = RawPayload::new(PayloadFormat::Csv, body);
        let rows = adapter(PayloadFormat::Csv, csv_layout())
            .normalize_raw(&payload)
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].home_team, "Man United");
        assert_eq!(rows[0].date.as_deref(), Some("16/08/2024"));
        assert_eq!(
            rows[0].score,
            RawScore::Split {
                home: "1".to_string(),
                away: "0".to_string()
            }
        );
        assert_eq!(rows[0].league, "Premier League");
        assert_eq!(rows[1].score, RawScore::Missing);
    }

    #[test]
    fn test_html_first_matching_table() {
        let html = r#"
            <table><tr><th>Rk</th><th>Squad</th></tr><tr><td>1</td><td>Liverpool</td></tr></table>
            <table>
              <tr><th>Wk</th><th>Date</th><th>Time</th><th>Home</th><th>Score</th><th>Away</th></tr>
              <tr><th>1</th><td>2024-08-17</td><td>12:30</td><td>Ipswich Town</td><td>0–2</td><td>Liverpool</td></tr>
              <tr><th>38</th><td>2025-05-25</td><td>16:00</td><td>Liverpool</td><td></td><td>Crystal Palace</td></tr>
            </table>
        "#;
        let payload = RawPayload::new(PayloadFormat::Html, html);
        let rows = adapter(PayloadFormat::Html, html_layout())
            .normalize_raw(&payload)
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].score, RawScore::Combined("0–2".to_string()));
        assert_eq!(rows[0].time.as_deref(), Some("12:30"));
        assert_eq!(rows[1].score, RawScore::Missing);
    }

    #[test]
    fn test_missing_required_column_fails_provider() {
        let body = "Div,Date,Home,Away\nE0,16/08/2024,Man United,Fulham\n";
        let payload = RawPayload::new(PayloadFormat::Csv, body);
        let err = adapter(PayloadFormat::Csv, csv_layout())
            .normalize_raw(&payload)
            .unwrap_err();

        match err {
            FootballError::MissingColumns { provider, columns } => {
                assert_eq!(provider, "epl");
                assert_eq!(columns, vec!["HomeTeam".to_string(), "AwayTeam".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_no_tables_fails_provider() {
        let payload = RawPayload::new(PayloadFormat::Html, "<html><body><p>blocked</p></body></html>");
        let result = adapter(PayloadFormat::Html, html_layout()).normalize_raw(&payload);
        assert!(matches!(result, Err(FootballError::MissingColumns { .. })));
    }
}
