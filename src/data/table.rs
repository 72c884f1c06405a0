//! Raw tabular payloads
//!
//! Every provider hands us text cells in rows: a delimited file is a single
//! table, an HTML page holds any number of them.

use crate::{PayloadFormat, Result};
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

static TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("valid table selector"));
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("valid row selector"));

/// Body of one provider response
#[derive(Debug, Clone)]
pub struct RawPayload {
    pub format: PayloadFormat,
    pub body: String,
}

impl RawPayload {
    pub fn new(format: PayloadFormat, body: impl Into<String>) -> Self {
        RawPayload {
            format,
            body: body.into(),
        }
    }

    /// Split the payload into tables of text cells
    pub fn tables(&self) -> Result<Vec<RawTable>> {
        match self.format {
            PayloadFormat::Csv => Ok(vec![parse_delimited(&self.body)?]),
            PayloadFormat::Html => Ok(parse_html_tables(&self.body)),
        }
    }
}

/// A table of trimmed text cells with an optional header row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Case-insensitive header lookup
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = name.trim();
        self.headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(wanted))
    }

    /// Widest row, header included
    pub fn column_count(&self) -> usize {
        self.rows
            .iter()
            .map(|r| r.len())
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0)
    }

    /// Non-empty cell at `idx`
    pub fn cell(row: &[String], idx: usize) -> Option<&str> {
        row.get(idx).map(|c| c.trim()).filter(|c| !c.is_empty())
    }

    /// Non-empty values of one column
    pub fn column_values(&self, idx: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows.iter().filter_map(move |r| Self::cell(r, idx))
    }
}

/// Parse a comma-delimited file whose first line names the columns
pub fn parse_delimited(body: &str) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let headers = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let row: Vec<String> = record?.iter().map(|c| c.to_string()).collect();
        if row.iter().all(|c| c.is_empty()) {
            continue;
        }
        rows.push(row);
    }

    Ok(RawTable { headers, rows })
}

/// Parse every `<table>` in an HTML document
pub fn parse_html_tables(html: &str) -> Vec<RawTable> {
    let document = Html::parse_document(html);
    let tables: Vec<RawTable> = document.select(&TABLE).map(parse_table).collect();
    log::debug!("Found {} HTML tables", tables.len());
    tables
}

fn parse_table(table: ElementRef) -> RawTable {
    let mut parsed = RawTable::default();

    for row in table.select(&ROW) {
        // Rows of nested tables are picked up when that table is parsed
        if owning_table(row).map(|t| t.id()) != Some(table.id()) {
            continue;
        }

        let cells: Vec<ElementRef> = row
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|c| matches!(c.value().name(), "td" | "th"))
            .collect();
        if cells.is_empty() {
            continue;
        }

        let all_header = cells.iter().all(|c| c.value().name() == "th");
        let texts: Vec<String> = cells.iter().map(|c| cell_text(*c)).collect();

        // The last header row before any data wins (multi-level headers)
        if all_header && parsed.rows.is_empty() {
            parsed.headers = texts;
            continue;
        }
        if texts.iter().all(|t| t.is_empty()) {
            continue;
        }
        // Header repeated mid-table
        if !parsed.headers.is_empty() && texts == parsed.headers {
            continue;
        }
        parsed.rows.push(texts);
    }

    parsed
}

fn owning_table(row: ElementRef) -> Option<ElementRef> {
    row.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "table")
}

fn cell_text(cell: ElementRef) -> String {
    cell.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEDULE: &str = r#"
        <html><body>
        <table id="sched">
          <thead><tr><th>Wk</th><th>Date</th><th>Time</th><th>Home</th><th>Score</th><th>Away</th></tr></thead>
          <tbody>
            <tr><th>1</th><td>2024-08-16</td><td>20:00 (21:00)</td><td>Manchester Utd</td><td>1–0</td><td>Fulham</td></tr>
            <tr class="spacer"><th></th><td></td><td></td><td></td><td></td><td></td></tr>
            <tr><th>Wk</th><th>Date</th><th>Time</th><th>Home</th><th>Score</th><th>Away</th></tr>
            <tr><th>2</th><td>2024-08-24</td><td>15:00</td><td>Brighton</td><td>2–1</td><td>Man&nbsp;United</td></tr>
          </tbody>
        </table>
        <table class="nav"><tr><td>Home</td><td>About</td></tr></table>
        </body></html>
    "#;

    #[test]
    fn test_html_tables_parsed() {
        let tables = parse_html_tables(SCHEDULE);
        assert_eq!(tables.len(), 2);

        let sched = &tables[0];
        assert_eq!(sched.headers[1], "Date");
        // Spacer and repeated header rows are gone
        assert_eq!(sched.rows.len(), 2);
        assert_eq!(sched.rows[0][0], "1");
        assert_eq!(sched.rows[1][5], "Man United");
        assert_eq!(sched.column_index("score"), Some(4));

        let nav = &tables[1];
        assert!(nav.headers.is_empty());
        assert_eq!(nav.rows.len(), 1);
    }

    #[test]
    fn test_delimited_parsed() {
        let body = "\u{feff}Div,Date,HomeTeam,AwayTeam,FTHG,FTAG\nE0,16/08/2024,Man United,Fulham,1,0\n,,,,,\nE0,17/08/2024,Ipswich,Liverpool,0,2\n";
        let table = parse_delimited(body).unwrap();
        assert_eq!(table.headers[0], "Div");
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.column_index("HomeTeam"), Some(2));
        assert_eq!(table.column_values(4).collect::<Vec<_>>(), vec!["1", "0"]);
    }

    #[test]
    fn test_ragged_rows_allowed() {
        let table = parse_delimited("A,B,C\n1,2\n1,2,3,4\n").unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.column_count(), 4);
        assert_eq!(RawTable::cell(&table.rows[0], 2), None);
    }
}
