//! Tabular matcher over a directory of CSV files.
//!
//! A sub-query either names a date (`YYYY-MM-DD` or `YYYY/MM/DD`), which is
//! matched against date columns, or is treated as a keyword matched against
//! text columns. Each file is handled independently: a file that cannot be
//! read or parsed contributes nothing and never affects the others.

use crate::types::{MatchedRows, TabularMatchSet};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use ledgerlens_core::{AppError, AppResult};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use walkdir::WalkDir;

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})[-/](\d{2})[-/](\d{2})").expect("date regex is valid")
});

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d-%b-%Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// How strictly a CSV file is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Every record must have exactly as many fields as the header
    Strict,
    /// Malformed records and records of the wrong width are skipped
    Lenient,
}

impl ParseMode {
    /// Parse order used when none is configured.
    pub const FALLBACK_ORDER: [ParseMode; 2] = [ParseMode::Strict, ParseMode::Lenient];
}

/// What a sub-query asks the tables for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchCriterion {
    /// Rows whose date column holds this day
    Date(NaiveDate),
    /// Date-shaped text that is not a calendar day; matches no rows
    InvalidDate(String),
    /// Rows with a text cell containing this lower-cased keyword
    Keyword(String),
}

impl MatchCriterion {
    /// Derive the criterion for a sub-query.
    ///
    /// Any date-shaped token not embedded in a longer digit run selects date
    /// mode, and the first one that is a real calendar day is the date. A
    /// sub-query without such a token is a keyword: trimmed and lower-cased.
    pub fn from_subquery(subquery: &str) -> Self {
        let mut invalid = None;

        for captures in DATE_RE.captures_iter(subquery) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            if !stands_alone(subquery, whole.start(), whole.end()) {
                continue;
            }

            let normalized = format!("{}-{}-{}", &captures[1], &captures[2], &captures[3]);
            match NaiveDate::parse_from_str(&normalized, "%Y-%m-%d") {
                Ok(date) => return Self::Date(date),
                Err(_) => {
                    tracing::debug!("Ignoring invalid date {:?} in sub-query", whole.as_str());
                    invalid.get_or_insert(normalized);
                }
            }
        }

        match invalid {
            Some(date) => Self::InvalidDate(date),
            None => Self::Keyword(subquery.trim().to_lowercase()),
        }
    }
}

/// Whether `text[start..end]` has no ASCII digit directly on either side.
fn stands_alone(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(|c| c.is_ascii_digit()) && !after.is_some_and(|c| c.is_ascii_digit())
}

/// A parsed CSV file.
#[derive(Debug, Clone, PartialEq)]
struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Matches sub-queries against the CSV files of one directory.
#[derive(Debug, Clone)]
pub struct TabularMatcher {
    dir: PathBuf,
    top_k: usize,
    parse_modes: Vec<ParseMode>,
}

impl TabularMatcher {
    /// Matcher over the `*.csv` files directly inside `dir`, keeping at most
    /// `top_k` rows per file.
    pub fn new(dir: impl Into<PathBuf>, top_k: usize) -> Self {
        Self {
            dir: dir.into(),
            top_k,
            parse_modes: ParseMode::FALLBACK_ORDER.to_vec(),
        }
    }

    /// Replace the parse strategy list.
    pub fn with_parse_modes(mut self, parse_modes: Vec<ParseMode>) -> Self {
        self.parse_modes = parse_modes;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// CSV files directly inside the directory, sorted by file name.
    ///
    /// A missing directory has no files.
    pub fn table_files(&self) -> Vec<PathBuf> {
        if !self.dir.is_dir() {
            tracing::debug!("Table directory {:?} does not exist", self.dir);
            return Vec::new();
        }

        WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
            })
            .collect()
    }

    /// Find the rows of every table that match `subquery`.
    pub fn match_query(&self, subquery: &str) -> TabularMatchSet {
        let criterion = MatchCriterion::from_subquery(subquery);
        let mut matches = TabularMatchSet::new();

        match &criterion {
            MatchCriterion::Keyword(k) if k.is_empty() => {
                tracing::debug!("Empty tabular sub-query, nothing to match");
                return matches;
            }
            MatchCriterion::InvalidDate(date) => {
                tracing::debug!("{} is not a calendar day, nothing to match", date);
                return matches;
            }
            _ => {}
        }

        tracing::debug!("Tabular criterion: {:?}", criterion);

        for path in self.table_files() {
            let name = file_name(&path);

            let table = match self.read_table(&path) {
                Ok(table) => table,
                Err(e) => {
                    tracing::warn!("Skipping table {}: {}", name, e);
                    continue;
                }
            };

            let matching = match &criterion {
                MatchCriterion::Date(date) => match_date(&table, *date),
                MatchCriterion::InvalidDate(_) => Vec::new(),
                MatchCriterion::Keyword(keyword) => match_keyword(&table, keyword),
            };

            if matching.is_empty() {
                continue;
            }

            let total_matches = matching.len();
            let rows: Vec<Vec<String>> = matching
                .into_iter()
                .take(self.top_k)
                .map(|i| table.rows[i].clone())
                .collect();

            tracing::debug!("{}: {} matching rows (kept {})", name, total_matches, rows.len());

            matches.insert(
                name,
                MatchedRows {
                    columns: table.columns.clone(),
                    rows,
                    total_matches,
                },
            );
        }

        tracing::info!(
            "Tabular match found rows in {} of the tables in {:?}",
            matches.len(),
            self.dir
        );

        matches
    }

    /// Parse a file with each mode in turn; the first success wins.
    fn read_table(&self, path: &Path) -> AppResult<Table> {
        let mut last_error = None;

        for mode in &self.parse_modes {
            match read_table_with(path, *mode) {
                Ok(table) => return Ok(table),
                Err(e) => {
                    tracing::debug!("{:?} parse of {:?} failed: {}", mode, path, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| AppError::Knowledge("no parse modes configured".to_string())))
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn read_table_with(path: &Path, mode: ParseMode) -> AppResult<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(mode == ParseMode::Lenient)
        .from_path(path)?;

    match mode {
        ParseMode::Strict => {
            let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
            let mut rows = Vec::new();
            for record in reader.records() {
                rows.push(record?.iter().map(str::to_string).collect());
            }
            Ok(Table { columns, rows })
        }
        ParseMode::Lenient => {
            let columns: Vec<String> = reader
                .byte_headers()?
                .iter()
                .map(|field| String::from_utf8_lossy(field).into_owned())
                .collect();

            let mut rows = Vec::new();
            let mut skipped = 0usize;
            for record in reader.byte_records() {
                match record {
                    Ok(record) if record.len() == columns.len() => rows.push(
                        record
                            .iter()
                            .map(|field| String::from_utf8_lossy(field).into_owned())
                            .collect(),
                    ),
                    _ => skipped += 1,
                }
            }

            if skipped > 0 {
                tracing::debug!("Skipped {} malformed rows in {:?}", skipped, path);
            }
            Ok(Table { columns, rows })
        }
    }
}

/// Indices of rows matching `date` in the first date column that holds it.
fn match_date(table: &Table, date: NaiveDate) -> Vec<usize> {
    let needle = date.format("%Y-%m-%d").to_string();

    for column in 0..table.columns.len() {
        let Some(rendered) = render_date_column(table, column) else {
            continue;
        };

        let matching: Vec<usize> = rendered
            .iter()
            .enumerate()
            .filter(|(_, value)| value.as_deref().is_some_and(|v| v.contains(&needle)))
            .map(|(i, _)| i)
            .collect();

        if !matching.is_empty() {
            return matching;
        }
    }

    Vec::new()
}

/// Normalized values of a column, or `None` if any non-empty cell is not a date.
fn render_date_column(table: &Table, column: usize) -> Option<Vec<Option<String>>> {
    table
        .rows
        .iter()
        .map(|row| {
            let cell = row.get(column).map(|c| c.trim()).unwrap_or("");
            if cell.is_empty() {
                Some(None)
            } else {
                parse_datetime(cell).map(|dt| Some(render_datetime(dt)))
            }
        })
        .collect()
}

fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
                .map(|date| date.and_time(NaiveTime::MIN))
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.naive_local())
        })
}

fn render_datetime(value: NaiveDateTime) -> String {
    if value.time() == NaiveTime::MIN {
        value.format("%Y-%m-%d").to_string()
    } else {
        value.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Indices of rows with a text cell containing `keyword` (already lower-cased).
fn match_keyword(table: &Table, keyword: &str) -> Vec<usize> {
    let text_columns: Vec<usize> = (0..table.columns.len())
        .filter(|&column| is_text_column(table, column))
        .collect();

    table
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| {
            text_columns.iter().any(|&column| {
                row.get(column)
                    .is_some_and(|cell| cell.to_lowercase().contains(keyword))
            })
        })
        .map(|(i, _)| i)
        .collect()
}

/// A column is text unless every non-empty cell is a number.
fn is_text_column(table: &Table, column: usize) -> bool {
    table.rows.iter().any(|row| {
        let cell = row.get(column).map(|c| c.trim()).unwrap_or("");
        !cell.is_empty() && cell.parse::<f64>().is_err()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_csv(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    fn sentiment_dir() -> TempDir {
        let temp = TempDir::new().unwrap();
        write_csv(
            temp.path(),
            "sentiment.csv",
            "date,headline,sentiment,score\n\
             2005-03-10,Bank lifts dividend,positive,0.8\n\
             2005-03-11,Regulator fines lender,negative,-0.6\n\
             2005-03-11,Lender settles case,neutral,0.1\n\
             2005-03-12,Rates unchanged,neutral,0.0\n",
        );
        write_csv(
            temp.path(),
            "prices.csv",
            "day,ticker,close\n\
             03/11/2005,ACME,12.5\n\
             03/14/2005,ACME,12.9\n",
        );
        temp
    }

    #[test]
    fn test_criterion_from_subquery() {
        assert_eq!(
            MatchCriterion::from_subquery("news on 2005/03/11 please"),
            MatchCriterion::Date(NaiveDate::from_ymd_opt(2005, 3, 11).unwrap())
        );
        assert_eq!(
            MatchCriterion::from_subquery("  Negative  "),
            MatchCriterion::Keyword("negative".to_string())
        );
        // Not a calendar day
        assert_eq!(
            MatchCriterion::from_subquery("2005-13-45"),
            MatchCriterion::InvalidDate("2005-13-45".to_string())
        );
    }

    #[test]
    fn test_criterion_finds_dates_next_to_letters() {
        let day = MatchCriterion::Date(NaiveDate::from_ymd_opt(2005, 3, 11).unwrap());

        assert_eq!(MatchCriterion::from_subquery("2005-03-11T09:30:00"), day);
        assert_eq!(MatchCriterion::from_subquery("FY2005-03-11 close"), day);
        assert_eq!(MatchCriterion::from_subquery("2005-02-30 or 2005-03-11"), day);

        // Part of a longer digit run
        assert_eq!(
            MatchCriterion::from_subquery("order 12005-03-11"),
            MatchCriterion::Keyword("order 12005-03-11".to_string())
        );
    }

    #[test]
    fn test_timestamp_and_prefixed_dates_match_rows() {
        let temp = sentiment_dir();
        let matcher = TabularMatcher::new(temp.path(), 100);

        for subquery in ["2005-03-11T09:30:00", "FY2005-03-11", "2005-02-30 or 2005-03-11"] {
            let matches = matcher.match_query(subquery);
            assert_eq!(matches["sentiment.csv"].total_matches, 2, "{}", subquery);
            assert_eq!(matches["prices.csv"].total_matches, 1, "{}", subquery);
        }
    }

    #[test]
    fn test_invalid_date_matches_nothing() {
        let temp = TempDir::new().unwrap();
        write_csv(
            temp.path(),
            "notes.csv",
            "date,note
2005-03-11,filed 2005-02-30 by mistake
",
        );
        let matcher = TabularMatcher::new(temp.path(), 100);

        // Stays in date mode instead of searching the text for the token
        assert!(matcher.match_query("2005-02-30").is_empty());
    }

    #[test]
    fn test_date_match_across_formats() {
        let temp = sentiment_dir();
        let matcher = TabularMatcher::new(temp.path(), 100);

        let matches = matcher.match_query("2005-03-11");

        let sentiment = &matches["sentiment.csv"];
        assert_eq!(sentiment.total_matches, 2);
        assert_eq!(sentiment.rows[0][1], "Regulator fines lender");
        assert_eq!(sentiment.rows[1][1], "Lender settles case");

        let prices = &matches["prices.csv"];
        assert_eq!(prices.rows, vec![vec!["03/11/2005", "ACME", "12.5"]]);
    }

    #[test]
    fn test_date_match_ignores_columns_with_non_dates() {
        let temp = TempDir::new().unwrap();
        write_csv(
            temp.path(),
            "mixed.csv",
            "note,when\n\
             filed 2005-03-11,2005-03-11\n\
             pending,2005-03-12\n",
        );
        let matcher = TabularMatcher::new(temp.path(), 100);

        let matches = matcher.match_query("2005-03-11");
        assert_eq!(matches["mixed.csv"].rows, vec![vec!["filed 2005-03-11", "2005-03-11"]]);
    }

    #[test]
    fn test_first_matching_date_column_wins() {
        let temp = TempDir::new().unwrap();
        write_csv(
            temp.path(),
            "trades.csv",
            "trade_date,settle_date\n\
             2005-03-11,2005-03-14\n\
             2005-03-09,2005-03-11\n",
        );
        let matcher = TabularMatcher::new(temp.path(), 100);

        let matches = matcher.match_query("2005-03-11");
        assert_eq!(matches["trades.csv"].rows, vec![vec!["2005-03-11", "2005-03-14"]]);
    }

    #[test]
    fn test_datetime_column_matches_day() {
        let temp = TempDir::new().unwrap();
        write_csv(
            temp.path(),
            "ticks.csv",
            "timestamp,price\n\
             2005-03-11 09:30:00,10.1\n\
             2005-03-11T16:00:00,10.4\n\
             2005-03-12 09:30:00,10.2\n",
        );
        let matcher = TabularMatcher::new(temp.path(), 100);

        let matches = matcher.match_query("2005-03-11");
        assert_eq!(matches["ticks.csv"].total_matches, 2);
    }

    #[test]
    fn test_keyword_match_is_case_insensitive_on_text_columns() {
        let temp = sentiment_dir();
        let matcher = TabularMatcher::new(temp.path(), 100);

        let matches = matcher.match_query("NEUTRAL");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches["sentiment.csv"].total_matches, 2);
    }

    #[test]
    fn test_keyword_skips_numeric_columns() {
        let temp = TempDir::new().unwrap();
        write_csv(
            temp.path(),
            "figures.csv",
            "year,label\n2005,total\n2006,growth 2005\n",
        );
        let matcher = TabularMatcher::new(temp.path(), 100);

        let matches = matcher.match_query("2005");
        assert_eq!(matches["figures.csv"].rows, vec![vec!["2006", "growth 2005"]]);
    }

    #[test]
    fn test_no_match_files_are_absent() {
        let temp = sentiment_dir();
        let matcher = TabularMatcher::new(temp.path(), 100);

        assert!(matcher.match_query("acme").contains_key("prices.csv"));
        assert!(!matcher.match_query("acme").contains_key("sentiment.csv"));
        assert!(matcher.match_query("no such thing").is_empty());
    }

    #[test]
    fn test_rows_capped_in_file_order() {
        let temp = TempDir::new().unwrap();
        let mut content = String::from("id,status\n");
        for i in 0..150 {
            content.push_str(&format!("{},open\n", i));
        }
        write_csv(temp.path(), "tickets.csv", &content);
        let matcher = TabularMatcher::new(temp.path(), 100);

        let matches = matcher.match_query("open");
        let tickets = &matches["tickets.csv"];
        assert_eq!(tickets.rows.len(), 100);
        assert_eq!(tickets.total_matches, 150);
        assert_eq!(tickets.rows[0][0], "0");
        assert_eq!(tickets.rows[99][0], "99");
    }

    #[test]
    fn test_lenient_parse_skips_ragged_rows() {
        let temp = TempDir::new().unwrap();
        write_csv(
            temp.path(),
            "ragged.csv",
            "name,sector\nAcme,banking\nBroken,banking,extra\nZenith,banking\n",
        );
        let matcher = TabularMatcher::new(temp.path(), 100);

        let matches = matcher.match_query("banking");
        let ragged = &matches["ragged.csv"];
        assert_eq!(ragged.total_matches, 2);
        assert_eq!(ragged.rows[1][0], "Zenith");
    }

    #[test]
    fn test_strict_only_skips_ragged_file() {
        let temp = TempDir::new().unwrap();
        write_csv(temp.path(), "ragged.csv", "name,sector\nAcme,banking\nBroken,banking,extra\n");
        write_csv(temp.path(), "clean.csv", "name,sector\nZenith,banking\n");
        let matcher =
            TabularMatcher::new(temp.path(), 100).with_parse_modes(vec![ParseMode::Strict]);

        let matches = matcher.match_query("banking");
        assert!(!matches.contains_key("ragged.csv"));
        assert!(matches.contains_key("clean.csv"));
    }

    #[test]
    fn test_invalid_utf8_handled_leniently() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("legacy.csv"), b"name,city\nSoci\xe9t\xe9,Paris\n").unwrap();
        let matcher = TabularMatcher::new(temp.path(), 100);

        let matches = matcher.match_query("paris");
        assert_eq!(matches["legacy.csv"].total_matches, 1);
    }

    #[test]
    fn test_missing_directory_and_non_csv_files() {
        let temp = TempDir::new().unwrap();
        let matcher = TabularMatcher::new(temp.path().join("missing"), 100);
        assert!(matcher.match_query("anything").is_empty());

        write_csv(temp.path(), "notes.txt", "name\nacme\n");
        fs::create_dir(temp.path().join("nested")).unwrap();
        write_csv(&temp.path().join("nested"), "deep.csv", "name\nacme\n");
        let matcher = TabularMatcher::new(temp.path(), 100);
        assert!(matcher.table_files().is_empty());
        assert!(matcher.match_query("acme").is_empty());
    }

    #[test]
    fn test_empty_subquery_matches_nothing() {
        let temp = sentiment_dir();
        let matcher = TabularMatcher::new(temp.path(), 100);
        assert!(matcher.match_query("   ").is_empty());
    }

    #[test]
    fn test_table_files_sorted() {
        let temp = sentiment_dir();
        let matcher = TabularMatcher::new(temp.path(), 100);

        let names: Vec<String> = matcher.table_files().iter().map(|p| file_name(p)).collect();
        assert_eq!(names, vec!["prices.csv", "sentiment.csv"]);
    }
}
