//! Context builders turning retrieved evidence into bounded prompt text.
//!
//! Both builders are pure: the same input always renders the same string,
//! and empty input renders an empty string.

use crate::types::{Document, MatchedRows, TabularMatchSet};
use std::path::Path;

/// Characters kept from each passage by default.
pub const DEFAULT_TEXT_CHAR_BUDGET: usize = 800;

/// Rows previewed per table by default.
pub const DEFAULT_TABLE_PREVIEW_ROWS: usize = 10;

/// Render passages with the default character budget.
pub fn build_text_context(documents: &[Document]) -> String {
    build_text_context_with(documents, DEFAULT_TEXT_CHAR_BUDGET)
}

/// Render passages as `[source: <file>] <text>` blocks separated by blank lines.
///
/// Each passage is cut to `char_budget` characters and its newline runs are
/// collapsed to single spaces.
pub fn build_text_context_with(documents: &[Document], char_budget: usize) -> String {
    documents
        .iter()
        .map(|document| {
            let excerpt: String = document.text.chars().take(char_budget).collect();
            format!(
                "[source: {}] {}",
                display_source(&document.source),
                collapse_newlines(&excerpt)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render matched rows with the default preview size.
pub fn build_tabular_context(matches: &TabularMatchSet) -> String {
    build_tabular_context_with(matches, DEFAULT_TABLE_PREVIEW_ROWS)
}

/// Render one block per table file, in map order.
///
/// ```text
/// [table: sentiment.csv]
/// columns: date, headline
/// date,headline
/// 2005-03-11,Regulator fines lender
/// (showing 1 of 1 matching rows)
/// ```
pub fn build_tabular_context_with(matches: &TabularMatchSet, preview_rows: usize) -> String {
    matches
        .iter()
        .map(|(file, matched)| render_table_block(file, matched, preview_rows))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_table_block(file: &str, matched: &MatchedRows, preview_rows: usize) -> String {
    let preview = &matched.rows[..matched.rows.len().min(preview_rows)];

    format!(
        "[table: {}]\ncolumns: {}\n{}(showing {} of {} matching rows)",
        file,
        matched.columns.join(", "),
        render_csv(&matched.columns, preview),
        preview.len(),
        matched.total_matches
    )
}

/// Header plus rows as CSV, each line ending in `\n`.
fn render_csv(columns: &[String], rows: &[Vec<String>]) -> String {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    let written = std::iter::once(columns)
        .chain(rows.iter().map(Vec::as_slice))
        .try_for_each(|record| writer.write_record(record));

    let bytes = written
        .map_err(|e| e.to_string())
        .and_then(|()| writer.into_inner().map_err(|e| e.to_string()));

    match bytes {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            tracing::warn!("Falling back to plain row rendering: {}", e);
            std::iter::once(columns)
                .chain(rows.iter().map(Vec::as_slice))
                .map(|record| format!("{}\n", record.join(",")))
                .collect()
        }
    }
}

/// File name of a source path, or the source itself if it has none.
fn display_source(source: &str) -> &str {
    Path::new(source)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(source)
}

/// Replace every run of newline characters with one space.
fn collapse_newlines(text: &str) -> String {
    let mut collapsed = String::with_capacity(text.len());
    let mut in_run = false;

    for ch in text.chars() {
        if ch == '\n' || ch == '\r' {
            if !in_run {
                collapsed.push(' ');
                in_run = true;
            }
        } else {
            collapsed.push(ch);
            in_run = false;
        }
    }

    collapsed
}
