//! Knowledge system type definitions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Configuration for the two knowledge stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeConfig {
    /// Directory of `*.txt` financial documents (relative to the workspace)
    #[serde(default = "default_text_dir")]
    pub text_dir: PathBuf,

    /// Directory of `*.csv` tables (relative to the workspace)
    #[serde(default = "default_table_dir")]
    pub table_dir: PathBuf,

    /// Maximum matching rows kept per table file
    #[serde(default = "default_table_top_k")]
    pub table_top_k: usize,

    /// Maximum passages returned by text retrieval
    #[serde(default = "default_text_top_k")]
    pub text_top_k: usize,

    /// Characters kept from each passage in the text context
    #[serde(default = "default_text_char_budget")]
    pub text_char_budget: usize,

    /// Rows previewed per table in the tabular context
    #[serde(default = "default_table_preview_rows")]
    pub table_preview_rows: usize,

    /// Chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between chunks
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Passages scoring below this similarity are dropped
    #[serde(default = "default_min_relevance_score")]
    pub min_relevance_score: f32,

    /// Embedding vector dimension
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,
}

fn default_text_dir() -> PathBuf {
    PathBuf::from("financeAgent/data")
}

fn default_table_dir() -> PathBuf {
    PathBuf::from("csvAgent/data")
}

fn default_table_top_k() -> usize {
    100
}

fn default_text_top_k() -> usize {
    6
}

fn default_text_char_budget() -> usize {
    800
}

fn default_table_preview_rows() -> usize {
    10
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    100
}

fn default_min_relevance_score() -> f32 {
    0.10
}

fn default_embedding_dim() -> usize {
    384
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            text_dir: default_text_dir(),
            table_dir: default_table_dir(),
            table_top_k: default_table_top_k(),
            text_top_k: default_text_top_k(),
            text_char_budget: default_text_char_budget(),
            table_preview_rows: default_table_preview_rows(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            min_relevance_score: default_min_relevance_score(),
            embedding_dim: default_embedding_dim(),
        }
    }
}

/// An immutable unit of retrieved text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Passage text
    pub text: String,

    /// File name or identifier the passage came from
    pub source: String,

    /// Relevance score assigned by the index, if it ranks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl Document {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            score: None,
        }
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }
}

/// Rows of one table file that matched a sub-query.
///
/// Each row is aligned with `columns`; rows keep their order in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedRows {
    /// Header of the source file
    pub columns: Vec<String>,

    /// Matching rows, capped at the matcher's limit
    pub rows: Vec<Vec<String>>,

    /// Number of matching rows before the cap was applied
    pub total_matches: usize,
}

impl MatchedRows {
    /// Rows as column-name to value maps.
    pub fn records(&self) -> impl Iterator<Item = BTreeMap<&str, &str>> + '_ {
        self.rows.iter().map(move |row| {
            self.columns
                .iter()
                .map(String::as_str)
                .zip(row.iter().map(String::as_str))
                .collect()
        })
    }
}

/// Matching rows per table file, keyed by file name.
///
/// Files without a match are absent rather than present with no rows.
pub type TabularMatchSet = BTreeMap<String, MatchedRows>;

/// Summary of a knowledge setup run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupSummary {
    /// Text documents loaded
    pub text_documents: usize,

    /// Chunks indexed from those documents
    pub text_chunks: usize,

    /// Table files found
    pub table_files: usize,

    /// Files that could not be loaded, with the reason
    pub skipped: Vec<SkippedFile>,

    /// Setup duration in seconds
    pub duration_secs: f64,
}

/// A file the setup skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Internal chunk candidate before embedding.
#[derive(Debug, Clone)]
pub struct ChunkCandidate {
    pub source: String,
    pub position: u32,
    pub text: String,
}
