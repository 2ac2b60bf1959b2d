//! Knowledge stores and the query pipeline.
//!
//! Two read-only stores back every query: a directory of CSV tables searched
//! by [`TabularMatcher`], and financial text documents chunked into an
//! in-memory [`DocumentStore`]. [`KnowledgeBase::setup`] loads both before a
//! [`Pipeline`] can be built.

pub mod chunker;
pub mod config;
pub mod context;
pub mod embeddings;
pub mod parser;
pub mod rag;
pub mod retriever;
pub mod store;
pub mod tabular;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use context::{build_tabular_context, build_text_context};
pub use rag::{AgentTeam, Pipeline, PipelineBuilder, PipelineOutcome, PipelineResult, SubqueryPair};
pub use retriever::{SearchStrategy, TextIndex, TextRetriever};
pub use store::DocumentStore;
pub use tabular::{MatchCriterion, ParseMode, TabularMatcher};
pub use types::{
    Document, KnowledgeConfig, MatchedRows, SetupSummary, SkippedFile, TabularMatchSet,
};

use embeddings::TrigramEmbedder;
use ledgerlens_core::{AppError, AppResult};
use parser::TextEncoding;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use walkdir::WalkDir;

/// Both knowledge stores, loaded and ready to query.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    config: KnowledgeConfig,
    store: Arc<DocumentStore>,
    matcher: Arc<TabularMatcher>,
    summary: SetupSummary,
}

impl KnowledgeBase {
    /// Load the text documents and locate the tables.
    ///
    /// Creates the text and table directories if they do not exist. Text
    /// files that cannot be read or decoded are skipped and listed in the
    /// summary.
    pub fn setup(workspace: &Path, config: &KnowledgeConfig) -> AppResult<Self> {
        let start = Instant::now();

        let text_dir = config::resolve_dir(workspace, &config.text_dir);
        let table_dir = config::resolve_dir(workspace, &config.table_dir);

        tracing::info!(
            "Setting up knowledge base (text: {:?}, tables: {:?})",
            text_dir,
            table_dir
        );

        for dir in [&text_dir, &table_dir] {
            fs::create_dir_all(dir).map_err(|e| {
                AppError::Knowledge(format!("Failed to create directory {:?}: {}", dir, e))
            })?;
        }

        let mut summary = SetupSummary::default();
        let mut store = DocumentStore::new(
            TrigramEmbedder::new(config.embedding_dim),
            config.min_relevance_score,
        );

        for path in text_files(&text_dir) {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());

            match parser::parse_file_with(&path, &TextEncoding::FALLBACK_ORDER) {
                Ok((text, encoding)) => {
                    let chunks =
                        chunker::chunk_text(&name, &text, config.chunk_size, config.chunk_overlap);
                    tracing::debug!(
                        "Loaded {} ({}, {} chunks)",
                        name,
                        encoding.as_str(),
                        chunks.len()
                    );

                    summary.text_documents += 1;
                    summary.text_chunks += chunks.len();
                    store.add_chunks(chunks);
                }
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", name, e);
                    summary.skipped.push(SkippedFile {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let matcher = TabularMatcher::new(table_dir, config.table_top_k);
        summary.table_files = matcher.table_files().len();
        summary.duration_secs = start.elapsed().as_secs_f64();

        tracing::info!(
            "Knowledge base ready: {} documents ({} chunks), {} tables, {} skipped in {:.2}s",
            summary.text_documents,
            summary.text_chunks,
            summary.table_files,
            summary.skipped.len(),
            summary.duration_secs
        );

        Ok(Self {
            config: config.clone(),
            store: Arc::new(store),
            matcher: Arc::new(matcher),
            summary,
        })
    }

    pub fn config(&self) -> &KnowledgeConfig {
        &self.config
    }

    /// What the setup loaded.
    pub fn summary(&self) -> &SetupSummary {
        &self.summary
    }

    pub fn text_index(&self) -> Arc<dyn TextIndex> {
        self.store.clone()
    }

    /// Retriever over the document store with the configured passage count.
    pub fn text_retriever(&self) -> TextRetriever {
        TextRetriever::new(self.text_index(), self.config.text_top_k)
    }

    pub fn tabular_matcher(&self) -> Arc<TabularMatcher> {
        Arc::clone(&self.matcher)
    }
}

/// `*.txt` files directly inside `dir`, sorted by file name.
fn text_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
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
                .is_some_and(|e| e.eq_ignore_ascii_case("txt"))
        })
        .collect()
}
