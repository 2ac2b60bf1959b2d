//! Text retrieval with an ordered list of search strategies.

use crate::types::Document;
use async_trait::async_trait;
use ledgerlens_core::AppResult;
use std::sync::Arc;

/// Searchable store of text passages.
#[async_trait]
pub trait TextIndex: Send + Sync {
    /// Search for passages relevant to `query`.
    ///
    /// With `top_k`, at most that many passages ranked by relevance. Without
    /// it, the index returns whatever it considers relevant.
    async fn search(&self, query: &str, top_k: Option<usize>) -> AppResult<Vec<Document>>;
}

/// One way of asking the index for passages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStrategy {
    /// Ranked search limited to `n` results
    Ranked(usize),
    /// Plain search, truncated afterwards
    Unranked,
}

impl SearchStrategy {
    fn top_k(&self) -> Option<usize> {
        match self {
            Self::Ranked(n) => Some(*n),
            Self::Unranked => None,
        }
    }
}

/// Retrieves passages for a sub-query, never failing.
#[derive(Clone)]
pub struct TextRetriever {
    index: Arc<dyn TextIndex>,
    top_k: usize,
    strategies: Vec<SearchStrategy>,
}

impl TextRetriever {
    /// Retriever trying a ranked search for `top_k` passages, then an unranked one.
    pub fn new(index: Arc<dyn TextIndex>, top_k: usize) -> Self {
        Self {
            index,
            top_k,
            strategies: vec![SearchStrategy::Ranked(top_k), SearchStrategy::Unranked],
        }
    }

    /// Replace the strategy list.
    pub fn with_strategies(mut self, strategies: Vec<SearchStrategy>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Retrieve at most `top_k` passages for `query`.
    ///
    /// Strategies are tried in order and the first success wins. When every
    /// strategy fails the result is empty.
    pub async fn retrieve(&self, query: &str) -> Vec<Document> {
        for strategy in &self.strategies {
            match self.index.search(query, strategy.top_k()).await {
                Ok(mut documents) => {
                    documents.truncate(self.top_k);
                    tracing::debug!(
                        "Text search ({:?}) returned {} passages",
                        strategy,
                        documents.len()
                    );
                    return documents;
                }
                Err(e) => {
                    tracing::debug!("Text search strategy {:?} failed: {}", strategy, e);
                }
            }
        }

        tracing::warn!(
            "All {} text search strategies failed for query: {}",
            self.strategies.len(),
            query
        );
        Vec::new()
    }
}

impl std::fmt::Debug for TextRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextRetriever")
            .field("top_k", &self.top_k)
            .field("strategies", &self.strategies)
            .finish()
    }
}
