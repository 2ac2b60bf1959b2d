//! In-memory document store ranked by embedding similarity.

use crate::embeddings::{cosine_similarity, TrigramEmbedder};
use crate::retriever::TextIndex;
use crate::types::{ChunkCandidate, Document};
use async_trait::async_trait;
use ledgerlens_core::AppResult;

/// A chunk with its embedding.
#[derive(Debug, Clone)]
struct StoredChunk {
    source: String,
    position: u32,
    text: String,
    embedding: Vec<f32>,
}

/// Text index over embedded document chunks.
///
/// Filled during setup and read-only afterwards.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    embedder: TrigramEmbedder,
    min_score: f32,
    chunks: Vec<StoredChunk>,
}

impl DocumentStore {
    /// Create an empty store.
    ///
    /// Passages scoring below `min_score` are never returned.
    pub fn new(embedder: TrigramEmbedder, min_score: f32) -> Self {
        Self {
            embedder,
            min_score,
            chunks: Vec::new(),
        }
    }

    /// Embed and add chunks.
    pub fn add_chunks(&mut self, candidates: Vec<ChunkCandidate>) {
        for candidate in candidates {
            let embedding = self.embedder.embed(&candidate.text);
            self.chunks.push(StoredChunk {
                source: candidate.source,
                position: candidate.position,
                text: candidate.text,
                embedding,
            });
        }
    }

    /// Number of stored chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Score every chunk against `query`, best first, dropping weak matches.
    fn rank(&self, query: &str) -> Vec<(&StoredChunk, f32)> {
        let query_embedding = self.embedder.embed(query);

        let mut scored: Vec<(&StoredChunk, f32)> = self
            .chunks
            .iter()
            .map(|chunk| (chunk, cosine_similarity(&query_embedding, &chunk.embedding)))
            .filter(|(_, score)| *score >= self.min_score)
            .collect();

        // Stable sort keeps source order among equal scores
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored
    }
}

#[async_trait]
impl TextIndex for DocumentStore {
    async fn search(&self, query: &str, top_k: Option<usize>) -> AppResult<Vec<Document>> {
        let mut ranked = self.rank(query);
        if let Some(k) = top_k {
            ranked.truncate(k);
        }

        if let Some((best, score)) = ranked.first() {
            tracing::debug!(
                "Best passage: {} #{} (score: {:.3}), {} passages above {:.2}",
                best.source,
                best.position,
                score,
                ranked.len(),
                self.min_score
            );
        } else {
            tracing::debug!("No passages above {:.2} for query: {}", self.min_score, query);
        }

        Ok(ranked
            .into_iter()
            .map(|(chunk, score)| {
                Document::new(chunk.text.clone(), chunk.source.clone()).with_score(score)
            })
            .collect())
    }
}
