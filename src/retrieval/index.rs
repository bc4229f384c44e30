// ============================================================
// Layer 5 — Keyword Similarity Index
// ============================================================
// A small in-memory index over one run's candidate pool.
//
// Scoring is the length-weighted keyword overlap from
// domain::keywords, computed against each chunk's lowercased text.
//
// Chunks scoring zero are never returned. Ties keep pool order
// (stable sort), so results are deterministic.

use async_trait::async_trait;

use crate::domain::chunk::{Chunk, MetadataFilter};
use crate::domain::error::CollaboratorResult;
use crate::domain::keywords::{keyword_score, query_terms};
use crate::domain::traits::{IndexBuilder, SimilarityIndex};

// ─── KeywordIndex ─────────────────────────────────────────────────────────────
pub struct KeywordIndex {
    /// Lowercased text kept next to each chunk so queries don't re-lowercase
    entries: Vec<(String, Chunk)>,
}

impl KeywordIndex {
    pub fn new(chunks: &[Chunk]) -> Self {
        let entries = chunks
            .iter()
            .map(|c| (c.text.to_lowercase(), c.clone()))
            .collect();
        Self { entries }
    }

    /// Synchronous ranking used by the async trait impl.
    pub fn rank(&self, query: &str, k: usize, filter: Option<&MetadataFilter>) -> Vec<Chunk> {
        let terms = query_terms(query);

        let mut scored: Vec<(f32, &Chunk)> = self
            .entries
            .iter()
            .filter(|(_, c)| filter.map_or(true, |f| f.matches(&c.metadata)))
            .map(|(lower, c)| (keyword_score(&terms, lower), c))
            .filter(|(score, _)| *score > 0.0)
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.into_iter().take(k).map(|(_, c)| c.clone()).collect()
    }
}

#[async_trait]
impl SimilarityIndex for KeywordIndex {
    async fn search(
        &self,
        query:  &str,
        k:      usize,
        filter: Option<&MetadataFilter>,
    ) -> CollaboratorResult<Vec<Chunk>> {
        Ok(self.rank(query, k, filter))
    }
}

/// Builds a fresh KeywordIndex per run.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordIndexBuilder;

#[async_trait]
impl IndexBuilder for KeywordIndexBuilder {
    async fn build(&self, chunks: &[Chunk]) -> CollaboratorResult<Box<dyn SimilarityIndex>> {
        tracing::debug!("Building keyword index over {} chunks", chunks.len());
        Ok(Box::new(KeywordIndex::new(chunks)))
    }
}
