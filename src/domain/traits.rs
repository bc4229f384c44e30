// ============================================================
// Layer 3 — Core Traits (External Collaborators)
// ============================================================
// Everything the pipeline cannot do by itself sits behind one
// of these traits. The application layer only ever sees the
// trait objects, so a local corpus can stand in for arXiv and a
// scripted fake can stand in for the language model in tests.
//
//   PaperSource    → ArxivClient, LocalCorpus
//   TextExtractor  → DocumentExtractor
//   IndexBuilder   → KeywordIndexBuilder
//   LanguageModel  → ChatCompletionsClient
//
// Every method may suspend (network, disk). Callers wrap each
// call in a timeout and apply the fallback policy on failure.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)
//            Rust Book §17 (Trait Objects)

use async_trait::async_trait;

use crate::domain::chunk::{Chunk, ChunkMetadata, MetadataFilter};
use crate::domain::error::CollaboratorResult;
use crate::domain::evidence::Judgment;
use crate::domain::paper::PaperRef;

// ─── PaperSource ──────────────────────────────────────────────────────────────
/// Finds papers relevant to a free-text query.
#[async_trait]
pub trait PaperSource: Send + Sync {
    /// An empty result means "no evidence available", not a failure.
    async fn discover(&self, query: &str, max_results: usize) -> CollaboratorResult<Vec<PaperRef>>;
}

// ─── TextExtractor ────────────────────────────────────────────────────────────
/// Turns one paper into quality-filtered chunks.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, paper: &PaperRef) -> CollaboratorResult<Vec<Chunk>>;
}

// ─── Similarity index ─────────────────────────────────────────────────────────
/// A searchable index over one run's candidate pool.
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// Up to `k` chunks ranked by similarity to `query`, best first.
    async fn search(
        &self,
        query:  &str,
        k:      usize,
        filter: Option<&MetadataFilter>,
    ) -> CollaboratorResult<Vec<Chunk>>;
}

/// Builds a fresh index per run. Indexes are never shared between runs.
#[async_trait]
pub trait IndexBuilder: Send + Sync {
    async fn build(&self, chunks: &[Chunk]) -> CollaboratorResult<Box<dyn SimilarityIndex>>;
}

// ─── LanguageModel ────────────────────────────────────────────────────────────
/// Text generation and judgment calls.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Specific, checkable claims derived from the question.
    async fn generate_hypotheses(&self, question: &str) -> CollaboratorResult<Vec<String>>;

    /// Reformulations of the question used to widen retrieval.
    async fn expand_query(&self, question: &str) -> CollaboratorResult<Vec<String>>;

    /// How well `chunk_text` supports `hypothesis`.
    async fn judge(
        &self,
        hypothesis: &str,
        chunk_text: &str,
        metadata:   &ChunkMetadata,
    ) -> CollaboratorResult<Judgment>;
}
