// Scripted collaborators shared by the unit tests of the
// application and retrieval layers. Nothing here touches the
// network or the filesystem.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::application::retry::{RetryController, RetryDecision};
use crate::application::stages::{Collaborators, StageContext};
use crate::domain::chunk::{Chunk, ChunkMetadata, MetadataFilter};
use crate::domain::config::RunConfig;
use crate::domain::error::{CollaboratorError, CollaboratorResult};
use crate::domain::evidence::{Evidence, Judgment};
use crate::domain::paper::PaperRef;
use crate::domain::traits::{LanguageModel, PaperSource, SimilarityIndex, TextExtractor};
use crate::retrieval::index::KeywordIndexBuilder;

/// A chunk from a paper titled "Test Paper".
pub fn chunk(text: &str) -> Chunk {
    Chunk::from_source(text, "Test Paper")
}

/// Stage context over the given fakes, the keyword index and default config.
pub fn context(papers: Arc<StaticPapers>, extractor: StaticExtractor, model: ScriptedModel) -> StageContext {
    StageContext {
        collaborators: Collaborators {
            papers,
            extractor: Arc::new(extractor),
            index:     Arc::new(KeywordIndexBuilder),
            llm:       Arc::new(model),
        },
        config: RunConfig::default(),
    }
}

// ─── ScriptedIndex ────────────────────────────────────────────────────────────
/// Answers known queries after a fixed delay; unknown queries get nothing.
#[derive(Default)]
pub struct ScriptedIndex {
    responses: Vec<(String, Vec<Chunk>, Duration)>,
    calls: AtomicUsize,
}

impl ScriptedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, query: &str, chunks: Vec<Chunk>, delay: Duration) -> Self {
        self.responses.push((query.to_string(), chunks, delay));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SimilarityIndex for ScriptedIndex {
    async fn search(
        &self,
        query:   &str,
        k:       usize,
        _filter: Option<&MetadataFilter>,
    ) -> CollaboratorResult<Vec<Chunk>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let Some((_, chunks, delay)) = self.responses.iter().find(|(q, _, _)| q == query) else {
            return Ok(Vec::new());
        };
        tokio::time::sleep(*delay).await;
        Ok(chunks.iter().take(k).cloned().collect())
    }
}

// ─── StaticPapers ─────────────────────────────────────────────────────────────
/// Returns the first `max_results` of a fixed paper list, or always fails.
pub struct StaticPapers {
    papers: Vec<PaperRef>,
    failure: Option<String>,
    requested: Mutex<Vec<usize>>,
}

impl StaticPapers {
    pub fn new(papers: Vec<PaperRef>) -> Self {
        Self { papers, failure: None, requested: Mutex::new(Vec::new()) }
    }

    pub fn failing(reason: &str) -> Self {
        Self { papers: Vec::new(), failure: Some(reason.to_string()), requested: Mutex::new(Vec::new()) }
    }

    /// `max_results` of every discover call so far, in call order.
    pub fn requested(&self) -> Vec<usize> {
        self.requested.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PaperSource for StaticPapers {
    async fn discover(&self, _query: &str, max_results: usize) -> CollaboratorResult<Vec<PaperRef>> {
        if let Ok(mut requested) = self.requested.lock() {
            requested.push(max_results);
        }
        match &self.failure {
            Some(reason) => Err(CollaboratorError::source_unavailable(reason.clone())),
            None         => Ok(self.papers.iter().take(max_results).cloned().collect()),
        }
    }
}

// ─── StaticExtractor ──────────────────────────────────────────────────────────
/// Chunks per paper id. Unknown ids extract to nothing.
#[derive(Default)]
pub struct StaticExtractor {
    chunks: Vec<(String, Vec<Chunk>)>,
    failing: Vec<String>,
}

impl StaticExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, paper_id: &str, chunks: Vec<Chunk>) -> Self {
        self.chunks.push((paper_id.to_string(), chunks));
        self
    }

    pub fn failing(mut self, paper_id: &str) -> Self {
        self.failing.push(paper_id.to_string());
        self
    }
}

#[async_trait]
impl TextExtractor for StaticExtractor {
    async fn extract(&self, paper: &PaperRef) -> CollaboratorResult<Vec<Chunk>> {
        if self.failing.contains(&paper.id) {
            return Err(CollaboratorError::transport(format!("cannot fetch {}", paper.locator)));
        }
        Ok(self
            .chunks
            .iter()
            .find(|(id, _)| *id == paper.id)
            .map(|(_, chunks)| chunks.clone())
            .unwrap_or_default())
    }
}

// ─── ScriptedModel ────────────────────────────────────────────────────────────
#[derive(Default)]
struct ModelCalls {
    hypotheses: AtomicUsize,
    expansions: AtomicUsize,
    judgments: AtomicUsize,
}

/// Language model with canned answers. `None` lists fail the call.
/// Judgments are matched by a substring of the chunk text; anything
/// unmatched is judged unconfirmed.
#[derive(Clone)]
pub struct ScriptedModel {
    hypotheses: Option<Vec<String>>,
    expansions: Option<Vec<String>>,
    judgments: Vec<(String, Judgment)>,
    unparsable: Vec<String>,
    calls: Arc<ModelCalls>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self {
            hypotheses: Some(Vec::new()),
            expansions: Some(Vec::new()),
            judgments:  Vec::new(),
            unparsable: Vec::new(),
            calls:      Arc::new(ModelCalls::default()),
        }
    }

    pub fn hypotheses(mut self, list: Vec<&str>) -> Self {
        self.hypotheses = Some(list.into_iter().map(String::from).collect());
        self
    }

    pub fn expansions(mut self, list: Vec<&str>) -> Self {
        self.expansions = Some(list.into_iter().map(String::from).collect());
        self
    }

    pub fn failing_hypotheses(mut self) -> Self {
        self.hypotheses = None;
        self
    }

    pub fn failing_expansion(mut self) -> Self {
        self.expansions = None;
        self
    }

    pub fn judge_text(mut self, needle: &str, judgment: Judgment) -> Self {
        self.judgments.push((needle.to_string(), judgment));
        self
    }

    /// Chunks containing `needle` get an answer that cannot be parsed.
    pub fn unparsable_for(mut self, needle: &str) -> Self {
        self.unparsable.push(needle.to_string());
        self
    }

    pub fn hypothesis_calls(&self) -> usize {
        self.calls.hypotheses.load(Ordering::SeqCst)
    }

    pub fn expansion_calls(&self) -> usize {
        self.calls.expansions.load(Ordering::SeqCst)
    }

    pub fn judge_calls(&self) -> usize {
        self.calls.judgments.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate_hypotheses(&self, _question: &str) -> CollaboratorResult<Vec<String>> {
        self.calls.hypotheses.fetch_add(1, Ordering::SeqCst);
        self.hypotheses
            .clone()
            .ok_or_else(|| CollaboratorError::transport("model offline"))
    }

    async fn expand_query(&self, _question: &str) -> CollaboratorResult<Vec<String>> {
        self.calls.expansions.fetch_add(1, Ordering::SeqCst);
        self.expansions
            .clone()
            .ok_or_else(|| CollaboratorError::transport("model offline"))
    }

    async fn judge(
        &self,
        _hypothesis: &str,
        chunk_text:  &str,
        _metadata:   &ChunkMetadata,
    ) -> CollaboratorResult<Judgment> {
        self.calls.judgments.fetch_add(1, Ordering::SeqCst);
        if self.unparsable.iter().any(|n| chunk_text.contains(n.as_str())) {
            return Err(CollaboratorError::judgment_parse("no JSON object in reply"));
        }
        Ok(self
            .judgments
            .iter()
            .find(|(needle, _)| chunk_text.contains(needle.as_str()))
            .map(|(_, j)| j.clone())
            .unwrap_or_else(|| Judgment::unconfirmed(0.1, "unrelated")))
    }
}

// ─── AlwaysRetry ──────────────────────────────────────────────────────────────
/// A controller that never lets the run finish on its own.
pub struct AlwaysRetry;

impl RetryController for AlwaysRetry {
    fn decide(&self, _evidence: &Evidence, _retry_count: u32) -> RetryDecision {
        RetryDecision::Retry
    }
}
