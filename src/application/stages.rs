// ============================================================
// Layer 2 — Pipeline Stages
// ============================================================
// One async function per stage. Every stage:
//   - borrows the current RunState immutably
//   - reads only the fields it depends on
//   - returns a StateUpdate holding only the fields it produced
//
// A stage returns Err(StageFault) when continuing would be
// pointless (no papers could be discovered at all, no
// hypotheses to check). The state machine then merges the
// fault's update and jumps straight to Synthesize, so the user
// still gets an answer that discloses the gap.
//
//   Discover   → papers
//   Extract    → chunks
//   Expand     → hypotheses, expansion_queries
//   Retrieve   → candidates
//   Validate   → evidence
//   Synthesize → final_answer

use std::sync::Arc;

use futures::stream::{self, StreamExt};

use crate::application::aggregator;
use crate::application::fallback;
use crate::domain::chunk::Chunk;
use crate::domain::config::RunConfig;
use crate::domain::evidence::{Evidence, EvidenceRecord, Judgment, ValidatedChunk};
use crate::domain::paper::merge_papers;
use crate::domain::state::{RunState, StateUpdate};
use crate::domain::traits::{IndexBuilder, LanguageModel, PaperSource, TextExtractor};
use crate::retrieval::fanout::{self, FanoutSettings};

/// The external collaborators a run talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub papers: Arc<dyn PaperSource>,
    pub extractor: Arc<dyn TextExtractor>,
    pub index: Arc<dyn IndexBuilder>,
    pub llm: Arc<dyn LanguageModel>,
}

/// Everything a stage may use besides the run state.
#[derive(Clone)]
pub struct StageContext {
    pub collaborators: Collaborators,
    pub config: RunConfig,
}

/// A stage's signal that the run should go straight to synthesis.
#[derive(Debug, Clone, PartialEq)]
pub struct StageFault {
    /// Fields the stage still produced before giving up
    pub update: StateUpdate,
    pub message: String,
}

impl StageFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self { update: StateUpdate::new(), message: message.into() }
    }

    pub fn with_update(mut self, update: StateUpdate) -> Self {
        self.update = update;
        self
    }
}

pub type StageResult = Result<StateUpdate, StageFault>;

// ─── Discover ─────────────────────────────────────────────────────────────────
/// Find papers for the question. A retry pass asks for more
/// results and keeps the papers already known.
pub async fn discover(state: &RunState, ctx: &StageContext) -> StageResult {
    let wanted = ctx.config.papers_for_pass(state.retry_count);
    tracing::info!("Discovering up to {} papers (pass {})", wanted, state.retry_count + 1);

    let call = ctx.collaborators.papers.discover(&state.question, wanted);
    match fallback::guarded(ctx.config.fetch_timeout(), call).await {
        Ok(found) => {
            if found.is_empty() {
                tracing::warn!("Discovery returned no papers; no evidence available");
            }
            let papers = merge_papers(&state.papers, found);
            tracing::info!("Known papers: {}", papers.len());
            Ok(StateUpdate::new().papers(papers))
        }
        Err(e) => Err(StageFault::new(fallback::discovery(&state.question, &e))),
    }
}

// ─── Extract ──────────────────────────────────────────────────────────────────
/// Extract chunks from every known paper, in parallel, paper order preserved.
pub async fn extract(state: &RunState, ctx: &StageContext) -> StageResult {
    let papers    = &state.papers;
    let extractor = ctx.collaborators.extractor.as_ref();
    let timeout   = ctx.config.fetch_timeout();

    let mut slots: Vec<Vec<Chunk>> = vec![Vec::new(); papers.len()];

    let mut completed = stream::iter(papers.iter().enumerate())
        .map(move |(slot, paper)| async move {
            (slot, fallback::guarded(timeout, extractor.extract(paper)).await)
        })
        .buffer_unordered(ctx.config.concurrency_limit.max(1));

    while let Some((slot, result)) = completed.next().await {
        slots[slot] = match result {
            Ok(chunks) => {
                tracing::debug!("'{}': {} chunks", papers[slot].title, chunks.len());
                chunks
            }
            Err(e) => fallback::extraction(&papers[slot], &e),
        };
    }

    let chunks: Vec<Chunk> = slots.into_iter().flatten().collect();
    tracing::info!("Extracted {} chunks from {} papers", chunks.len(), papers.len());
    Ok(StateUpdate::new().chunks(chunks))
}

// ─── Expand ───────────────────────────────────────────────────────────────────
/// Generate hypotheses and expansion queries from the question.
pub async fn expand(state: &RunState, ctx: &StageContext) -> StageResult {
    let llm      = ctx.collaborators.llm.as_ref();
    let timeout  = ctx.config.call_timeout();
    let question = state.question.as_str();

    let (hypotheses, expansions) = futures::join!(
        fallback::guarded(timeout, llm.generate_hypotheses(question)),
        fallback::guarded(timeout, llm.expand_query(question)),
    );

    let mut expansion_queries = match expansions {
        Ok(list) => tidy(list, ctx.config.max_expansions),
        Err(e)   => fallback::expansion(question, &e),
    };
    if expansion_queries.is_empty() {
        expansion_queries.push(question.to_string());
    }

    let hypotheses = match hypotheses {
        Ok(list) => tidy(list, ctx.config.max_hypotheses),
        Err(e) => {
            let message = fallback::hypotheses(&e);
            let update  = StateUpdate::new().expansion_queries(expansion_queries);
            return Err(StageFault::new(message).with_update(update));
        }
    };

    if hypotheses.is_empty() {
        let update = StateUpdate::new().expansion_queries(expansion_queries);
        return Err(StageFault::new("no hypotheses could be generated").with_update(update));
    }

    tracing::info!(
        "Generated {} hypotheses and {} expansion queries",
        hypotheses.len(),
        expansion_queries.len()
    );
    Ok(StateUpdate::new()
        .hypotheses(hypotheses)
        .expansion_queries(expansion_queries))
}

/// Trim, drop blanks and repeats, cap the length.
fn tidy(list: Vec<String>, max: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in list {
        let item = item.trim().to_string();
        if !item.is_empty() && !out.contains(&item) {
            out.push(item);
        }
    }
    out.truncate(max);
    out
}

// ─── Retrieve ─────────────────────────────────────────────────────────────────
/// Fan out similarity searches over a fresh index of the current chunk pool.
pub async fn retrieve(state: &RunState, ctx: &StageContext) -> StageResult {
    let settings = FanoutSettings::from(&ctx.config);
    let result = fanout::retrieve(
        ctx.collaborators.index.as_ref(),
        &state.hypotheses,
        &state.expansion_queries,
        &state.chunks,
        &settings,
    )
    .await;

    match result {
        Ok(candidates) => Ok(StateUpdate::new().candidates(candidates)),
        Err(e) => {
            tracing::warn!("Similarity index unavailable: {}", e);
            Ok(StateUpdate::new()
                .candidates(Vec::new())
                .last_error(format!("similarity index unavailable: {e}")))
        }
    }
}

// ─── Validate ─────────────────────────────────────────────────────────────────
/// Judge every (hypothesis, chunk) pair exactly once.
pub async fn validate(state: &RunState, ctx: &StageContext) -> StageResult {
    let llm     = ctx.collaborators.llm.as_ref();
    let timeout = ctx.config.call_timeout();

    // Flatten to (hypothesis index, chunk index) pairs; one slot per pair
    let pairs: Vec<(usize, usize)> = state
        .candidates
        .iter()
        .enumerate()
        .flat_map(|(h, c)| (0..c.chunks.len()).map(move |i| (h, i)))
        .collect();

    let mut slots: Vec<Option<Judgment>> = vec![None; pairs.len()];
    let candidates = &state.candidates;

    let mut completed = stream::iter(pairs.iter().copied().enumerate())
        .map(move |(slot, (h, i))| async move {
            let hypothesis = candidates[h].hypothesis.as_str();
            let chunk      = &candidates[h].chunks[i];
            let call       = llm.judge(hypothesis, &chunk.text, &chunk.metadata);
            let judgment   = match fallback::guarded(timeout, call).await {
                Ok(j)  => j,
                Err(e) => fallback::judgment(hypothesis, &e),
            };
            (slot, judgment)
        })
        .buffer_unordered(ctx.config.concurrency_limit.max(1));

    while let Some((slot, judgment)) = completed.next().await {
        slots[slot] = Some(judgment);
    }

    let mut records: Vec<EvidenceRecord> = candidates
        .iter()
        .map(|c| EvidenceRecord::new(c.hypothesis.clone()))
        .collect();

    for (&(h, i), judgment) in pairs.iter().zip(slots) {
        if let Some(judgment) = judgment {
            records[h].validated_chunks.push(ValidatedChunk {
                chunk: candidates[h].chunks[i].clone(),
                judgment,
            });
        }
    }

    let evidence: Evidence = records.into_iter().collect();
    tracing::info!(
        "Validated {} pairs: {} confirmed",
        evidence.records().iter().map(|r| r.validated_chunks.len()).sum::<usize>(),
        evidence.confirmed_count()
    );
    Ok(StateUpdate::new().evidence(evidence))
}

// ─── Synthesize ───────────────────────────────────────────────────────────────
/// Render the final answer from the confirmed evidence.
pub async fn synthesize(state: &RunState, _ctx: &StageContext) -> StageResult {
    let synthesis = aggregator::aggregate(&state.evidence);
    tracing::info!(
        "Synthesised answer: {} confirmed, {} partial hypotheses",
        synthesis.confirmed.len(),
        synthesis.partial.len()
    );
    Ok(StateUpdate::new().final_answer(synthesis.render(state.last_error.as_deref())))
}
