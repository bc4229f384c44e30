// ============================================================
// Layer 3 — Run State
// ============================================================
// Exactly one RunState exists per question. The pipeline owns
// it and lends it immutably to one stage at a time; the stage
// answers with a StateUpdate holding only the fields it
// produced, and the pipeline merges that update back in.
//
// Merge contract:
//   - Some(value) → the field is overwritten (later writes win)
//   - None        → the field is left untouched

use serde::{Deserialize, Serialize};

use crate::domain::chunk::Chunk;
use crate::domain::evidence::{Candidates, Evidence};
use crate::domain::paper::PaperRef;

/// The shared state threaded through every stage of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    pub question: String,
    pub papers: Vec<PaperRef>,
    pub chunks: Vec<Chunk>,
    pub expansion_queries: Vec<String>,
    pub hypotheses: Vec<String>,
    /// Retrieved, deduplicated chunks per hypothesis awaiting judgment
    pub candidates: Vec<Candidates>,
    pub evidence: Evidence,
    pub final_answer: String,
    pub retry_count: u32,
    pub last_error: Option<String>,
}

impl RunState {
    /// Fresh state for a newly submitted question.
    pub fn new(question: impl Into<String>) -> Self {
        Self { question: question.into(), ..Default::default() }
    }

    /// Apply a stage's partial update.
    pub fn merge(&mut self, update: StateUpdate) {
        let StateUpdate {
            papers,
            chunks,
            expansion_queries,
            hypotheses,
            candidates,
            evidence,
            final_answer,
            retry_count,
            last_error,
        } = update;

        if let Some(v) = papers            { self.papers = v; }
        if let Some(v) = chunks            { self.chunks = v; }
        if let Some(v) = expansion_queries { self.expansion_queries = v; }
        if let Some(v) = hypotheses        { self.hypotheses = v; }
        if let Some(v) = candidates        { self.candidates = v; }
        if let Some(v) = evidence          { self.evidence = v; }
        if let Some(v) = final_answer      { self.final_answer = v; }
        // retry_count only ever grows
        if let Some(v) = retry_count       { self.retry_count = self.retry_count.max(v); }
        if let Some(v) = last_error        { self.last_error = Some(v); }
    }
}

/// The fields a stage produced. Every field is optional; see the
/// merge contract above.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    pub papers: Option<Vec<PaperRef>>,
    pub chunks: Option<Vec<Chunk>>,
    pub expansion_queries: Option<Vec<String>>,
    pub hypotheses: Option<Vec<String>>,
    pub candidates: Option<Vec<Candidates>>,
    pub evidence: Option<Evidence>,
    pub final_answer: Option<String>,
    pub retry_count: Option<u32>,
    pub last_error: Option<String>,
}

impl StateUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn papers(mut self, v: Vec<PaperRef>) -> Self {
        self.papers = Some(v);
        self
    }

    pub fn chunks(mut self, v: Vec<Chunk>) -> Self {
        self.chunks = Some(v);
        self
    }

    pub fn expansion_queries(mut self, v: Vec<String>) -> Self {
        self.expansion_queries = Some(v);
        self
    }

    pub fn hypotheses(mut self, v: Vec<String>) -> Self {
        self.hypotheses = Some(v);
        self
    }

    pub fn candidates(mut self, v: Vec<Candidates>) -> Self {
        self.candidates = Some(v);
        self
    }

    pub fn evidence(mut self, v: Evidence) -> Self {
        self.evidence = Some(v);
        self
    }

    pub fn final_answer(mut self, v: impl Into<String>) -> Self {
        self.final_answer = Some(v.into());
        self
    }

    pub fn retry_count(mut self, v: u32) -> Self {
        self.retry_count = Some(v);
        self
    }

    pub fn last_error(mut self, v: impl Into<String>) -> Self {
        self.last_error = Some(v.into());
        self
    }
}
