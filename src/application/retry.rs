// ============================================================
// Layer 2 — Retry Controller
// ============================================================
// After validation the pipeline asks one question: is there
// enough confirmed evidence to answer, or should discovery run
// again with a wider net?
//
// Rule (ConfirmedEvidencePolicy):
//   confirmed chunks across all hypotheses < min_confirmed
//   AND retry_count < max_retries          → Retry
//   otherwise                              → Synthesize
//
// `decide` is a pure function of its inputs. The state machine
// applies the decision (and increments retry_count); stages
// never retry on their own. Setting max_retries = 0 removes the
// retry edge entirely.

use crate::domain::config::RunConfig;
use crate::domain::evidence::Evidence;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    Synthesize,
}

/// Chooses between another discovery pass and synthesis.
pub trait RetryController: Send + Sync {
    fn decide(&self, evidence: &Evidence, retry_count: u32) -> RetryDecision;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmedEvidencePolicy {
    pub min_confirmed: usize,
    pub max_retries: u32,
}

impl ConfirmedEvidencePolicy {
    pub fn new(min_confirmed: usize, max_retries: u32) -> Self {
        Self { min_confirmed, max_retries }
    }

    pub fn from_config(cfg: &RunConfig) -> Self {
        Self::new(cfg.min_confirmed, cfg.max_retries)
    }

    /// The decision expressed over a bare confirmed-chunk count.
    pub fn decide_count(&self, confirmed: usize, retry_count: u32) -> RetryDecision {
        if confirmed < self.min_confirmed && retry_count < self.max_retries {
            RetryDecision::Retry
        } else {
            RetryDecision::Synthesize
        }
    }
}

impl Default for ConfirmedEvidencePolicy {
    fn default() -> Self {
        Self::new(2, 1)
    }
}

impl RetryController for ConfirmedEvidencePolicy {
    fn decide(&self, evidence: &Evidence, retry_count: u32) -> RetryDecision {
        self.decide_count(evidence.confirmed_count(), retry_count)
    }
}
