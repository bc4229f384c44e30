// ============================================================
// Layer 2 — Pipeline State Machine
// ============================================================
// Drives one RunState through the stages:
//
//   Discover → Extract → Expand → Retrieve → Validate ─┬─► Synthesize → Done
//      ▲                                               │
//      └──────────────────── Retry ◄───────────────────┘
//
// Rules:
//   - every stage invocation counts against step_budget; Retry
//     itself invokes nothing and does not count
//   - a run that would exceed the budget halts with
//     PipelineError::BudgetExceeded carrying the last good state
//   - Retry raises retry_count by one, capped at max_retries, and
//     discovery on the next pass asks for more papers
//   - on a retry pass Expand is skipped when hypotheses and
//     expansion queries are already known, so one retry plus
//     synthesis fits the default budget (5 + 4 + 1 = 10)
//   - a stage fault records last_error and jumps to Synthesize
//
// Stages run strictly one at a time; only the work inside a
// stage is concurrent.

use std::fmt;

use serde::Serialize;
use tokio::time::Instant;

use crate::application::retry::{ConfirmedEvidencePolicy, RetryController, RetryDecision};
use crate::application::stages::{self, StageContext, StageResult};
use crate::domain::error::PipelineError;
use crate::domain::state::{RunState, StateUpdate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Discover,
    Extract,
    Expand,
    Retrieve,
    Validate,
    Retry,
    Synthesize,
}

impl Step {
    /// Whether visiting this step invokes a stage (and spends budget).
    pub fn is_stage(self) -> bool {
        !matches!(self, Step::Retry)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Discover   => "discover",
            Step::Extract    => "extract",
            Step::Expand     => "expand",
            Step::Retrieve   => "retrieve",
            Step::Validate   => "validate",
            Step::Retry      => "retry",
            Step::Synthesize => "synthesize",
        };
        f.write_str(name)
    }
}

/// One visited step of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageTrace {
    pub step: Step,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fault: Option<String>,
}

/// A finished run together with the path it took.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub state: RunState,
    pub trace: Vec<StageTrace>,
}

impl RunReport {
    pub fn stage_invocations(&self) -> usize {
        self.trace.iter().filter(|t| t.step.is_stage()).count()
    }

    pub fn steps(&self) -> Vec<Step> {
        self.trace.iter().map(|t| t.step).collect()
    }
}

pub struct Pipeline {
    ctx: StageContext,
    retry: Box<dyn RetryController>,
}

impl Pipeline {
    /// Pipeline with the confirmed-evidence retry policy from `ctx.config`.
    pub fn new(ctx: StageContext) -> Self {
        let retry = Box::new(ConfirmedEvidencePolicy::from_config(&ctx.config));
        Self { ctx, retry }
    }

    pub fn with_retry_controller(mut self, retry: Box<dyn RetryController>) -> Self {
        self.retry = retry;
        self
    }

    /// Answer `question`, returning the final state.
    pub async fn run(&self, question: &str) -> Result<RunState, PipelineError> {
        self.run_traced(question).await.map(|report| report.state)
    }

    /// Answer `question`, returning the final state and the step trace.
    pub async fn run_traced(&self, question: &str) -> Result<RunReport, PipelineError> {
        let budget = self.ctx.config.step_budget;
        let mut state       = RunState::new(question);
        let mut trace       = Vec::new();
        let mut invocations = 0u32;
        let mut next        = Some(Step::Discover);

        tracing::info!("Run started: '{}'", question);

        while let Some(step) = next {
            if step == Step::Retry {
                let retry_count = (state.retry_count + 1).min(self.ctx.config.max_retries);
                tracing::info!("Evidence is thin, retrying (retry_count = {})", retry_count);
                state.merge(StateUpdate::new().retry_count(retry_count));
                trace.push(StageTrace { step, elapsed_ms: 0, fault: None });
                next = Some(Step::Discover);
                continue;
            }

            if invocations >= budget {
                tracing::error!("Step budget of {} exhausted before '{}'", budget, step);
                return Err(PipelineError::BudgetExceeded { budget, state: Box::new(state) });
            }
            invocations += 1;

            let started = Instant::now();
            let outcome = self.invoke(step, &state).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match outcome {
                Ok(update) => {
                    state.merge(update);
                    trace.push(StageTrace { step, elapsed_ms, fault: None });
                    next = self.next_after(step, &state);
                }
                Err(fault) => {
                    tracing::warn!("Stage '{}' faulted: {}", step, fault.message);
                    state.merge(fault.update.last_error(fault.message.clone()));
                    trace.push(StageTrace { step, elapsed_ms, fault: Some(fault.message) });
                    next = (step != Step::Synthesize).then_some(Step::Synthesize);
                }
            }
        }

        tracing::info!(
            "Run finished after {} stage invocations ({} retries)",
            invocations,
            state.retry_count
        );
        Ok(RunReport { state, trace })
    }

    async fn invoke(&self, step: Step, state: &RunState) -> StageResult {
        tracing::debug!("Entering stage '{}'", step);
        match step {
            Step::Discover   => stages::discover(state, &self.ctx).await,
            Step::Extract    => stages::extract(state, &self.ctx).await,
            Step::Expand     => stages::expand(state, &self.ctx).await,
            Step::Retrieve   => stages::retrieve(state, &self.ctx).await,
            Step::Validate   => stages::validate(state, &self.ctx).await,
            Step::Synthesize => stages::synthesize(state, &self.ctx).await,
            Step::Retry      => Ok(StateUpdate::new()),
        }
    }

    fn next_after(&self, step: Step, state: &RunState) -> Option<Step> {
        match step {
            Step::Discover => Some(Step::Extract),
            Step::Extract => {
                let expanded = !state.hypotheses.is_empty() && !state.expansion_queries.is_empty();
                Some(if expanded { Step::Retrieve } else { Step::Expand })
            }
            Step::Expand   => Some(Step::Retrieve),
            Step::Retrieve => Some(Step::Validate),
            Step::Validate => match self.retry.decide(&state.evidence, state.retry_count) {
                RetryDecision::Retry      => Some(Step::Retry),
                RetryDecision::Synthesize => Some(Step::Synthesize),
            },
            Step::Retry      => Some(Step::Discover),
            Step::Synthesize => None,
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;

    use super::*;
    use crate::application::aggregator::NO_CONFIRMATION;
    use crate::application::test_support::{
        context, AlwaysRetry, ScriptedModel, StaticExtractor, StaticPapers,
    };
    use crate::domain::chunk::Chunk;
    use crate::domain::evidence::{Judgment, PARSE_ERROR_REASON};
    use crate::domain::paper::PaperRef;

    const QUESTION: &str = "How can the KV cache memory of a transformer be reduced?";
    const HYPOTHESIS: &str = "Quantizing the KV cache reduces memory";

    fn kv_papers() -> Vec<PaperRef> {
        vec![
            PaperRef::new("p1", "Paper One", "p1.pdf"),
            PaperRef::new("p2", "Paper Two", "p2.pdf"),
        ]
    }

    fn kv_extractor() -> StaticExtractor {
        StaticExtractor::new()
            .with("p1", vec![
                Chunk::from_source("Quantizing the KV cache to 4 bits reduces memory by half.", "Paper One"),
                Chunk::from_source("A survey of migratory birds in northern Europe.", "Paper One"),
            ])
            .with("p2", vec![
                Chunk::from_source("KV cache quantization cuts memory use with little accuracy loss.", "Paper Two"),
            ])
    }

    fn kv_model() -> ScriptedModel {
        ScriptedModel::new()
            .hypotheses(vec![HYPOTHESIS])
            .expansions(vec!["KV cache quantization"])
            .judge_text("4 bits", Judgment::confirmed(0.9, "states the memory saving"))
            .judge_text("little accuracy", Judgment::confirmed(0.8, "reports lower memory use"))
    }

    #[tokio::test]
    async fn test_confirmed_hypothesis_end_to_end() {
        let ctx    = context(Arc::new(StaticPapers::new(kv_papers())), kv_extractor(), kv_model());
        let report = Pipeline::new(ctx).run_traced(QUESTION).await.unwrap();

        assert_eq!(
            report.steps(),
            vec![Step::Discover, Step::Extract, Step::Expand, Step::Retrieve, Step::Validate, Step::Synthesize]
        );
        let state = report.state;
        assert_eq!(state.retry_count, 0);
        assert_eq!(state.hypotheses, vec![HYPOTHESIS]);
        assert_eq!(state.evidence.confirmed_count(), 2);
        assert!(state.final_answer.contains(&format!("1. {HYPOTHESIS}")));
        assert!(state.final_answer.contains("Confidence: 0.85"));
        assert!(state.final_answer.contains("4 bits"));
        assert!(state.last_error.is_none());
    }

    #[tokio::test]
    async fn test_thin_evidence_retries_once_within_budget() {
        let papers = Arc::new(StaticPapers::new(kv_papers()));
        let model  = ScriptedModel::new()
            .hypotheses(vec![HYPOTHESIS])
            .expansions(vec!["KV cache quantization"]);
        let ctx    = context(papers.clone(), kv_extractor(), model.clone());

        let report = Pipeline::new(ctx).run_traced(QUESTION).await.unwrap();

        assert_eq!(report.stage_invocations(), 10);
        assert_eq!(report.state.retry_count, 1);
        assert_eq!(papers.requested(), vec![3, 6]);
        // Hypotheses and expansions survive the retry untouched
        assert_eq!(model.hypothesis_calls(), 1);
        assert_eq!(model.expansion_calls(), 1);
        assert!(report.steps().contains(&Step::Retry));
        assert!(report.state.final_answer.contains(NO_CONFIRMATION));
    }

    #[tokio::test]
    async fn test_discovery_failure_short_circuits_to_synthesis() {
        let ctx    = context(Arc::new(StaticPapers::failing("arXiv returned 503")), kv_extractor(), kv_model());
        let report = Pipeline::new(ctx).run_traced(QUESTION).await.unwrap();

        assert_eq!(report.steps(), vec![Step::Discover, Step::Synthesize]);
        assert!(report.trace[0].fault.is_some());

        let state = report.state;
        assert!(state.last_error.as_deref().unwrap().contains("arXiv returned 503"));
        assert!(state.final_answer.contains(NO_CONFIRMATION));
        assert!(state.final_answer.contains("Gaps: paper discovery failed"));
    }

    #[tokio::test]
    async fn test_hypothesis_failure_short_circuits_to_synthesis() {
        let model  = ScriptedModel::new().failing_hypotheses();
        let ctx    = context(Arc::new(StaticPapers::new(kv_papers())), kv_extractor(), model);
        let report = Pipeline::new(ctx).run_traced(QUESTION).await.unwrap();

        assert_eq!(
            report.steps(),
            vec![Step::Discover, Step::Extract, Step::Expand, Step::Synthesize]
        );
        assert!(report.state.final_answer.contains("Gaps: hypothesis generation failed"));
    }

    #[tokio::test]
    async fn test_no_papers_found_is_not_fatal() {
        let ctx = context(Arc::new(StaticPapers::new(vec![])), StaticExtractor::new(), kv_model());
        let state = Pipeline::new(ctx).run(QUESTION).await.unwrap();

        assert!(state.papers.is_empty());
        assert!(state.last_error.is_none());
        assert!(state.final_answer.contains(NO_CONFIRMATION));
    }

    #[tokio::test]
    async fn test_unparsable_judgment_gets_parse_fallback() {
        let model = kv_model().unparsable_for("4 bits");
        let ctx   = context(Arc::new(StaticPapers::new(kv_papers())), kv_extractor(), model);
        let state = Pipeline::new(ctx).run(QUESTION).await.unwrap();

        let record = state.evidence.get(HYPOTHESIS).unwrap();
        let fallback = record
            .validated_chunks
            .iter()
            .find(|vc| vc.chunk.text.contains("4 bits"))
            .unwrap();
        assert_eq!(fallback.judgment.reason(), PARSE_ERROR_REASON);
        assert!((fallback.judgment.confidence() - 0.1).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_budget_exceeded_returns_last_good_state() {
        let mut ctx = context(Arc::new(StaticPapers::new(kv_papers())), kv_extractor(), kv_model());
        ctx.config.step_budget = 3;

        let err = Pipeline::new(ctx).run(QUESTION).await.unwrap_err();
        let PipelineError::BudgetExceeded { budget, ref state } = err;
        assert_eq!(budget, 3);
        assert_eq!(state.hypotheses, vec![HYPOTHESIS]);
        assert!(state.candidates.is_empty());
        assert!(state.final_answer.is_empty());
    }

    #[tokio::test]
    async fn test_always_retry_is_stopped_by_the_budget() {
        let papers = Arc::new(StaticPapers::new(kv_papers()));
        let ctx    = context(papers.clone(), kv_extractor(), kv_model());

        let err = Pipeline::new(ctx)
            .with_retry_controller(Box::new(AlwaysRetry))
            .run(QUESTION)
            .await
            .unwrap_err();

        let state = err.into_state();
        // retry_count saturates at max_retries
        assert_eq!(state.retry_count, 1);
        // passes: D E X R V | D E R V | D → three discovery calls
        assert_eq!(papers.requested().len(), 3);
    }

    proptest! {
        #[test]
        fn prop_runs_always_terminate_within_budget(budget in 1u32..30, max_retries in 0u32..4, always_retry: bool) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .unwrap();

            let papers = Arc::new(StaticPapers::new(kv_papers()));
            let model  = ScriptedModel::new().hypotheses(vec![HYPOTHESIS]).expansions(vec!["KV cache"]);
            let mut ctx = context(papers.clone(), kv_extractor(), model.clone());
            ctx.config.step_budget = budget;
            ctx.config.max_retries = max_retries;

            let mut pipeline = Pipeline::new(ctx);
            if always_retry {
                pipeline = pipeline.with_retry_controller(Box::new(AlwaysRetry));
            }

            let result = runtime.block_on(pipeline.run_traced(QUESTION));
            match result {
                Ok(report) => {
                    prop_assert!(!always_retry);
                    prop_assert!(report.stage_invocations() as u32 <= budget);
                    prop_assert!(report.state.retry_count <= max_retries);
                    prop_assert!(!report.state.final_answer.is_empty());
                }
                Err(PipelineError::BudgetExceeded { budget: b, state }) => {
                    prop_assert_eq!(b, budget);
                    prop_assert!(state.retry_count <= max_retries);
                }
            }
            prop_assert!(papers.requested().len() as u32 <= budget);
            prop_assert!(model.hypothesis_calls() as u32 <= budget);
        }
    }
}
