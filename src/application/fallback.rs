// ============================================================
// Layer 2 — Fallback Policy
// ============================================================
// One place decides what a failed external call turns into.
// Every call site wraps its call in `guarded` (timeout → error,
// from domain::error) and hands any error to the function for
// that call type:
//
//   call                 fallback value              last_error?
//   ───────────────────  ──────────────────────────  ───────────
//   discover             no papers, fatal fault       yes
//   extract (per paper)  no chunks for that paper     no
//   generate_hypotheses  no hypotheses                yes
//   expand_query         [question]                   no
//   search (per query)   empty result list            no   (retrieval::fanout)
//   judge (per pair)     parse-error / unavailable    no
//
// Nothing here returns an error: a failed item never takes the
// rest of its batch down with it.

use crate::domain::chunk::Chunk;
use crate::domain::error::CollaboratorError;
use crate::domain::evidence::Judgment;
use crate::domain::paper::PaperRef;

pub use crate::domain::error::guarded;

/// Reason recorded when the judge could not be reached at all.
pub const JUDGE_UNAVAILABLE_REASON: &str = "judge unavailable";

/// Discovery failed: no papers, and a message for `last_error`.
pub fn discovery(query: &str, err: &CollaboratorError) -> String {
    tracing::warn!("Discovery for '{}' failed: {}", query, err);
    format!("paper discovery failed: {err}")
}

/// Extraction of one paper failed: it contributes no chunks.
pub fn extraction(paper: &PaperRef, err: &CollaboratorError) -> Vec<Chunk> {
    tracing::warn!("Skipping '{}': {}", paper.title, err);
    Vec::new()
}

/// Hypothesis generation failed: no hypotheses, and a message for `last_error`.
pub fn hypotheses(err: &CollaboratorError) -> String {
    tracing::warn!("Hypothesis generation failed: {}", err);
    format!("hypothesis generation failed: {err}")
}

/// Query expansion failed: search with the question alone.
pub fn expansion(question: &str, err: &CollaboratorError) -> Vec<String> {
    tracing::warn!("Query expansion failed, using the question only: {}", err);
    vec![question.to_string()]
}

/// One judgment failed. Unparsable answers get the low-confidence
/// parse-error judgment; unreachable judges get zero confidence.
pub fn judgment(hypothesis: &str, err: &CollaboratorError) -> Judgment {
    tracing::warn!("Judgment for '{}' failed: {}", hypothesis, err);
    match err {
        CollaboratorError::JudgmentParse { .. } | CollaboratorError::InvalidResponse { .. } => {
            Judgment::parse_fallback()
        }
        _ => Judgment::unconfirmed(0.0, JUDGE_UNAVAILABLE_REASON),
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::evidence::Support;
    use std::time::Duration;

    #[test]
    fn test_parse_failure_gets_parse_fallback() {
        let j = judgment("h", &CollaboratorError::judgment_parse("not json"));
        assert_eq!(j, Judgment::parse_fallback());
    }

    #[test]
    fn test_timeout_gets_zero_confidence() {
        let j = judgment("h", &CollaboratorError::Timeout(Duration::from_secs(30)));
        assert_eq!(j.support(), Support::Unconfirmed);
        assert_eq!(j.confidence(), 0.0);
        assert_eq!(j.reason(), JUDGE_UNAVAILABLE_REASON);
    }

    #[test]
    fn test_expansion_falls_back_to_question() {
        let q = expansion("reduce KV cache", &CollaboratorError::transport("down"));
        assert_eq!(q, vec!["reduce KV cache"]);
    }

    #[test]
    fn test_discovery_message_mentions_cause() {
        let msg = discovery("q", &CollaboratorError::source_unavailable("HTTP 503"));
        assert!(msg.contains("HTTP 503"));
    }
}
