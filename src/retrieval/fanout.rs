// ============================================================
// Layer 5 — Retrieval Fan-out Controller
// ============================================================
// For each hypothesis the query set is
//
//   [hypothesis] + expansion_queries      (issue order)
//
// and every query becomes one `search(query, k)` call. Searches
// for the same hypothesis are independent, so they run
// concurrently (at most `concurrency_limit` in flight). Each task
// returns its slot index together with its result, and the
// result is written into that slot of a pre-sized Vec. The fold
// into the Dedup Union then walks the slots in issue order, so
// the evidence trail is the same no matter which search finished
// first.
//
// A search that fails or times out fills its slot with an empty
// list; the other queries still count.

use std::time::Duration;

use futures::stream::{self, StreamExt};

use crate::domain::chunk::{Chunk, MetadataFilter};
use crate::domain::config::RunConfig;
use crate::domain::error::{guarded, CollaboratorError, CollaboratorResult};
use crate::domain::evidence::Candidates;
use crate::domain::traits::{IndexBuilder, SimilarityIndex};
use crate::retrieval::dedup;

/// The subset of RunConfig the fan-out needs.
#[derive(Debug, Clone)]
pub struct FanoutSettings {
    pub k: usize,
    pub concurrency_limit: usize,
    pub dedup_prefix_len: usize,
    pub call_timeout: Duration,
    pub filter: Option<MetadataFilter>,
}

impl From<&RunConfig> for FanoutSettings {
    fn from(cfg: &RunConfig) -> Self {
        Self {
            k:                 cfg.k,
            concurrency_limit: cfg.concurrency_limit.max(1),
            dedup_prefix_len:  cfg.dedup_prefix_len,
            call_timeout:      cfg.call_timeout(),
            filter:            cfg.metadata_filter.clone(),
        }
    }
}

/// Query set for one hypothesis, in issue order.
pub fn queries_for(hypothesis: &str, expansion_queries: &[String]) -> Vec<String> {
    std::iter::once(hypothesis.to_string())
        .chain(expansion_queries.iter().cloned())
        .collect()
}

/// Build an index over `pool` and gather deduplicated candidates per hypothesis.
///
/// Returns an empty list, without building an index or searching,
/// when either the pool or the hypothesis list is empty.
pub async fn retrieve(
    builder:           &dyn IndexBuilder,
    hypotheses:        &[String],
    expansion_queries: &[String],
    pool:              &[Chunk],
    settings:          &FanoutSettings,
) -> CollaboratorResult<Vec<Candidates>> {
    if pool.is_empty() || hypotheses.is_empty() {
        tracing::warn!(
            "Nothing to retrieve ({} hypotheses, {} chunks)",
            hypotheses.len(),
            pool.len()
        );
        return Ok(Vec::new());
    }

    let index = guarded(settings.call_timeout, builder.build(pool)).await?;
    Ok(fan_out(index.as_ref(), hypotheses, expansion_queries, settings).await)
}

/// Search every (hypothesis × query) pair against an existing index.
pub async fn fan_out(
    index:             &dyn SimilarityIndex,
    hypotheses:        &[String],
    expansion_queries: &[String],
    settings:          &FanoutSettings,
) -> Vec<Candidates> {
    let mut out = Vec::with_capacity(hypotheses.len());

    for hypothesis in hypotheses {
        let queries = queries_for(hypothesis, expansion_queries);
        let lists   = search_all(index, &queries, settings).await;
        let chunks  = dedup::union(&lists, settings.dedup_prefix_len);

        tracing::info!(
            "Hypothesis '{}': {} queries → {} unique chunks",
            hypothesis,
            queries.len(),
            chunks.len()
        );
        out.push(Candidates { hypothesis: hypothesis.clone(), chunks });
    }

    out
}

/// Run one search per query concurrently; slot `i` holds the result of `queries[i]`.
pub async fn search_all(
    index:    &dyn SimilarityIndex,
    queries:  &[String],
    settings: &FanoutSettings,
) -> Vec<Vec<Chunk>> {
    let mut slots: Vec<Vec<Chunk>> = vec![Vec::new(); queries.len()];

    let mut completed = stream::iter(queries.iter().enumerate())
        .map(move |(slot, query)| async move {
            let call = index.search(query, settings.k, settings.filter.as_ref());
            (slot, guarded(settings.call_timeout, call).await)
        })
        .buffer_unordered(settings.concurrency_limit.max(1));

    while let Some((slot, result)) = completed.next().await {
        slots[slot] = match result {
            Ok(chunks) => {
                tracing::debug!("Query '{}' returned {} chunks", queries[slot], chunks.len());
                chunks
            }
            Err(e) => empty_slot(&queries[slot], &e),
        };
    }

    slots
}

/// A failed or timed-out search contributes nothing to the union.
fn empty_slot(query: &str, err: &CollaboratorError) -> Vec<Chunk> {
    tracing::warn!("Search for '{}' failed: {}", query, err);
    Vec::new()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{chunk, ScriptedIndex};
    use crate::retrieval::index::KeywordIndexBuilder;

    fn settings() -> FanoutSettings {
        FanoutSettings {
            k:                 3,
            concurrency_limit: 4,
            dedup_prefix_len:  100,
            call_timeout:      Duration::from_secs(5),
            filter:            None,
        }
    }

    #[test]
    fn test_queries_for_puts_hypothesis_first() {
        let q = queries_for("h", &["e1".to_string(), "e2".to_string()]);
        assert_eq!(q, vec!["h", "e1", "e2"]);
    }

    #[tokio::test]
    async fn test_empty_pool_never_searches() {
        let out = retrieve(&KeywordIndexBuilder, &["h".to_string()], &[], &[], &settings())
            .await
            .unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_empty_hypotheses_never_searches() {
        let index = ScriptedIndex::new();
        let out   = fan_out(&index, &[], &["e".to_string()], &settings()).await;
        assert!(out.is_empty());
        assert_eq!(index.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slots_follow_issue_order_not_completion_order() {
        // The first query answers last; its results must still come first.
        let index = ScriptedIndex::new()
            .respond("h", vec![chunk("from hypothesis")], Duration::from_millis(300))
            .respond("e1", vec![chunk("from e1")], Duration::from_millis(100))
            .respond("e2", vec![chunk("from e2"), chunk("from hypothesis")], Duration::ZERO);

        let out = fan_out(&index, &["h".to_string()], &["e1".to_string(), "e2".to_string()], &settings()).await;

        let texts: Vec<&str> = out[0].chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["from hypothesis", "from e1", "from e2"]);
        assert_eq!(index.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_search_becomes_empty_slot() {
        let index = ScriptedIndex::new()
            .respond("h", vec![chunk("slow")], Duration::from_secs(60))
            .respond("e1", vec![chunk("fast")], Duration::ZERO);

        let lists = search_all(&index, &["h".to_string(), "e1".to_string()], &settings()).await;
        assert!(lists[0].is_empty());
        assert_eq!(lists[1][0].text, "fast");
    }

    #[tokio::test]
    async fn test_one_candidate_set_per_hypothesis() {
        let index = ScriptedIndex::new()
            .respond("h1", vec![chunk("a")], Duration::ZERO)
            .respond("h2", vec![chunk("b")], Duration::ZERO);

        let out = fan_out(&index, &["h1".to_string(), "h2".to_string()], &[], &settings()).await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].hypothesis, "h1");
        assert_eq!(out[1].chunks[0].text, "b");
    }
}
