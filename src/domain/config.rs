// ============================================================
// Layer 3 — Run Configuration
// ============================================================
// Every tunable of one pipeline run. Serialisable so it can be
// read from a JSON file (see infra::config_store) and printed
// back with `evidence-qa config`.
//
// The CLI layer converts its flags into overrides on top of this
// struct; the application layer never sees clap types.

use std::time::Duration;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::domain::chunk::MetadataFilter;

/// Upper bound on the default concurrency limit, so a large
/// machine does not flood the external index or the LLM API.
pub const MAX_DEFAULT_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Extra discovery passes allowed when evidence is thin
    pub max_retries: u32,
    /// Maximum stage invocations before the run is forcibly halted
    pub step_budget: u32,
    /// Concurrent external calls inside one stage
    pub concurrency_limit: usize,
    /// Results requested per similarity query
    pub k: usize,
    /// Characters of chunk text fingerprinted for deduplication
    pub dedup_prefix_len: usize,
    /// Timeout applied to every LLM and index call
    pub call_timeout_secs: u64,
    /// Timeout applied to document discovery and downloads
    pub fetch_timeout_secs: u64,
    pub max_papers: usize,
    pub max_hypotheses: usize,
    pub max_expansions: usize,
    /// Confirmed chunks needed across all hypotheses to skip a retry
    pub min_confirmed: usize,
    pub chunk_words: usize,
    pub chunk_overlap: usize,
    /// Extracted text beyond this many characters is discarded
    pub max_document_chars: usize,
    /// Discovery asks for max_papers * factor^retry_count on a retry pass
    pub retry_widen_factor: usize,
    pub metadata_filter: Option<MetadataFilter>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_retries:        1,
            step_budget:        10,
            concurrency_limit:  default_concurrency(),
            k:                  3,
            dedup_prefix_len:   100,
            call_timeout_secs:  30,
            fetch_timeout_secs: 15,
            max_papers:         3,
            max_hypotheses:     3,
            max_expansions:     5,
            min_confirmed:      2,
            chunk_words:        200,
            chunk_overlap:      40,
            max_document_chars: 10_000,
            retry_widen_factor: 2,
            metadata_filter:    None,
        }
    }
}

impl RunConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// How many papers discovery should request on the given pass.
    pub fn papers_for_pass(&self, retry_count: u32) -> usize {
        let factor = self.retry_widen_factor.max(1).saturating_pow(retry_count);
        self.max_papers.saturating_mul(factor)
    }

    /// Reject configurations that could never make progress.
    pub fn validate(&self) -> Result<()> {
        if self.step_budget == 0 {
            bail!("step_budget must be at least 1");
        }
        if self.k == 0 {
            bail!("k must be at least 1");
        }
        if self.concurrency_limit == 0 {
            bail!("concurrency_limit must be at least 1");
        }
        if self.dedup_prefix_len == 0 {
            bail!("dedup_prefix_len must be at least 1");
        }
        if self.chunk_overlap >= self.chunk_words {
            bail!(
                "chunk_overlap ({}) must be less than chunk_words ({})",
                self.chunk_overlap,
                self.chunk_words
            );
        }
        Ok(())
    }
}

/// Available cores, capped at MAX_DEFAULT_CONCURRENCY.
fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(MAX_DEFAULT_CONCURRENCY)
}
