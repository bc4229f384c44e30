// ============================================================
// Layer 2 — Ask Use Case
// ============================================================
// Wires the concrete collaborators into a pipeline and answers
// one question:
//
//   PaperSource   → LocalCorpus or arXiv
//   TextExtractor → DocumentExtractor over a DownloadCache
//   IndexBuilder  → KeywordIndexBuilder (fresh index per run)
//   LanguageModel → ChatCompletionsClient
//
// The run config is validated here, before any collaborator
// is built.

use anyhow::Result;
use std::{path::PathBuf, sync::Arc};

use crate::application::discover_use_case::paper_source;
use crate::application::pipeline::{Pipeline, RunReport};
use crate::application::stages::{Collaborators, StageContext};
use crate::data::extractor::DocumentExtractor;
use crate::domain::config::RunConfig;
use crate::domain::error::PipelineError;
use crate::infra::download_cache::DownloadCache;
use crate::infra::llm_client::{ChatCompletionsClient, LlmSettings};
use crate::retrieval::index::KeywordIndexBuilder;

/// Where a run gets its papers and models from.
#[derive(Debug, Clone)]
pub struct AskOptions {
    /// Local corpus directory; arXiv when None
    pub corpus_dir: Option<PathBuf>,
    pub cache_dir: PathBuf,
    pub llm: LlmSettings,
}

pub struct AskUseCase {
    pipeline: Pipeline,
}

impl AskUseCase {
    pub fn new(config: RunConfig, options: AskOptions) -> Result<Self> {
        config.validate()?;

        let papers    = paper_source(options.corpus_dir.as_deref(), config.fetch_timeout())?;
        let cache     = Arc::new(DownloadCache::new(options.cache_dir, config.fetch_timeout())?);
        let extractor = Arc::new(DocumentExtractor::new(cache, &config));

        // Every LLM call is bounded by call_timeout_secs
        let llm_settings = LlmSettings { timeout: config.call_timeout(), ..options.llm };
        let llm = Arc::new(ChatCompletionsClient::new(
            llm_settings,
            config.max_hypotheses,
            config.max_expansions,
        )?);

        let collaborators = Collaborators {
            papers,
            extractor,
            index: Arc::new(KeywordIndexBuilder),
            llm,
        };

        tracing::debug!("Run config: {:?}", config);
        let pipeline = Pipeline::new(StageContext { collaborators, config });
        Ok(Self { pipeline })
    }

    pub async fn answer(&self, question: &str) -> Result<RunReport, PipelineError> {
        self.pipeline.run_traced(question).await
    }
}
