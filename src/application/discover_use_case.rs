// ============================================================
// Layer 2 — Discover Use Case
// ============================================================
// Chooses where papers come from and runs discovery alone:
//
//   --corpus-dir given → LocalCorpus (offline, JSON records)
//   otherwise          → arXiv
//
// The ask use case uses the same choice for its Discover stage.

use anyhow::{Context, Result};
use std::{path::Path, sync::Arc, time::Duration};

use crate::application::fallback;
use crate::data::loader::LocalCorpus;
use crate::domain::paper::PaperRef;
use crate::domain::traits::PaperSource;
use crate::infra::arxiv::ArxivClient;

/// The paper source for a run: a local corpus when given, arXiv otherwise.
pub fn paper_source(corpus_dir: Option<&Path>, timeout: Duration) -> Result<Arc<dyn PaperSource>> {
    match corpus_dir {
        Some(dir) => {
            tracing::info!("Discovering papers in local corpus '{}'", dir.display());
            Ok(Arc::new(LocalCorpus::new(dir)))
        }
        None => {
            tracing::info!("Discovering papers on arXiv");
            Ok(Arc::new(ArxivClient::new(timeout)?))
        }
    }
}

pub struct DiscoverUseCase {
    source: Arc<dyn PaperSource>,
    timeout: Duration,
}

impl DiscoverUseCase {
    pub fn new(corpus_dir: Option<&Path>, timeout: Duration) -> Result<Self> {
        Ok(Self { source: paper_source(corpus_dir, timeout)?, timeout })
    }

    pub fn with_source(source: Arc<dyn PaperSource>, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    pub async fn discover(&self, query: &str, max_results: usize) -> Result<Vec<PaperRef>> {
        let papers = fallback::guarded(self.timeout, self.source.discover(query, max_results))
            .await
            .with_context(|| format!("Discovery for '{query}' failed"))?;
        tracing::info!("Found {} papers", papers.len());
        Ok(papers)
    }
}
