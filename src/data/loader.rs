// ============================================================
// Layer 4 — Local Corpus Loader
// ============================================================
// Offline paper discovery over a directory of JSON records,
// one PaperRef per *.json file:
//
//   corpus/
//     kv-quant.json   { "id": "2402.0001", "title": "...",
//                       "abstract": "...", "locator": "papers/kv-quant.pdf" }
//     ...
//
// Relative locators are resolved against the corpus directory,
// so a corpus can be moved around as a unit.
//
// Ranking: the same length-weighted keyword overlap the
// similarity index uses (domain::keywords), over title +
// abstract. Records with no overlap are left out; ties keep file-name order.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::error::{CollaboratorError, CollaboratorResult};
use crate::domain::keywords::{keyword_score, query_terms};
use crate::domain::paper::PaperRef;
use crate::domain::traits::PaperSource;

/// Loads paper records from a directory and ranks them against a query.
/// Implements the PaperSource trait from Layer 3.
pub struct LocalCorpus {
    /// Path to the directory containing *.json records
    dir: PathBuf,
}

impl LocalCorpus {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Every readable record in the corpus, in file-name order.
    pub fn load_all(&self) -> Result<Vec<PaperRef>> {
        // A missing directory is an empty corpus, not an error
        if !self.dir.exists() {
            tracing::warn!(
                "Corpus directory '{}' does not exist, returning empty corpus",
                self.dir.display()
            );
            return Ok(Vec::new());
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(&self.dir)
            .with_context(|| format!("Cannot read directory '{}'", self.dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("json"))
            .collect();
        paths.sort();

        let mut papers = Vec::new();
        for path in paths {
            match load_record(&path, &self.dir) {
                Ok(paper) => {
                    tracing::debug!("Loaded: {} ({})", paper.title, paper.id);
                    papers.push(paper);
                }
                // One bad record never takes the corpus down
                Err(e) => tracing::warn!("Skipping '{}': {:#}", path.display(), e),
            }
        }

        tracing::info!("Loaded {} paper records from '{}'", papers.len(), self.dir.display());
        Ok(papers)
    }

    /// The `max_results` records that best match `query`.
    pub fn search(&self, query: &str, max_results: usize) -> Result<Vec<PaperRef>> {
        let terms = query_terms(query);
        let mut scored: Vec<(f32, PaperRef)> = self
            .load_all()?
            .into_iter()
            .map(|paper| {
                let text  = format!("{} {}", paper.title, paper.abstract_text).to_lowercase();
                let score = keyword_score(&terms, &text);
                (score, paper)
            })
            .filter(|(score, _)| *score > 0.0)
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        Ok(scored.into_iter().take(max_results).map(|(_, paper)| paper).collect())
    }
}

#[async_trait]
impl PaperSource for LocalCorpus {
    async fn discover(&self, query: &str, max_results: usize) -> CollaboratorResult<Vec<PaperRef>> {
        self.search(query, max_results)
            .map_err(|e| CollaboratorError::source_unavailable(format!("{e:#}")))
    }
}

/// Parse one record, resolving a relative local locator against `root`.
fn load_record(path: &Path, root: &Path) -> Result<PaperRef> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;

    let mut paper: PaperRef = serde_json::from_str(&json)
        .with_context(|| format!("Invalid paper record in '{}'", path.display()))?;

    if !paper.is_remote() && Path::new(&paper.locator).is_relative() {
        paper.locator = root.join(&paper.locator).to_string_lossy().into_owned();
    }
    Ok(paper)
}
