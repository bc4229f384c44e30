// ============================================================
// Layer 3 — PaperRef Domain Type
// ============================================================
// A single paper returned by discovery. Plain data, immutable
// once created: later stages only read it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A reference to one discovered paper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperRef {
    /// Stable identifier (arXiv entry id, or file stem for a local corpus)
    pub id: String,

    pub title: String,

    /// The abstract as published by the source
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,

    /// Where the full document lives: an http(s) URL or a filesystem path
    pub locator: String,

    #[serde(default)]
    pub published: Option<DateTime<Utc>>,

    #[serde(default)]
    pub authors: Vec<String>,
}

impl PaperRef {
    /// Create a PaperRef with only the required fields set.
    pub fn new(
        id:      impl Into<String>,
        title:   impl Into<String>,
        locator: impl Into<String>,
    ) -> Self {
        Self {
            id:            id.into(),
            title:         title.into(),
            abstract_text: String::new(),
            locator:       locator.into(),
            published:     None,
            authors:       Vec::new(),
        }
    }

    pub fn with_abstract(mut self, text: impl Into<String>) -> Self {
        self.abstract_text = text.into();
        self
    }

    pub fn with_authors(mut self, authors: Vec<String>) -> Self {
        self.authors = authors;
        self
    }

    pub fn with_published(mut self, published: DateTime<Utc>) -> Self {
        self.published = Some(published);
        self
    }

    /// True when the locator points at a remote document.
    pub fn is_remote(&self) -> bool {
        self.locator.starts_with("http://") || self.locator.starts_with("https://")
    }
}

/// Merge `incoming` into `known`, skipping papers whose id is already present.
/// Order is preserved: known papers first, then new ones in discovery order.
pub fn merge_papers(known: &[PaperRef], incoming: Vec<PaperRef>) -> Vec<PaperRef> {
    let mut merged = known.to_vec();
    for paper in incoming {
        if !merged.iter().any(|p| p.id == paper.id) {
            merged.push(paper);
        }
    }
    merged
}
