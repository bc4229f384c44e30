// ============================================================
// Layer 3 — Chunk Domain Type
// ============================================================
// A bounded span of extracted document text plus the metadata
// derived from it during extraction. Produced once by the
// extractor; read-only afterwards.

use serde::{Deserialize, Serialize};

/// Flags and hints derived from a chunk's text at extraction time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Title of the paper this chunk came from (for traceability)
    pub source_title: String,

    pub contains_method: bool,
    pub contains_results: bool,
    pub contains_experiment: bool,
    pub contains_figures: bool,

    /// Rough page number the chunk starts on (1-based)
    pub page_estimate: u32,
}

/// One fragment of document text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    pub fn new(text: impl Into<String>, metadata: ChunkMetadata) -> Self {
        Self { text: text.into(), metadata }
    }

    /// A chunk with default metadata and the given source title.
    pub fn from_source(text: impl Into<String>, source_title: impl Into<String>) -> Self {
        Self::new(
            text,
            ChunkMetadata { source_title: source_title.into(), ..Default::default() },
        )
    }

    /// The first `max_chars` characters of the text, with "..." appended
    /// when the text was cut. Used for excerpts in answers and reports.
    pub fn excerpt(&self, max_chars: usize) -> String {
        let mut chars = self.text.chars();
        let head: String = chars.by_ref().take(max_chars).collect();
        if chars.next().is_some() {
            format!("{head}...")
        } else {
            head
        }
    }
}

/// Optional restriction applied by the similarity index before ranking.
/// `None` fields are unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataFilter {
    #[serde(default)]
    pub contains_method: Option<bool>,
    #[serde(default)]
    pub contains_results: Option<bool>,
    #[serde(default)]
    pub contains_experiment: Option<bool>,
    #[serde(default)]
    pub contains_figures: Option<bool>,
}

impl MetadataFilter {
    pub fn matches(&self, meta: &ChunkMetadata) -> bool {
        let check = |want: Option<bool>, have: bool| want.map_or(true, |w| w == have);
        check(self.contains_method, meta.contains_method)
            && check(self.contains_results, meta.contains_results)
            && check(self.contains_experiment, meta.contains_experiment)
            && check(self.contains_figures, meta.contains_figures)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_marks_truncation() {
        let c = Chunk::from_source("abcdef", "paper");
        assert_eq!(c.excerpt(3), "abc...");
        assert_eq!(c.excerpt(6), "abcdef");
        assert_eq!(c.excerpt(100), "abcdef");
    }

    #[test]
    fn test_excerpt_counts_chars_not_bytes() {
        let c = Chunk::from_source("ééé", "paper");
        assert_eq!(c.excerpt(2), "éé...");
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let meta = ChunkMetadata { contains_results: true, ..Default::default() };
        assert!(MetadataFilter::default().matches(&meta));
    }

    #[test]
    fn test_filter_requires_flag() {
        let filter = MetadataFilter { contains_results: Some(true), ..Default::default() };
        let with    = ChunkMetadata { contains_results: true, ..Default::default() };
        let without = ChunkMetadata::default();
        assert!(filter.matches(&with));
        assert!(!filter.matches(&without));
    }
}
