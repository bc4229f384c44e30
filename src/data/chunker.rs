// ============================================================
// Layer 4 — Text Chunker
// ============================================================
// Splits a paper's cleaned text into overlapping windows and
// tags each window with the metadata the judge and the index
// can use (does it describe a method? report results?).
//
// Sliding window chunking with overlap:
//   - Split the text into chunks of `chunk_size` words
//   - Each chunk overlaps with the next by `overlap` words
//   - A claim that straddles a chunk boundary still appears
//     whole in at least one chunk
//
// Example with chunk_size=5, overlap=2:
//   Text:     "A B C D E F G H I J"
//   Chunk 1:  "A B C D E"          (positions 0-4)
//   Chunk 2:  "D E F G H"          (positions 3-7)
//   Chunk 3:  "G H I J"            (positions 6-9, last chunk)
//
// The stride (step between chunks) = chunk_size - overlap

use crate::domain::chunk::{Chunk, ChunkMetadata};

/// Rough size of one printed page of a paper, in characters
pub const CHARS_PER_PAGE: usize = 3_000;

const METHOD_TERMS: &[&str]     = &["method", "approach", "we propose", "algorithm", "architecture"];
const RESULT_TERMS: &[&str]     = &["result", "outperform", "accuracy", "improvement", "reduces"];
const EXPERIMENT_TERMS: &[&str] = &["experiment", "evaluate", "benchmark", "dataset", "ablation"];
const FIGURE_TERMS: &[&str]     = &["figure", "fig.", "table"];

/// One window of text and where it starts in the source document.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    pub text: String,
    /// Char offset of the window's first word in the source text
    pub offset: usize,
    pub word_count: usize,
}

pub struct Chunker {
    /// Target number of words per chunk
    chunk_size: usize,
    /// Number of words shared between adjacent chunks
    overlap: usize,
}

impl Chunker {
    /// # Panics
    /// Panics if overlap >= chunk_size, because the stride would
    /// be zero and the window would never advance.
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        assert!(
            overlap < chunk_size,
            "overlap ({}) must be less than chunk_size ({})",
            overlap,
            chunk_size
        );
        Self { chunk_size, overlap }
    }

    /// Split text into overlapping word-level windows.
    pub fn windows(&self, text: &str) -> Vec<Window> {
        let words = words_with_offsets(text);

        if words.is_empty() {
            return Vec::new();
        }

        let stride = self.chunk_size - self.overlap;
        let mut out   = Vec::new();
        let mut start = 0usize;

        loop {
            let end   = (start + self.chunk_size).min(words.len());
            let slice = &words[start..end];
            out.push(Window {
                text:       slice.iter().map(|(_, w)| *w).collect::<Vec<_>>().join(" "),
                offset:     slice[0].0,
                word_count: slice.len(),
            });

            if end == words.len() {
                break;
            }
            start += stride;
        }

        out
    }

    /// Split text into chunks tagged with metadata for `source_title`.
    pub fn chunk(&self, text: &str, source_title: &str) -> Vec<Chunk> {
        self.windows(text)
            .into_iter()
            .map(|w| {
                let metadata = tag_metadata(&w.text, source_title, w.offset);
                Chunk::new(w.text, metadata)
            })
            .collect()
    }
}

/// Whitespace-separated words, each with the char offset it starts at.
fn words_with_offsets(text: &str) -> Vec<(usize, &str)> {
    let mut words = Vec::new();
    // (byte index, char index) of the word being scanned
    let mut start: Option<(usize, usize)> = None;

    for (char_pos, (byte_pos, c)) in text.char_indices().enumerate() {
        if c.is_whitespace() {
            if let Some((b, ch)) = start.take() {
                words.push((ch, &text[b..byte_pos]));
            }
        } else if start.is_none() {
            start = Some((byte_pos, char_pos));
        }
    }
    if let Some((b, ch)) = start {
        words.push((ch, &text[b..]));
    }
    words
}

/// Derive chunk metadata from its text by keyword detection.
pub fn tag_metadata(text: &str, source_title: &str, offset: usize) -> ChunkMetadata {
    let lower = text.to_lowercase();
    let any   = |terms: &[&str]| terms.iter().any(|t| lower.contains(t));

    ChunkMetadata {
        source_title:        source_title.to_string(),
        contains_method:     any(METHOD_TERMS),
        contains_results:    any(RESULT_TERMS),
        contains_experiment: any(EXPERIMENT_TERMS),
        contains_figures:    any(FIGURE_TERMS),
        page_estimate:       (offset / CHARS_PER_PAGE) as u32 + 1,
    }
}
