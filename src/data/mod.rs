// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between a paper's locator and the chunks the
// pipeline searches:
//
//   *.json records
//       │
//       ▼
//   LocalCorpus        → offline paper discovery
//
//   PDF / text bytes
//       │
//       ▼
//   DocumentExtractor  → fetch, decode, orchestrate the steps below
//       │
//       ▼
//   Preprocessor       → cleans text (ligatures, hyphenation, whitespace)
//       │
//       ▼
//   quality            → rejects covers, boilerplate and stubs
//       │
//       ▼
//   Chunker            → overlapping windows tagged with metadata
//
// Each module is responsible for exactly one step.
// This makes each step independently testable and replaceable.
//
// Reference: Rust Book §13 (Iterators and Closures)

/// Offline paper discovery over a directory of JSON records
pub mod loader;

/// Fetches and converts one paper into chunks
pub mod extractor;

/// Cleans and normalises raw extracted text
pub mod preprocessor;

/// Rejects documents that are not usable papers
pub mod quality;

/// Splits long documents into overlapping chunks
pub mod chunker;
