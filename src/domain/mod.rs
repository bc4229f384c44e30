// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs, enums and traits that define what a run
// of the evidence pipeline IS:
//
//   paper.rs    — PaperRef, one discovered paper
//   chunk.rs    — Chunk + ChunkMetadata, one extracted fragment
//   evidence.rs — Judgment, ValidatedChunk, EvidenceRecord
//   state.rs    — RunState and the StateUpdate merge contract
//   config.rs   — RunConfig, every tunable of a run
//   error.rs    — the error taxonomy (thiserror) and call timeouts
//   keywords.rs — keyword-overlap scoring shared by ranking code
//   traits.rs   — the external collaborators the core calls
//
// Rules for this layer:
//   - NO network or file I/O
//   - NO tokio beyond trait signatures and call deadlines
//   - Only plain data and abstractions
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

pub mod paper;

pub mod chunk;

pub mod evidence;

pub mod state;

pub mod config;

pub mod error;

pub mod keywords;

// Core abstractions (traits) that the data and infra layers implement
pub mod traits;
