// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to answer a
// research question from papers.
//
// Rules for this layer:
//   - No network, PDF or HTTP code here (that's Layer 4 and 6)
//   - No UI or printing here (that's Layer 1)
//   - Collaborators are reached only through Layer 3 traits
//   - Only workflow coordination and the policies around it
//
//   pipeline.rs   — the state machine (Discover … Synthesize)
//   stages.rs     — one function per stage
//   retry.rs      — retry-or-synthesize decision
//   fallback.rs   — what each failed call turns into
//   aggregator.rs — evidence → ranked verdicts → answer text
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

pub mod pipeline;

pub mod stages;

pub mod retry;

pub mod fallback;

pub mod aggregator;

// The question-answering workflow
pub mod ask_use_case;

// Paper discovery on its own
pub mod discover_use_case;

#[cfg(test)]
pub mod test_support;
