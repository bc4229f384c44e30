// ============================================================
// Layer 5 — Retrieval
// ============================================================
// Finds the chunks worth judging for each hypothesis:
//
//   hypotheses × ([hypothesis] + expansion queries)
//       │
//       ▼
//   fanout   → one similarity search per query, run concurrently,
//              collected into order-indexed slots
//       │
//       ▼
//   dedup    → fold the ranked lists in query-issue order,
//              dropping chunks whose text prefix was already seen
//       │
//       ▼
//   Candidates per hypothesis
//
// index.rs provides the default in-memory similarity index. It is
// built fresh for every Retrieve stage and dropped afterwards.

/// Keyword-overlap similarity index (request-scoped)
pub mod index;

/// Prefix-fingerprint union of ranked result lists
pub mod dedup;

/// Concurrent per-query search fan-out and fan-in
pub mod fanout;
