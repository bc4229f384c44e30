// ============================================================
// Layer 3 — Evidence Domain Types
// ============================================================
// How strongly does a chunk support a hypothesis? The language
// model answers that per (hypothesis, chunk) pair with a
// Judgment, and the pipeline collects them here:
//
//   Judgment        — confirmed / partial / confidence / reason
//   ValidatedChunk  — a chunk together with its judgment
//   EvidenceRecord  — every validated chunk for one hypothesis
//   Evidence        — all records of a run, in hypothesis order
//   Candidates      — retrieval output, before judgment
//
// Example:
//   Hypothesis: "Grouped-query attention shrinks the KV cache"
//   Chunk:      "GQA reduces memory bandwidth by sharing keys..."
//   Judgment:   confirmed=true, confidence=0.9

use serde::{Deserialize, Serialize};

use crate::domain::chunk::Chunk;

/// Reason recorded when a judge response could not be parsed.
pub const PARSE_ERROR_REASON: &str = "parse error";

/// Three-way classification of a judgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Support {
    Confirmed,
    Partial,
    Unconfirmed,
}

/// The judge's verdict for one (hypothesis, chunk) pair.
///
/// `confirmed` and `partial` are never both true and
/// `confidence` always lies in [0, 1]; every constructor,
/// including deserialisation, normalises to that shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "JudgmentWire")]
pub struct Judgment {
    confirmed: bool,
    partial: bool,
    confidence: f64,
    reason: String,
}

/// Raw shape accepted from JSON before normalisation
#[derive(Deserialize)]
struct JudgmentWire {
    confirmed: bool,
    #[serde(default)]
    partial: bool,
    confidence: f64,
    #[serde(default)]
    reason: String,
}

impl From<JudgmentWire> for Judgment {
    fn from(w: JudgmentWire) -> Self {
        Judgment::new(w.confirmed, w.partial, w.confidence, w.reason)
    }
}

impl Judgment {
    /// Build a judgment. A confirmed judgment is never also partial,
    /// and NaN or out-of-range confidences are clamped into [0, 1].
    pub fn new(confirmed: bool, partial: bool, confidence: f64, reason: impl Into<String>) -> Self {
        let confidence = if confidence.is_nan() { 0.0 } else { confidence.clamp(0.0, 1.0) };
        Self {
            confirmed,
            partial: partial && !confirmed,
            confidence,
            reason: reason.into(),
        }
    }

    pub fn confirmed(confidence: f64, reason: impl Into<String>) -> Self {
        Self::new(true, false, confidence, reason)
    }

    pub fn partial(confidence: f64, reason: impl Into<String>) -> Self {
        Self::new(false, true, confidence, reason)
    }

    pub fn unconfirmed(confidence: f64, reason: impl Into<String>) -> Self {
        Self::new(false, false, confidence, reason)
    }

    /// The low-confidence judgment used when a judge response is malformed.
    pub fn parse_fallback() -> Self {
        Self::unconfirmed(0.1, PARSE_ERROR_REASON)
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    pub fn is_partial(&self) -> bool {
        self.partial
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn support(&self) -> Support {
        match (self.confirmed, self.partial) {
            (true, _)      => Support::Confirmed,
            (false, true)  => Support::Partial,
            (false, false) => Support::Unconfirmed,
        }
    }
}

/// A chunk paired with the judgment it received for one hypothesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedChunk {
    pub chunk: Chunk,
    pub judgment: Judgment,
}

/// All validated chunks gathered for one hypothesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    pub hypothesis: String,
    pub validated_chunks: Vec<ValidatedChunk>,
}

impl EvidenceRecord {
    pub fn new(hypothesis: impl Into<String>) -> Self {
        Self { hypothesis: hypothesis.into(), validated_chunks: Vec::new() }
    }

    pub fn confirmed_count(&self) -> usize {
        self.validated_chunks.iter().filter(|vc| vc.judgment.is_confirmed()).count()
    }
}

/// Mapping from hypothesis text to its evidence record.
///
/// Backed by a Vec so iteration follows hypothesis order; the
/// hypothesis text is the key (expansion queries never are).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Evidence {
    records: Vec<EvidenceRecord>,
}

impl Evidence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record for `record.hypothesis`.
    pub fn insert(&mut self, record: EvidenceRecord) {
        match self.records.iter_mut().find(|r| r.hypothesis == record.hypothesis) {
            Some(existing) => *existing = record,
            None           => self.records.push(record),
        }
    }

    pub fn get(&self, hypothesis: &str) -> Option<&EvidenceRecord> {
        self.records.iter().find(|r| r.hypothesis == hypothesis)
    }

    pub fn records(&self) -> &[EvidenceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Confirmed validated chunks across every hypothesis.
    pub fn confirmed_count(&self) -> usize {
        self.records.iter().map(EvidenceRecord::confirmed_count).sum()
    }
}

impl FromIterator<EvidenceRecord> for Evidence {
    fn from_iter<I: IntoIterator<Item = EvidenceRecord>>(iter: I) -> Self {
        let mut evidence = Evidence::new();
        for record in iter {
            evidence.insert(record);
        }
        evidence
    }
}

/// Deduplicated retrieval results for one hypothesis, not yet judged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidates {
    pub hypothesis: String,
    pub chunks: Vec<Chunk>,
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmed_is_never_partial() {
        let j = Judgment::new(true, true, 0.8, "both flags set");
        assert!(j.is_confirmed());
        assert!(!j.is_partial());
        assert_eq!(j.support(), Support::Confirmed);
    }

    #[test]
    fn test_confidence_is_clamped() {
        assert_eq!(Judgment::confirmed(1.7, "").confidence(), 1.0);
        assert_eq!(Judgment::partial(-0.2, "").confidence(), 0.0);
        assert_eq!(Judgment::unconfirmed(f64::NAN, "").confidence(), 0.0);
    }

    #[test]
    fn test_parse_fallback_shape() {
        let j = Judgment::parse_fallback();
        assert_eq!(j.support(), Support::Unconfirmed);
        assert!((j.confidence() - 0.1).abs() < 1e-12);
        assert_eq!(j.reason(), "parse error");
    }

    #[test]
    fn test_deserialise_normalises() {
        let j: Judgment = serde_json::from_str(
            r#"{"confirmed": true, "partial": true, "confidence": 3.0}"#,
        )
        .unwrap();
        assert!(!j.is_partial());
        assert_eq!(j.confidence(), 1.0);
        assert_eq!(j.reason(), "");
    }

    #[test]
    fn test_evidence_keeps_hypothesis_order_and_replaces() {
        let mut ev = Evidence::new();
        ev.insert(EvidenceRecord::new("h1"));
        ev.insert(EvidenceRecord::new("h2"));

        let mut replacement = EvidenceRecord::new("h1");
        replacement.validated_chunks.push(ValidatedChunk {
            chunk:    Chunk::from_source("text", "paper"),
            judgment: Judgment::confirmed(0.9, "ok"),
        });
        ev.insert(replacement);

        let order: Vec<&str> = ev.records().iter().map(|r| r.hypothesis.as_str()).collect();
        assert_eq!(order, vec!["h1", "h2"]);
        assert_eq!(ev.confirmed_count(), 1);
        assert_eq!(ev.get("h1").unwrap().validated_chunks.len(), 1);
    }
}
