// ============================================================
// Layer 2 — Evidence Aggregator
// ============================================================
// Turns per-chunk judgments into per-hypothesis verdicts and
// renders the final answer from them.
//
// For every hypothesis the validated chunks are split into
//   confirmed    — judgment.confirmed
//   partial      — judgment.partial (and not confirmed)
//   unconfirmed  — neither
//
// Then:
//   ≥1 confirmed → avg_confidence over the confirmed chunks,
//                  plus the single best confirming excerpt;
//                  ranked by avg_confidence, highest first
//   else ≥1 partial → max_confidence over the partial chunks
//   else            → the hypothesis is left out
//
// Example:
//   h1 confirmed by [0.9, 0.7] → avg 0.80  (ranked 1st)
//   h2 confirmed by [0.6]      → avg 0.60  (ranked 2nd)
//   h3 partial     [0.4, 0.5]  → max 0.50

use serde::Serialize;

use crate::domain::evidence::{Evidence, ValidatedChunk};

/// Characters of the supporting excerpt shown in the answer
pub const EXCERPT_CHARS: usize = 300;

/// Line shown when no hypothesis found any support.
pub const NO_CONFIRMATION: &str = "No hypothesis was confirmed by the retrieved papers.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfirmedHypothesis {
    pub hypothesis: String,
    pub avg_confidence: f64,
    pub confirmed_chunks: usize,
    /// The highest-confidence confirming chunk
    pub best: ValidatedChunk,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartialHypothesis {
    pub hypothesis: String,
    pub max_confidence: f64,
}

/// The aggregated verdicts, ready to render.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Synthesis {
    pub confirmed: Vec<ConfirmedHypothesis>,
    pub partial: Vec<PartialHypothesis>,
}

impl Synthesis {
    /// True when no hypothesis was confirmed or partially supported.
    pub fn is_empty(&self) -> bool {
        self.confirmed.is_empty() && self.partial.is_empty()
    }

    /// Render the answer text. `gaps` discloses errors met along the way.
    pub fn render(&self, gaps: Option<&str>) -> String {
        let mut lines = vec!["Answer based on the retrieved papers:".to_string(), String::new()];

        if !self.confirmed.is_empty() {
            lines.push("Confirmed:".to_string());
            for (i, h) in self.confirmed.iter().enumerate() {
                let meta = &h.best.chunk.metadata;
                lines.push(format!("{}. {}", i + 1, h.hypothesis));
                lines.push(format!(
                    "   • Confidence: {:.2} ({} confirming chunk{})",
                    h.avg_confidence,
                    h.confirmed_chunks,
                    if h.confirmed_chunks == 1 { "" } else { "s" }
                ));
                lines.push(format!(
                    "   • Supported by \"{}\" ({}, p. {})",
                    h.best.chunk.excerpt(EXCERPT_CHARS),
                    meta.source_title,
                    meta.page_estimate
                ));
            }
        }

        if !self.partial.is_empty() {
            if !self.confirmed.is_empty() {
                lines.push(String::new());
            }
            lines.push("Possible, but only partially supported:".to_string());
            for h in &self.partial {
                lines.push(format!("• {} (confidence: {:.2})", h.hypothesis, h.max_confidence));
            }
        }

        if self.is_empty() {
            lines.push(NO_CONFIRMATION.to_string());
        }

        if let Some(gaps) = gaps {
            lines.push(String::new());
            lines.push(format!("Gaps: {gaps}"));
        }

        lines.join("\n")
    }
}

/// Aggregate every evidence record into ranked verdicts.
pub fn aggregate(evidence: &Evidence) -> Synthesis {
    let mut synthesis = Synthesis::default();

    for record in evidence.records() {
        let confirmed: Vec<&ValidatedChunk> = record
            .validated_chunks
            .iter()
            .filter(|vc| vc.judgment.is_confirmed())
            .collect();

        if !confirmed.is_empty() {
            let avg_confidence = confirmed.iter().map(|vc| vc.judgment.confidence()).sum::<f64>()
                / confirmed.len() as f64;

            // Highest confidence wins; the earliest chunk wins a tie
            let best = confirmed
                .iter()
                .copied()
                .reduce(|best, vc| {
                    if vc.judgment.confidence() > best.judgment.confidence() { vc } else { best }
                });

            if let Some(best) = best {
                synthesis.confirmed.push(ConfirmedHypothesis {
                    hypothesis:       record.hypothesis.clone(),
                    avg_confidence,
                    confirmed_chunks: confirmed.len(),
                    best:             best.clone(),
                });
            }
            continue;
        }

        let max_partial = record
            .validated_chunks
            .iter()
            .filter(|vc| vc.judgment.is_partial())
            .map(|vc| vc.judgment.confidence())
            .reduce(f64::max);

        if let Some(max_confidence) = max_partial {
            synthesis.partial.push(PartialHypothesis {
                hypothesis: record.hypothesis.clone(),
                max_confidence,
            });
        }
    }

    // Stable: equal averages keep hypothesis order
    synthesis
        .confirmed
        .sort_by(|a, b| b.avg_confidence.total_cmp(&a.avg_confidence));

    synthesis
}
