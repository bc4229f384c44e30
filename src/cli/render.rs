// ============================================================
// Layer 1 — Text Rendering
// ============================================================
// Plain-text views of a finished run for the terminal:
//
//   evidence_trail — every judged chunk, per hypothesis
//   trace          — the stages a run went through
//   papers         — a discovery result list

use crate::application::pipeline::StageTrace;
use crate::domain::evidence::Support;
use crate::domain::paper::PaperRef;
use crate::domain::state::RunState;

/// Characters of each chunk shown in the evidence trail
const FRAGMENT_CHARS: usize = 300;

pub fn evidence_trail(state: &RunState) -> String {
    if state.evidence.is_empty() {
        return "No evidence was gathered.".to_string();
    }

    let mut lines = Vec::new();
    for record in state.evidence.records() {
        lines.push(format!("Hypothesis: {}", record.hypothesis));
        if record.validated_chunks.is_empty() {
            lines.push("  (no candidate chunks)".to_string());
        }
        for vc in &record.validated_chunks {
            let status = match vc.judgment.support() {
                Support::Confirmed   => "CONFIRMED",
                Support::Partial     => "PARTIAL",
                Support::Unconfirmed => "UNCONFIRMED",
            };
            lines.push(format!(
                "  [{status}] {:.2}  {}",
                vc.judgment.confidence(),
                vc.judgment.reason()
            ));
            lines.push(format!(
                "      \"{}\" ({}, p. {})",
                vc.chunk.excerpt(FRAGMENT_CHARS),
                vc.chunk.metadata.source_title,
                vc.chunk.metadata.page_estimate
            ));
        }
    }
    lines.join("\n")
}

pub fn trace(trace: &[StageTrace]) -> String {
    trace
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let mut line = format!("{:>2}. {:<10} {:>6} ms", i + 1, t.step.to_string(), t.elapsed_ms);
            if let Some(fault) = &t.fault {
                line.push_str(&format!("  fault: {fault}"));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn papers(papers: &[PaperRef]) -> String {
    if papers.is_empty() {
        return "No papers found.".to_string();
    }
    papers
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let date = p
                .published
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "undated".to_string());
            format!("{}. {} ({})\n   {}", i + 1, p.title, date, p.locator)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
