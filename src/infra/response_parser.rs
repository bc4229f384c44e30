// ============================================================
// Layer 6 — LLM Response Parser
// ============================================================
// Language models do not follow output instructions reliably.
// A request for "one hypothesis per line" may come back as
//
//   Here are three hypotheses:
//   1. Quantizing the KV cache reduces memory.
//   2) **Paged attention** avoids fragmentation
//   - "Evicting stale tokens bounds cache growth"
//
// and a request for a JSON object may come back fenced in
// ```json … ``` or wrapped in chatter. This module turns either
// into clean values, or into JudgmentParse when nothing usable
// is there.

use crate::domain::error::{CollaboratorError, CollaboratorResult};
use crate::domain::evidence::Judgment;

/// Non-empty content lines with list markers removed, at most `max`.
pub fn parse_lines(text: &str, max: usize) -> Vec<String> {
    text.lines()
        .map(|line| strip_marker(line).replace("**", ""))
        .map(|line| line.trim_matches(|c: char| c == '"' || c.is_whitespace()).to_string())
        .filter(|line| !line.is_empty() && !line.ends_with(':') && !line.starts_with("```"))
        .take(max)
        .collect()
}

/// Remove a leading "1.", "2)", "-", "*" or "•" list marker.
fn strip_marker(line: &str) -> &str {
    let line = line.trim();

    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return rest.trim_start();
        }
    }

    for marker in ["- ", "* ", "• "] {
        if let Some(rest) = line.strip_prefix(marker) {
            return rest.trim_start();
        }
    }
    line
}

/// The first balanced `{ … }` object in `text`, ignoring braces inside strings.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth     = 0usize;
    let mut in_string = false;
    let mut escaped   = false;

    for (i, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\'         => escaped = true,
                '"'          => in_string = false,
                _            => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse a judge reply into a normalised Judgment.
pub fn parse_judgment(text: &str) -> CollaboratorResult<Judgment> {
    let json = extract_json_object(text)
        .ok_or_else(|| CollaboratorError::judgment_parse("no JSON object in reply"))?;

    serde_json::from_str::<Judgment>(json)
        .map_err(|e| CollaboratorError::judgment_parse(format!("{e}: {json}")))
}
