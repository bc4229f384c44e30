// ============================================================
// Layer 3 — Keyword Scoring
// ============================================================
// Length-weighted keyword overlap, shared by the local corpus
// ranking and the in-memory similarity index:
//   - query terms are words longer than 3 chars, or numbers
//     (so "4" in "4-bit quantization" survives)
//   - a term counts when it appears as a WHOLE word in the text
//     ("rope" must not match inside "europe")
//   - each matching term adds its length; longer terms are more
//     specific and therefore worth more
//   - the sum is normalised by the total query weight

/// Extract the weighted terms of a query.
pub fn query_terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for word in query.split_whitespace() {
        let w = word
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        let keep = w.chars().count() > 3 || (!w.is_empty() && w.chars().all(|c| c.is_ascii_digit()));
        if keep && !terms.contains(&w) {
            terms.push(w);
        }
    }
    terms
}

/// Score already-lowercased `text` against `terms`, in [0, 1).
pub fn keyword_score(terms: &[String], text_lower: &str) -> f32 {
    if terms.is_empty() {
        return 0.0;
    }
    let total_weight: f32 = terms.iter().map(|t| t.len() as f32).sum::<f32>() + 1.0;
    terms
        .iter()
        .filter(|t| contains_word(text_lower, t))
        .map(|t| t.len() as f32)
        .sum::<f32>()
        / total_weight
}

/// Whole-word substring test.
/// Returns `true` only when `word` appears in `text` surrounded by
/// non-alphanumeric characters (or at string boundaries).
pub fn contains_word(text: &str, word: &str) -> bool {
    let tb = text.as_bytes();
    let wb = word.as_bytes();
    let wl = wb.len();
    if wl == 0 || wl > tb.len() {
        return false;
    }
    for i in 0..=(tb.len() - wl) {
        if &tb[i..i + wl] == wb {
            let before_ok = i == 0 || !tb[i - 1].is_ascii_alphanumeric();
            let after_ok  = i + wl == tb.len() || !tb[i + wl].is_ascii_alphanumeric();
            if before_ok && after_ok {
                return true;
            }
        }
    }
    false
}
