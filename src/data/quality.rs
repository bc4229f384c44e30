// ============================================================
// Layer 4 — Document Quality Filter
// ============================================================
// Not every downloaded PDF is a paper. Some are a cover page
// with a copyright notice, some are a funding statement, some
// are so short that nothing useful survives extraction.
//
// A document is rejected when ANY of these hold:
//   - IEEE notice near the top together with a grant statement
//   - "Personal use of this material is permitted" boilerplate
//   - "This research was supported by" boilerplate
//   - a © notice near the top plus "All rights reserved"
//   - fewer than MIN_DOCUMENT_CHARS characters of text
//   - no "Abstract" within the first ABSTRACT_WINDOW characters
//   - none of the scientific keywords appear anywhere
//
// Checks run on whitespace-collapsed text so layout noise does
// not decide the outcome.

use std::fmt;

pub const MIN_DOCUMENT_CHARS: usize = 1_000;
pub const ABSTRACT_WINDOW: usize    = 500;

const SCIENTIFIC_KEYWORDS: &[&str] = &[
    "method", "model", "experiment", "attention", "layer", "network", "dataset", "result",
];

/// Why a document was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Boilerplate,
    TooShort,
    NoAbstract,
    NotScientific,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Rejection::Boilerplate   => "only publisher or funding boilerplate",
            Rejection::TooShort      => "too short",
            Rejection::NoAbstract    => "no abstract near the start",
            Rejection::NotScientific => "no scientific content",
        };
        f.write_str(msg)
    }
}

/// Accept or reject a document's extracted text.
pub fn check(text: &str) -> Result<(), Rejection> {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");

    let boilerplate = (prefix(&flat, 500).contains("IEEE") && prefix(&flat, 800).contains("grant"))
        || flat.contains("Personal use of this material is permitted")
        || flat.contains("This research was supported by")
        || (prefix(&flat, 200).contains('©') && flat.contains("All rights reserved"));
    if boilerplate {
        return Err(Rejection::Boilerplate);
    }

    if flat.chars().count() < MIN_DOCUMENT_CHARS {
        return Err(Rejection::TooShort);
    }

    if !prefix(&flat, ABSTRACT_WINDOW).contains("Abstract") {
        return Err(Rejection::NoAbstract);
    }

    let lower = flat.to_lowercase();
    if !SCIENTIFIC_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        return Err(Rejection::NotScientific);
    }

    Ok(())
}

/// The first `n` characters of `s`, cut on a char boundary.
fn prefix(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None           => s,
    }
}
