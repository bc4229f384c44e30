// ============================================================
// Layer 4 — Text Preprocessor
// ============================================================
// Cleans raw text extracted from papers before quality checks
// and chunking.
//
// Text pulled out of a PDF usually contains:
//   - Typographic ligatures (ﬁ, ﬂ, ﬀ) instead of plain letters
//   - Words hyphenated across line breaks ("atten-\ntion")
//   - Non-breaking and zero-width spaces
//   - Carriage returns, tabs and stray control characters
//   - Runs of spaces and blank lines from the page layout
//
// Cleaning steps (applied in order):
//   1. Map ligatures and odd whitespace to plain characters
//   2. Re-join words hyphenated across a line break
//   3. Collapse spaces and trim each line
//   4. Allow at most one blank line between paragraphs
//
// Reference: Rust Book §8 (Strings in Rust)
//            Rust Book §13 (Iterators)

pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Clean raw extracted text. Takes a &str and returns an owned String.
    pub fn clean(&self, text: &str) -> String {
        // ── Step 1: Normalise individual characters ───────────────────────────
        let mut step1 = String::with_capacity(text.len());
        for c in text.chars() {
            match c {
                '\u{FB00}' => step1.push_str("ff"),
                '\u{FB01}' => step1.push_str("fi"),
                '\u{FB02}' => step1.push_str("fl"),
                '\u{FB03}' => step1.push_str("ffi"),
                '\u{FB04}' => step1.push_str("ffl"),
                '\t' | '\u{00A0}' | '\u{200B}' | '\u{FEFF}' => step1.push(' '),
                '\r' => step1.push('\n'),
                c if c.is_control() && c != '\n' => step1.push(' '),
                c => step1.push(c),
            }
        }

        // ── Step 2: Re-join hyphenated line breaks ────────────────────────────
        // "atten-\ntion" → "attention". Only a hyphen directly after a
        // letter and directly before a newline counts.
        let step2 = dehyphenate(&step1);

        // ── Step 3: Clean each line individually ─────────────────────────────
        let step3: Vec<String> = step2
            .lines()
            .map(|line| line.split(' ').filter(|w| !w.is_empty()).collect::<Vec<_>>().join(" "))
            .collect();

        // ── Step 4: Collapse excessive blank lines ────────────────────────────
        let mut out   = String::with_capacity(step2.len());
        let mut blank = 0usize;
        for line in &step3 {
            if line.is_empty() {
                blank += 1;
                if blank > 1 {
                    continue;
                }
            } else {
                blank = 0;
            }
            out.push_str(line);
            out.push('\n');
        }

        out.trim().to_string()
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

fn dehyphenate(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i   = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '-'
            && i > 0
            && chars[i - 1].is_alphabetic()
            && chars.get(i + 1) == Some(&'\n')
            && chars.get(i + 2).is_some_and(|n| n.is_lowercase())
        {
            // Skip the hyphen and the newline
            i += 2;
            continue;
        }
        out.push(c);
        i += 1;
    }
    out
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_multiple_spaces() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("key   value  cache"), "key value cache");
    }

    #[test]
    fn test_expands_ligatures() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("e\u{FB03}cient \u{FB01}ne-tuning"), "efficient fine-tuning");
    }

    #[test]
    fn test_rejoins_hyphenated_words() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("multi-head atten-\ntion layers"), "multi-head attention layers");
    }

    #[test]
    fn test_keeps_hyphen_before_capital() {
        let p = Preprocessor::new();
        // "KV-\nCache" is a compound, not a broken word
        assert_eq!(p.clean("KV-\nCache"), "KV-\nCache");
    }

    #[test]
    fn test_removes_control_chars() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("hello\x01world"), "hello world");
    }

    #[test]
    fn test_collapses_blank_lines() {
        let p      = Preprocessor::new();
        let output = p.clean("para one\n\n\n\n\npara two");
        assert_eq!(output, "para one\n\npara two");
    }

    #[test]
    fn test_empty_string() {
        let p = Preprocessor::new();
        assert_eq!(p.clean(""), "");
    }
}
