// ============================================================
// Layer 5 — Dedup Union
// ============================================================
// Several queries for the same hypothesis often return the same
// chunk, or two chunks that only differ far into the text
// (overlapping windows of the same paragraph). The union keeps
// one copy of each, in the order it was first seen.
//
// "Seen" is decided by a fingerprint: the blake3 hash of the
// first `prefix_len` characters of the chunk text. Two chunks
// sharing that prefix count as the same chunk even if they
// differ afterwards. This is an accepted approximation; tune
// `dedup_prefix_len` per deployment to trade recall for noise.

use std::collections::HashSet;

use crate::domain::chunk::Chunk;

/// Content fingerprint over a fixed-length text prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn of(text: &str, prefix_len: usize) -> Self {
        let end = text
            .char_indices()
            .nth(prefix_len)
            .map_or(text.len(), |(idx, _)| idx);
        Self(*blake3::hash(text[..end].as_bytes()).as_bytes())
    }
}

/// Merge ranked lists into one, first-seen order, no repeated fingerprints.
/// Lists are folded in the order given; callers pass them in query-issue order.
pub fn union(lists: &[Vec<Chunk>], prefix_len: usize) -> Vec<Chunk> {
    let mut seen = HashSet::new();
    let mut out  = Vec::new();

    for chunk in lists.iter().flatten() {
        if seen.insert(Fingerprint::of(&chunk.text, prefix_len)) {
            out.push(chunk.clone());
        }
    }

    out
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn c(text: &str) -> Chunk {
        Chunk::from_source(text, "paper")
    }

    fn texts(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn test_shared_chunk_appears_once_in_first_seen_order() {
        let a = c("AAAAAAAAAA first");
        let b = c("BBBBBBBBBB second");
        let cc = c("CCCCCCCCCC third");

        let merged = union(&[vec![a, b.clone()], vec![b, cc]], 10);
        assert_eq!(texts(&merged), vec!["AAAAAAAAAA first", "BBBBBBBBBB second", "CCCCCCCCCC third"]);
    }

    #[test]
    fn test_prefix_collision_counts_as_duplicate() {
        let merged = union(&[vec![c("same prefix, tail one"), c("same prefix, tail two")]], 11);
        assert_eq!(texts(&merged), vec!["same prefix, tail one"]);
    }

    #[test]
    fn test_longer_prefix_separates_them() {
        let merged = union(&[vec![c("same prefix, tail one"), c("same prefix, tail two")]], 200);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_empty_input() {
        assert!(union(&[], 100).is_empty());
        assert!(union(&[vec![], vec![]], 100).is_empty());
    }

    #[test]
    fn test_fingerprint_handles_multibyte_text() {
        assert_eq!(Fingerprint::of("ééé-x", 3), Fingerprint::of("ééé-y", 3));
        assert_ne!(Fingerprint::of("ééé-x", 5), Fingerprint::of("ééé-y", 5));
    }

    fn arb_lists() -> impl Strategy<Value = Vec<Vec<Chunk>>> {
        let text = prop::sample::select(vec!["alpha", "alphabet", "beta", "gamma", "delta", "alp"]);
        prop::collection::vec(prop::collection::vec(text.prop_map(c), 0..5), 0..5)
    }

    proptest! {
        #[test]
        fn prop_union_is_idempotent(lists in arb_lists(), prefix in 1usize..8) {
            let once  = union(&lists, prefix);
            let twice = union(&[once.clone()], prefix);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_union_has_no_repeated_fingerprints(lists in arb_lists(), prefix in 1usize..8) {
            let merged = union(&lists, prefix);
            let prints: HashSet<Fingerprint> =
                merged.iter().map(|c| Fingerprint::of(&c.text, prefix)).collect();
            prop_assert_eq!(prints.len(), merged.len());
        }
    }
}
