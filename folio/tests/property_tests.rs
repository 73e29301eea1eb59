//! Property tests for the text and matching primitives.
//!
//! The matcher is checked against a naive oracle that tries every start
//! position; normalization and reading order are checked for the algebraic
//! properties search relies on.

use folio::interface::{MatchMode, Token};
use folio::matcher::PhraseMatcher;
use folio::normalize::{clean, tokenize};
use folio::reading_order::order;
use proptest::prelude::*;
use std::collections::BTreeSet;

// =============================================================================
// ORACLE
// =============================================================================

/// Every start where each needle token matches the aligned haystack token.
fn oracle_starts(haystack: &[String], needle: &[String], mode: MatchMode) -> Vec<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return Vec::new();
    }
    (0..=haystack.len() - needle.len())
        .filter(|&start| {
            needle
                .iter()
                .zip(&haystack[start..])
                .all(|(n, h)| mode.token_matches(n, h))
        })
        .collect()
}

fn word() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "ab", "ba", "aa", "б", "аб"]).prop_map(str::to_string)
}

fn mode() -> impl Strategy<Value = MatchMode> {
    prop_oneof![Just(MatchMode::Substring), Just(MatchMode::Exact)]
}

/// Tokens at distinct (y, x) positions, so the reading order is total.
fn positioned_tokens() -> impl Strategy<Value = Vec<Token>> {
    prop::collection::btree_set((0u16..40, 0u16..40), 0..30).prop_map(|cells: BTreeSet<(u16, u16)>| {
        cells
            .into_iter()
            .enumerate()
            .map(|(i, (y, x))| {
                let (x, y) = (x as f64 * 10.0, y as f64 * 10.0);
                Token::from_rect(format!("w{}", i), x, y, x + 8.0, y + 8.0)
            })
            .collect()
    })
}

// =============================================================================
// PROPERTIES
// =============================================================================

proptest! {
    #[test]
    fn clean_is_idempotent(s in any::<String>()) {
        let once = clean(&s);
        prop_assert_eq!(clean(&once), once);
    }

    #[test]
    fn clean_is_idempotent_on_mixed_script(s in "[a-zA-Zа-яА-ЯёЁ0-9 ,.!?\\-\t\n—]{0,60}") {
        let once = clean(&s);
        prop_assert_eq!(clean(&once), once.clone());
        prop_assert!(!once.contains("  "));
        prop_assert!(!once.starts_with(' ') && !once.ends_with(' '));
        prop_assert!(!once.contains('ё'));
    }

    #[test]
    fn tokens_are_non_empty_and_rejoin_to_clean(s in "[a-zA-Zа-яА-Я0-9 ,.]{0,60}") {
        let tokens = tokenize(&s);
        prop_assert!(tokens.iter().all(|t| !t.is_empty()));
        prop_assert_eq!(tokens.join(" "), clean(&s));
    }

    #[test]
    fn exact_matcher_agrees_with_oracle(
        haystack in prop::collection::vec(word(), 0..20),
        needle in prop::collection::vec(word(), 1..4),
    ) {
        let matcher = PhraseMatcher::new(MatchMode::Exact);
        prop_assert_eq!(
            matcher.search(&haystack, &needle),
            oracle_starts(&haystack, &needle, MatchMode::Exact)
        );
    }

    /// Containment is not transitive, so the equality-based failure function
    /// can skip an overlapping occurrence; every reported start is still real.
    #[test]
    fn reported_starts_are_occurrences(
        haystack in prop::collection::vec(word(), 0..20),
        needle in prop::collection::vec(word(), 1..4),
        mode in mode(),
    ) {
        let oracle = oracle_starts(&haystack, &needle, mode);
        for start in PhraseMatcher::new(mode).search(&haystack, &needle) {
            prop_assert!(oracle.contains(&start));
        }
    }

    #[test]
    fn matched_positions_cover_each_occurrence(
        haystack in prop::collection::vec(word(), 0..20),
        needle in prop::collection::vec(word(), 1..4),
    ) {
        let matcher = PhraseMatcher::new(MatchMode::Substring);
        let positions = matcher.matched_positions(&haystack, &needle);
        for start in matcher.search(&haystack, &needle) {
            for p in start..start + needle.len() {
                prop_assert!(positions.contains(&p));
            }
        }
        prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn reading_order_ignores_input_permutation(
        (tokens, shuffled) in positioned_tokens().prop_flat_map(|t| (Just(t.clone()), Just(t).prop_shuffle()))
    ) {
        let expected: Vec<&str> = order(&tokens).iter().map(|t| t.word.as_str()).collect();
        let actual: Vec<&str> = order(&shuffled).iter().map(|t| t.word.as_str()).collect();
        prop_assert_eq!(actual, expected);
    }
}
