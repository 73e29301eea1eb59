//! Search Engine (coarse store pre-filter + token-level KMP localization)
//!
//! Phase 1 asks the document store for candidates: the caller's tag filters
//! plus a case-insensitive regex over `text_clear`. Phase 2 walks every page of
//! every candidate in reading order and runs the phrase matcher, collecting the
//! corner set of each matched token. Candidates are localized in parallel;
//! output order follows the store's candidate order, then page order.

use crate::filters::{StoreFilter, TagFilters};
use crate::interface::{Document, FolioError, FolioResult, MatchMode, SearchHit};
use crate::matcher::PhraseMatcher;
use crate::normalize::tokenize;
use crate::reading_order;
use crate::store::DocumentStore;
use rayon::prelude::*;
use std::time::Instant;

/// Field holding the normalized full text of a document.
pub const TEXT_CLEAR_FIELD: &str = "text_clear";

/// Characters that count as part of a word for the coarse boundary test.
const WORD_CLASS: &str = "a-zA-Zа-яё0-9_";

/// Regex requiring `tokens` as a contiguous whitespace-separated run of whole
/// words: `(?:^|[^w])tok1\s+tok2(?:$|[^w])`.
pub fn boundary_pattern<S: AsRef<str>>(tokens: &[S]) -> String {
    let run = tokens
        .iter()
        .map(|t| regex::escape(t.as_ref()))
        .collect::<Vec<_>>()
        .join(r"\s+");
    format!("(?:^|[^{w}]){run}(?:$|[^{w}])", w = WORD_CLASS, run = run)
}

/// Regex accepting any text in which consecutive words contain the tokens:
/// `tok1\S*\s+\S*tok2`. Over-inclusive with respect to substring matching.
pub fn containment_pattern<S: AsRef<str>>(tokens: &[S]) -> String {
    tokens
        .iter()
        .map(|t| regex::escape(t.as_ref()))
        .collect::<Vec<_>>()
        .join(r"\S*\s+\S*")
}

/// Coarse pre-filter regex for a needle under the given match mode.
///
/// Exact matching uses the whole-word boundary pattern. Substring matching
/// accepts in-word occurrences as the fine stage does, so the pre-filter never
/// drops a document the matcher would have found.
pub fn coarse_pattern<S: AsRef<str>>(tokens: &[S], mode: MatchMode) -> String {
    match mode {
        MatchMode::Exact => boundary_pattern(tokens),
        MatchMode::Substring => containment_pattern(tokens),
    }
}

/// Two-stage phrase search over a document store.
pub struct SearchEngine<S> {
    store: S,
    matcher: PhraseMatcher,
}

impl<S: DocumentStore> SearchEngine<S> {
    pub fn new(store: S) -> Self {
        Self::with_match_mode(store, MatchMode::default())
    }

    pub fn with_match_mode(store: S, mode: MatchMode) -> Self {
        Self {
            store,
            matcher: PhraseMatcher::new(mode),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn match_mode(&self) -> MatchMode {
        self.matcher.mode()
    }

    /// Find every (document, page) containing `phrase`, restricted by `filters`.
    pub fn search(&self, phrase: &str, filters: &TagFilters) -> FolioResult<Vec<SearchHit>> {
        self.search_with_filter(phrase, filters.flatten())
    }

    /// Like [`search`](Self::search) with an already flattened store filter.
    /// Entries are forwarded untouched; `text_clear` is overwritten.
    pub fn search_with_filter(&self, phrase: &str, mut filter: StoreFilter) -> FolioResult<Vec<SearchHit>> {
        let needle = tokenize(phrase);
        if needle.is_empty() {
            return Err(FolioError::InvalidQuery(format!(
                "'{}' has no searchable characters",
                phrase
            )));
        }

        let started = Instant::now();
        filter.insert_regex(TEXT_CLEAR_FIELD, &coarse_pattern(&needle, self.match_mode()));

        let candidates = self.store.find(&filter)?;
        #[cfg(feature = "perf-log")]
        let coarse_done = Instant::now();
        tracing::debug!(candidates = candidates.len(), "coarse stage");

        // Indexed par_iter: collect keeps the candidate order.
        let hits: Vec<SearchHit> = candidates
            .par_iter()
            .map(|doc| self.locate(doc, &needle))
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect();

        #[cfg(feature = "perf-log")]
        {
            let fine_done = Instant::now();
            tracing::info!(
                coarse_ms = (coarse_done - started).as_secs_f64() * 1000.0,
                fine_ms = (fine_done - coarse_done).as_secs_f64() * 1000.0,
                "[perf] search phases"
            );
        }

        tracing::info!(
            query = %phrase,
            candidates = candidates.len(),
            hits = hits.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "search finished"
        );
        Ok(hits)
    }

    /// Localize `needle` on every page of one document.
    pub fn locate(&self, doc: &Document, needle: &[String]) -> Vec<SearchHit> {
        doc.pages
            .iter()
            .enumerate()
            .filter_map(|(idx, page)| {
                let ordered = reading_order::order(page);
                let words: Vec<&str> = ordered.iter().map(|t| t.word.as_str()).collect();
                let positions = self.matcher.matched_positions(&words, needle);
                if positions.is_empty() {
                    return None;
                }
                Some(SearchHit {
                    doc_id: doc.id.clone(),
                    page: idx + 1,
                    coords: positions.iter().map(|&p| ordered[p].corners.clone()).collect(),
                    path: doc.path.clone(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::TagPredicate;
    use crate::interface::Token;
    use crate::memory_store::MemoryDocumentStore;
    use regex::RegexBuilder;
    use std::collections::BTreeMap;

    fn page(words: &[&str]) -> Vec<Token> {
        // Shuffled extraction order; geometry puts them left to right on one line.
        let mut tokens: Vec<Token> = words
            .iter()
            .enumerate()
            .map(|(i, w)| Token::from_rect(*w, i as f64 * 10.0, 0.0, i as f64 * 10.0 + 8.0, 5.0))
            .collect();
        tokens.reverse();
        tokens
    }

    fn doc(id: &str, course: &str, pages: Vec<Vec<Token>>) -> Document {
        let text_clear = pages
            .iter()
            .map(|p| {
                let mut words: Vec<_> = p.iter().collect();
                words.reverse();
                words.iter().map(|t| t.word.as_str()).collect::<Vec<_>>().join(" ")
            })
            .collect::<Vec<_>>()
            .join(" ");
        let mut tags = BTreeMap::new();
        tags.insert("course".to_string(), course.to_string());
        Document {
            id: id.into(),
            filename: format!("{}.pdf", id),
            path: format!("/lectures/{}.pdf", id),
            tags,
            text: text_clear.clone(),
            text_clear,
            pages,
        }
    }

    fn engine(mode: MatchMode) -> SearchEngine<MemoryDocumentStore> {
        let store = MemoryDocumentStore::from_documents(vec![
            doc("one", "3", vec![page(&["вводная", "лекция"]), page(&["сильно", "сильно", "сильно"])]),
            doc("two", "2", vec![page(&["лекция", "вводная"]), page(&["сильнее"])]),
        ])
        .unwrap();
        SearchEngine::with_match_mode(store, mode)
    }

    #[test]
    fn test_boundary_pattern_shape() {
        let pattern = boundary_pattern(&["привет", "мир"]);
        assert_eq!(pattern, r"(?:^|[^a-zA-Zа-яё0-9_])привет\s+мир(?:$|[^a-zA-Zа-яё0-9_])");

        let re = RegexBuilder::new(&pattern).case_insensitive(true).build().unwrap();
        assert!(re.is_match("ну привет  мир"));
        assert!(re.is_match("ПРИВЕТ МИР"));
        assert!(!re.is_match("приветмир"));
        assert!(!re.is_match("опривет мир"));
    }

    #[test]
    fn test_containment_pattern_is_superset_for_substrings() {
        let re = regex::Regex::new(&containment_pattern(&["a", "b"])).unwrap();
        assert!(re.is_match("xay by"));
        assert!(!re.is_match("xay cy by"));
    }

    #[test]
    fn test_rejects_empty_needle() {
        let err = engine(MatchMode::Substring).search("!!! ...", &TagFilters::new());
        assert!(matches!(err, Err(FolioError::InvalidQuery(_))));
    }

    #[test]
    fn test_phrase_order_matters() {
        let hits = engine(MatchMode::Exact).search("Вводная лекция", &TagFilters::new()).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc_id, "one");
        assert_eq!(hits[0].page, 1);
        assert_eq!(hits[0].coords.len(), 2);
    }

    #[test]
    fn test_substring_mode_finds_inflections() {
        let hits = engine(MatchMode::Substring).search("сильн", &TagFilters::new()).unwrap();
        let pages: Vec<(&str, usize, usize)> =
            hits.iter().map(|h| (h.doc_id.as_str(), h.page, h.coords.len())).collect();
        assert_eq!(pages, vec![("one", 2, 3), ("two", 2, 1)]);

        let exact = engine(MatchMode::Exact).search("сильн", &TagFilters::new()).unwrap();
        assert!(exact.is_empty());
    }

    #[test]
    fn test_tag_filters_restrict_candidates() {
        let filters = TagFilters::new().with("course", TagPredicate::Equals("2".into()));
        let hits = engine(MatchMode::Substring).search("сильн", &filters).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc_id, "two");
        assert_eq!(hits[0].path, "/lectures/two.pdf");
    }

    #[test]
    fn test_store_unavailable_propagates() {
        let engine = engine(MatchMode::Substring);
        engine.store().set_available(false);
        let err = engine.search("лекция", &TagFilters::new());
        assert!(matches!(err, Err(FolioError::StoreUnavailable(_))));
    }

    #[test]
    fn test_store_rejection_surfaces_as_store_error() {
        let filters = TagFilters::new().with("course", TagPredicate::MatchesPattern("(".into()));
        let err = engine(MatchMode::Substring).search("лекция", &filters);
        assert!(matches!(err, Err(FolioError::Store(_))));
    }
}
