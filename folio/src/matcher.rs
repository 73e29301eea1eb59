//! Token-level Knuth-Morris-Pratt phrase matching.
//!
//! The automaton runs over token sequences, not characters: the haystack is a
//! page's words in reading order, the needle is the cleaned query tokens.
//! Haystack tokens are compared with [`MatchMode`]; the default substring mode
//! lets the needle token "aa" match the haystack token "aaa".

use crate::interface::MatchMode;

/// KMP prefix function: `lps[i]` is the length of the longest proper prefix of
/// `needle[..=i]` that is also its suffix. Needle tokens compare by equality.
pub fn prefix_function<S: AsRef<str>>(needle: &[S]) -> Vec<usize> {
    let m = needle.len();
    let mut lps = vec![0; m];
    let mut j = 0;

    for i in 1..m {
        while j > 0 && needle[i].as_ref() != needle[j].as_ref() {
            j = lps[j - 1];
        }
        if needle[i].as_ref() == needle[j].as_ref() {
            j += 1;
        }
        lps[i] = j;
    }

    lps
}

/// Multi-token phrase matcher.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhraseMatcher {
    mode: MatchMode,
}

impl PhraseMatcher {
    pub fn new(mode: MatchMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Every starting index in `haystack` where `needle` begins an occurrence,
    /// overlapping occurrences included. Runs in O(n + m) token comparisons.
    pub fn search<H, N>(&self, haystack: &[H], needle: &[N]) -> Vec<usize>
    where
        H: AsRef<str>,
        N: AsRef<str>,
    {
        let (n, m) = (haystack.len(), needle.len());
        if m == 0 || n < m {
            return Vec::new();
        }

        let lps = prefix_function(needle);
        let mut starts = Vec::new();
        let mut j = 0;

        for (i, element) in haystack.iter().enumerate() {
            let element = element.as_ref();
            while j > 0 && !self.mode.token_matches(needle[j].as_ref(), element) {
                j = lps[j - 1];
            }
            if self.mode.token_matches(needle[j].as_ref(), element) {
                j += 1;
                if j == m {
                    starts.push(i + 1 - m);
                    j = lps[j - 1];
                }
            }
        }

        starts
    }

    /// Every haystack index covered by an occurrence: each start expanded to
    /// `[start, start + m)`. Ascending, without duplicates where overlapping
    /// occurrences share tokens.
    pub fn matched_positions<H, N>(&self, haystack: &[H], needle: &[N]) -> Vec<usize>
    where
        H: AsRef<str>,
        N: AsRef<str>,
    {
        let m = needle.len();
        let mut positions = Vec::new();
        let mut covered = 0;
        for start in self.search(haystack, needle) {
            positions.extend(start.max(covered)..start + m);
            covered = start + m;
        }
        positions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn substring() -> PhraseMatcher {
        PhraseMatcher::new(MatchMode::Substring)
    }

    #[test]
    fn test_prefix_function() {
        assert_eq!(prefix_function(&["a", "b", "a", "b", "c"]), vec![0, 0, 1, 2, 0]);
        assert_eq!(prefix_function(&["a", "a", "a"]), vec![0, 1, 2]);
        assert!(prefix_function::<&str>(&[]).is_empty());
    }

    #[test]
    fn test_overlapping_occurrences() {
        assert_eq!(substring().search(&["a", "a", "a"], &["a", "a"]), vec![0, 1]);
        assert_eq!(substring().matched_positions(&["a", "a", "a"], &["a", "a"]), vec![0, 1, 2]);
    }

    #[test]
    fn test_substring_containment() {
        assert_eq!(substring().search(&["aaa", "bbb"], &["aa"]), vec![0]);
        assert_eq!(substring().search(&["мотив"], &["и"]), vec![0]);
        assert_eq!(
            substring().search(&["aaa", "aaa", "aaa", "aaa"], &["aa", "aa"]),
            vec![0, 1, 2]
        );
        assert_eq!(
            substring().matched_positions(&["aaa", "aaa", "aaa", "aaa"], &["aa", "aa"]),
            vec![0, 1, 2, 3]
        );
    }

    #[test]
    fn test_exact_mode_rejects_partial_tokens() {
        let exact = PhraseMatcher::new(MatchMode::Exact);
        assert!(exact.search(&["aaa", "bbb"], &["aa"]).is_empty());
        assert_eq!(exact.search(&["x", "br", "break", "br"], &["br"]), vec![1, 3]);
    }

    #[test]
    fn test_multi_token_with_fallback() {
        let haystack = ["a", "b", "a", "b", "a", "b", "c"];
        assert_eq!(substring().search(&haystack, &["a", "b", "a", "b", "c"]), vec![2]);
        assert_eq!(substring().matched_positions(&haystack, &["a", "b", "c"]), vec![4, 5, 6]);
        assert_eq!(
            substring().matched_positions(&["a", "a", "a", "a"], &["a", "a", "a"]),
            vec![0, 1, 2, 3]
        );
    }

    #[test]
    fn test_empty_and_short_inputs() {
        assert!(substring().search::<&str, &str>(&["a"], &[]).is_empty());
        assert!(substring().search(&["a"], &["a", "b"]).is_empty());
        assert!(substring().search::<&str, &str>(&[], &["a"]).is_empty());
    }

    #[test]
    fn test_phrase_split_across_words() {
        let haystack = ["ehehehe", "d", "привет"];
        assert_eq!(substring().matched_positions(&haystack, &["ehehehe", "d"]), vec![0, 1]);
        assert!(substring().search(&haystack, &["d", "ehehehe"]).is_empty());
    }
}
