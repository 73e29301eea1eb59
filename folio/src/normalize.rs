//! Text cleaning shared by indexing and querying.
//!
//! The same rule runs over a document's `text` when it is stored and over the
//! user's phrase when it is searched, so both sides always agree on tokens.

/// Lower-case, fold `ё` to `е`, blank out everything that is not a Latin
/// letter, Cyrillic letter, ASCII digit or space, collapse whitespace, trim.
pub fn clean(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;

    for ch in text.chars().flat_map(char::to_lowercase) {
        let ch = if ch == 'ё' { 'е' } else { ch };
        if is_kept(ch) {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(ch);
        } else {
            pending_space = true;
        }
    }

    out
}

/// Split an already-cleaned string into its tokens.
pub fn tokens(cleaned: &str) -> Vec<String> {
    cleaned.split(' ').filter(|t| !t.is_empty()).map(str::to_string).collect()
}

/// Clean `text` and split it into tokens (the query "needle").
pub fn tokenize(text: &str) -> Vec<String> {
    tokens(&clean(text))
}

#[inline]
fn is_kept(ch: char) -> bool {
    ch.is_ascii_lowercase() || ch.is_ascii_digit() || ('а'..='я').contains(&ch)
}
