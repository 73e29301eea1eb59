//! Document preparation before insertion into the store.
//!
//! Extraction produces raw text and positioned words; this module derives the
//! normalized fields search depends on and the tags encoded in lecture file
//! names.

use crate::interface::{Document, Page, Token};
use crate::normalize::{clean, tokens};
use crate::reports::Tags;
use chrono::{DateTime, Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

/// `<subject>-<number>-<YYYYMMDD>-<course>-<semester>-<teacher>[@<caption>].<ext>`
static FILENAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([^-.]+)-([\d._]*)-((?:\d{8})?)-(\d{1,2})-(\d)-([^@.]*)(?:@([^.]*))?\.(\w+)")
        .unwrap()
});

const DATE_FORMAT: &str = "%d.%m.%Y";

/// Compose decomposed `й` and `ё` (base letter + combining mark), as written by
/// some file systems, into their single code points.
pub fn compose_letters(s: &str) -> String {
    s.replace("и\u{306}", "й").replace("е\u{308}", "ё")
}

/// Tags encoded in a lecture file name. Empty when the name does not follow
/// the convention.
pub fn tags_from_filename(path: &Path) -> Tags {
    let Some(name) = path.file_name().map(|n| compose_letters(&n.to_string_lossy())) else {
        return Tags::new();
    };
    let Some(caps) = FILENAME_PATTERN.captures(&name) else {
        tracing::debug!(filename = %name, "file name does not carry tags");
        return Tags::new();
    };

    let group = |i: usize| caps.get(i).map(|m| m.as_str()).unwrap_or("");
    let date = match group(3) {
        "" => String::new(),
        raw => match NaiveDate::parse_from_str(raw, "%Y%m%d") {
            Ok(d) => d.format(DATE_FORMAT).to_string(),
            Err(_) => {
                tracing::warn!(filename = %name, raw, "invalid date in file name");
                String::new()
            }
        },
    };
    let filetype = match group(8) {
        "" => String::new(),
        ext => format!(".{}", ext),
    };

    [
        ("subject", group(1).to_string()),
        ("number", group(2).to_string()),
        ("date", date),
        ("course", group(4).to_string()),
        ("semester", group(5).to_string()),
        ("teacher", group(6).to_string()),
        ("doginfo", group(7).to_string()),
        ("filetype", filetype),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.replace('_', " ")))
    .collect()
}

/// Derive the search fields of a document.
///
/// Recomputes `text_clear`, cleans every token word (splitting words that
/// clean to several tokens, dropping those left empty), and fills a missing
/// `date` tag from the file's modification time.
pub fn prepare_document(mut doc: Document) -> Document {
    doc.text_clear = clean(&doc.text);

    let mut dropped = 0usize;
    for page in &mut doc.pages {
        let mut emptied = 0usize;
        // A word like "привет-мир" cleans to two tokens sharing one quadrilateral.
        *page = std::mem::take(page)
            .into_iter()
            .flat_map(|token| {
                let parts = tokens(&clean(&token.word));
                if parts.is_empty() {
                    emptied += 1;
                }
                parts
                    .into_iter()
                    .map(move |word| Token::new(word, token.corners.clone()))
                    .collect::<Vec<_>>()
            })
            .collect();
        dropped += emptied;
    }
    if dropped > 0 {
        tracing::debug!(filename = %doc.filename, dropped, "dropped tokens without searchable characters");
    }

    if doc.tags.get("date").map_or(true, |d| d.is_empty()) {
        match modification_date(Path::new(&doc.path)) {
            Some(date) => {
                doc.tags.insert("date".to_string(), date);
            }
            None => tracing::warn!(path = %doc.path, "no date tag and file time unavailable"),
        }
    }

    doc
}

fn modification_date(path: &Path) -> Option<String> {
    let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok()?;
    Some(DateTime::<Local>::from(modified).format(DATE_FORMAT).to_string())
}

/// Build a ready-to-insert document for an extracted file.
pub fn new_document(path: &Path, text: impl Into<String>, pages: Vec<Page>) -> Document {
    let resolved = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let path_str = compose_letters(&resolved.to_string_lossy());
    let filename = Path::new(&path_str)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    prepare_document(Document {
        id: String::new(),
        tags: tags_from_filename(Path::new(&path_str)),
        filename,
        path: path_str,
        text: text.into(),
        text_clear: String::new(),
        pages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::{MatchMode, Point};
    use crate::matcher::PhraseMatcher;

    #[test]
    fn test_tags_from_full_filename() {
        let tags = tags_from_filename(Path::new("/x/Психология_общения-4-20230927-3-1-Иванов_И@Вводная_лекция.pdf"));
        assert_eq!(tags["subject"], "Психология общения");
        assert_eq!(tags["number"], "4");
        assert_eq!(tags["date"], "27.09.2023");
        assert_eq!(tags["course"], "3");
        assert_eq!(tags["semester"], "1");
        assert_eq!(tags["teacher"], "Иванов И");
        assert_eq!(tags["doginfo"], "Вводная лекция");
        assert_eq!(tags["filetype"], ".pdf");
    }

    #[test]
    fn test_optional_parts_and_mismatch() {
        let tags = tags_from_filename(Path::new("Биология--20240312-2-2-.png"));
        assert_eq!(tags["subject"], "Биология");
        assert_eq!(tags["number"], "");
        assert_eq!(tags["teacher"], "");
        assert_eq!(tags["doginfo"], "");
        assert_eq!(tags["date"], "12.03.2024");

        assert!(tags_from_filename(Path::new("scan.pdf")).is_empty());
    }

    #[test]
    fn test_invalid_date_left_empty() {
        let tags = tags_from_filename(Path::new("Химия-1-20241399-1-1-Петров.pdf"));
        assert_eq!(tags["date"], "");
        assert_eq!(tags["course"], "1");
    }

    #[test]
    fn test_decomposed_letters_composed() {
        let decomposed = "Информатика-1--1-1-Зои\u{306}кин.pdf";
        let tags = tags_from_filename(Path::new(decomposed));
        assert_eq!(tags["teacher"], "Зойкин");
        assert_eq!(compose_letters("е\u{308}ж"), "ёж");
    }

    #[test]
    fn test_prepare_document_cleans_words_and_text() {
        let mut tags = Tags::new();
        tags.insert("date".into(), "01.01.2024".into());
        let doc = prepare_document(Document {
            text: "Привет, Мир!".into(),
            tags,
            pages: vec![vec![
                Token::from_rect("Привет,", 0.0, 0.0, 1.0, 1.0),
                Token::from_rect("—", 2.0, 0.0, 3.0, 1.0),
                Token::from_rect("Ёлка", 4.0, 0.0, 5.0, 1.0),
            ]],
            ..Document::default()
        });
        assert_eq!(doc.text_clear, "привет мир");
        let words: Vec<&str> = doc.pages[0].iter().map(|t| t.word.as_str()).collect();
        assert_eq!(words, vec!["привет", "елка"]);
        assert_eq!(doc.tags["date"], "01.01.2024");
    }

    #[test]
    fn test_hyphenated_word_splits_into_searchable_tokens() {
        let mut tags = Tags::new();
        tags.insert("date".into(), "01.01.2024".into());
        let doc = prepare_document(Document {
            text: "Привет-мир".into(),
            tags,
            pages: vec![vec![Token::from_rect("Привет-мир", 0.0, 0.0, 10.0, 2.0)]],
            ..Document::default()
        });

        let words: Vec<&str> = doc.pages[0].iter().map(|t| t.word.as_str()).collect();
        assert_eq!(words, vec!["привет", "мир"]);
        assert_eq!(doc.pages[0][1].corners[2], Point::new(10.0, 2.0));
        assert_eq!(
            PhraseMatcher::new(MatchMode::Exact).search(&words, &["привет", "мир"]),
            vec![0]
        );
    }

    #[test]
    fn test_missing_date_from_file_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.pdf");
        std::fs::write(&path, b"%PDF").unwrap();

        let doc = new_document(&path, "text", Vec::new());
        assert_eq!(doc.filename, "notes.pdf");
        let date = &doc.tags["date"];
        assert!(NaiveDate::parse_from_str(date, DATE_FORMAT).is_ok(), "got {}", date);
    }
}
