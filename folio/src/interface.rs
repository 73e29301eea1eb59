//! Folio public interface
//!
//! Shared types that flow between the search engine, the document store
//! adapters and the report cache, plus the public error taxonomy.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// GEOMETRY
// ═══════════════════════════════════════════════════════════════════════════════

/// A 2-D point in page raster coordinates.
///
/// Serialized as an `[x, y]` pair, which is how the extractor writes corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl From<Point> for (f64, f64) {
    fn from(p: Point) -> Self {
        (p.x, p.y)
    }
}

/// Corner set of one token: top-left, top-right, bottom-right, bottom-left.
/// May hold fewer than four points when the extractor lost geometry.
pub type Corners = Vec<Point>;

/// A single recognized word with its bounding quadrilateral.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub word: String,
    #[serde(rename = "coords", default)]
    pub corners: Corners,
}

impl Token {
    pub fn new(word: impl Into<String>, corners: Corners) -> Self {
        Self { word: word.into(), corners }
    }

    /// Build a token from an axis-aligned rectangle, winding the corners
    /// top-left, top-right, bottom-right, bottom-left.
    pub fn from_rect(word: impl Into<String>, x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self::new(
            word,
            vec![
                Point::new(x0, y0),
                Point::new(x1, y0),
                Point::new(x1, y1),
                Point::new(x0, y1),
            ],
        )
    }
}

/// Tokens of one page, in extraction order (reading order is computed at query time).
pub type Page = Vec<Token>;

// ═══════════════════════════════════════════════════════════════════════════════
// DOCUMENTS & HITS
// ═══════════════════════════════════════════════════════════════════════════════

/// An indexed document as held by the document store.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "_id", default)]
    pub id: String,
    pub filename: String,
    pub path: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub text_clear: String,
    #[serde(default)]
    pub pages: Vec<Page>,
}

/// One (document, page) pair containing at least one phrase occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub doc_id: String,
    /// 1-based page number
    pub page: usize,
    /// One corner set per matched token position on this page. A token shared
    /// by overlapping occurrences appears once, so `coords.len()` can be less
    /// than occurrences times phrase length.
    pub coords: Vec<Corners>,
    pub path: String,
}

impl SearchHit {
    /// 0-based page index, as the renderer expects it.
    pub fn page_index(&self) -> usize {
        self.page.saturating_sub(1)
    }
}

/// How a needle token is compared against a haystack token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Needle token must be contained in the haystack token ("aa" matches "aaa").
    #[default]
    Substring,
    /// Needle token must equal the haystack token.
    Exact,
}

impl MatchMode {
    #[inline]
    pub fn token_matches(self, needle: &str, haystack: &str) -> bool {
        match self {
            MatchMode::Substring => haystack.contains(needle),
            MatchMode::Exact => haystack == needle,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Error type for Folio operations
#[derive(Debug, Error)]
pub enum FolioError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    #[error("Document store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Document store error: {0}")]
    Store(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Artifact missing: {}", .0.display())]
    ArtifactMissing(PathBuf),
    #[error("Artifact error: {0}")]
    Artifact(String),
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type FolioResult<T> = Result<T, FolioError>;

impl From<crate::database::DatabaseError> for FolioError {
    fn from(e: crate::database::DatabaseError) -> Self {
        FolioError::Database(e.to_string())
    }
}

impl From<crate::store::StoreError> for FolioError {
    fn from(e: crate::store::StoreError) -> Self {
        match e {
            crate::store::StoreError::Unavailable(msg) => FolioError::StoreUnavailable(msg),
            other => FolioError::Store(other.to_string()),
        }
    }
}

impl From<crate::artifact::ArtifactError> for FolioError {
    fn from(e: crate::artifact::ArtifactError) -> Self {
        match e {
            crate::artifact::ArtifactError::Missing(path) => FolioError::ArtifactMissing(path),
            other => FolioError::Artifact(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_json_uses_coords_pairs() {
        let token = Token::from_rect("слово", 1.0, 2.0, 3.0, 4.0);
        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(json["coords"][0], serde_json::json!([1.0, 2.0]));
        assert_eq!(json["coords"][2], serde_json::json!([3.0, 4.0]));

        let back: Token = serde_json::from_value(json).unwrap();
        assert_eq!(back, token);
    }

    #[test]
    fn test_token_without_coords_deserializes_empty() {
        let token: Token = serde_json::from_str(r#"{"word": "x"}"#).unwrap();
        assert!(token.corners.is_empty());
    }

    #[test]
    fn test_match_modes() {
        assert!(MatchMode::Substring.token_matches("br", "break"));
        assert!(!MatchMode::Exact.token_matches("br", "break"));
        assert!(MatchMode::Exact.token_matches("break", "break"));
    }

    #[test]
    fn test_store_unavailable_maps_to_public_variant() {
        let err: FolioError = crate::store::StoreError::Unavailable("down".into()).into();
        assert!(matches!(err, FolioError::StoreUnavailable(_)));
    }
}
