//! Tag filters and the store filter they flatten into.
//!
//! Callers describe tag constraints with [`TagPredicate`]. The search engine
//! flattens them into a [`StoreFilter`], a field-path → predicate mapping in
//! the document store's query dialect. The filter is opaque from that point
//! on: this crate never interprets it, the store adapter does.

use crate::interface::{FolioError, FolioResult};
use chrono::NaiveDate;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

const TAGS_PREFIX: &str = "tags.";

/// Constraint on a single tag.
#[derive(Debug, Clone, PartialEq)]
pub enum TagPredicate {
    Equals(String),
    /// Inclusive bounds; a missing side is unbounded.
    Range { min: Option<String>, max: Option<String> },
    OneOf(Vec<String>),
    MatchesPattern(String),
    Exists(bool),
}

impl TagPredicate {
    /// Parse a `DD.MM.YYYY-DD.MM.YYYY` date range as typed by a user.
    pub fn date_range(input: &str) -> FolioResult<Self> {
        let (from, to) = input
            .split_once('-')
            .ok_or_else(|| FolioError::InvalidFilter(format!("expected DD.MM.YYYY-DD.MM.YYYY, got '{}'", input)))?;
        let from = parse_date(from.trim())?;
        let to = parse_date(to.trim())?;
        Ok(TagPredicate::Range {
            min: Some(from.format("%d.%m.%Y").to_string()),
            max: Some(to.format("%d.%m.%Y").to_string()),
        })
    }

    fn to_value(&self) -> Value {
        match self {
            TagPredicate::Equals(v) => Value::String(v.clone()),
            TagPredicate::Range { min, max } => {
                let mut bounds = Map::new();
                if let Some(min) = min {
                    bounds.insert("$gte".into(), Value::String(min.clone()));
                }
                if let Some(max) = max {
                    bounds.insert("$lte".into(), Value::String(max.clone()));
                }
                Value::Object(bounds)
            }
            TagPredicate::OneOf(values) => json!({ "$in": values }),
            TagPredicate::MatchesPattern(pattern) => json!({ "$regex": pattern }),
            TagPredicate::Exists(exists) => json!({ "$exists": exists }),
        }
    }
}

fn parse_date(s: &str) -> FolioResult<NaiveDate> {
    NaiveDate::parse_from_str(s, "%d.%m.%Y")
        .map_err(|e| FolioError::InvalidFilter(format!("bad date '{}': {}", s, e)))
}

/// Tag constraints keyed by tag name (`course`) or dotted path (`tags.course`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagFilters {
    entries: BTreeMap<String, TagPredicate>,
}

impl TagFilters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Equality constraints from a user's stored session filters.
    pub fn from_session(filters: &BTreeMap<String, String>) -> Self {
        let entries = filters
            .iter()
            .map(|(k, v)| (k.clone(), TagPredicate::Equals(v.clone())))
            .collect();
        Self { entries }
    }

    pub fn with(mut self, tag: impl Into<String>, predicate: TagPredicate) -> Self {
        self.insert(tag, predicate);
        self
    }

    pub fn insert(&mut self, tag: impl Into<String>, predicate: TagPredicate) {
        self.entries.insert(tag.into(), predicate);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Flatten into a store filter: `{tag: v}` becomes `{"tags.<tag>": v}`;
    /// keys already under `tags.` are kept as they are.
    pub fn flatten(&self) -> StoreFilter {
        let mut filter = StoreFilter::new();
        for (tag, predicate) in &self.entries {
            let path = if tag.starts_with(TAGS_PREFIX) {
                tag.clone()
            } else {
                format!("{}{}", TAGS_PREFIX, tag)
            };
            filter.insert(path, predicate.to_value());
        }
        filter
    }
}

/// Field path → predicate mapping handed to [`crate::store::DocumentStore::find`].
///
/// Values are either literals (equality) or operator objects (`$gte`, `$lte`,
/// `$gt`, `$lt`, `$in`, `$regex` with optional `$options`, `$exists`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreFilter {
    fields: Map<String, Value>,
}

impl StoreFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, predicate: Value) {
        self.fields.insert(path.into(), predicate);
    }

    /// Case-insensitive regular-expression constraint on a field.
    pub fn insert_regex(&mut self, path: impl Into<String>, pattern: &str) {
        self.insert(path, json!({ "$regex": pattern, "$options": "i" }));
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        self.fields.get(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

impl From<Map<String, Value>> for StoreFilter {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}
