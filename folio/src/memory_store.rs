//! In-process document store.
//!
//! Holds documents in memory behind a `RwLock` and evaluates the filter
//! dialect Folio emits. Used by the CLI, by tests, and for embedding a small
//! collection without an external database. The collection can be exported
//! to and imported from a JSON array file.

use crate::filters::StoreFilter;
use crate::interface::Document;
use crate::store::{DocumentStore, StoreError, StoreResult};
use parking_lot::RwLock;
use regex::{Regex, RegexBuilder};
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

#[derive(Debug)]
enum Condition {
    Eq(Value),
    Cmp(Ordering, bool, Value),
    In(Vec<Value>),
    Regex(Regex),
    Exists(bool),
}

/// A store filter with its operators parsed and regexes compiled once per query.
#[derive(Debug)]
struct CompiledFilter {
    fields: Vec<(String, Vec<Condition>)>,
}

impl CompiledFilter {
    fn compile(filter: &StoreFilter) -> StoreResult<Self> {
        let mut fields = Vec::new();
        for (path, predicate) in filter.iter() {
            fields.push((path.clone(), Self::conditions(path, predicate)?));
        }
        Ok(Self { fields })
    }

    fn conditions(path: &str, predicate: &Value) -> StoreResult<Vec<Condition>> {
        let ops = match predicate {
            Value::Object(map) if !map.is_empty() && map.keys().all(|k| k.starts_with('$')) => map,
            literal => return Ok(vec![Condition::Eq(literal.clone())]),
        };

        let mut conditions = Vec::with_capacity(ops.len());
        for (op, operand) in ops {
            let condition = match op.as_str() {
                "$gte" => Condition::Cmp(Ordering::Greater, true, operand.clone()),
                "$gt" => Condition::Cmp(Ordering::Greater, false, operand.clone()),
                "$lte" => Condition::Cmp(Ordering::Less, true, operand.clone()),
                "$lt" => Condition::Cmp(Ordering::Less, false, operand.clone()),
                "$in" => match operand {
                    Value::Array(values) => Condition::In(values.clone()),
                    _ => return Err(StoreError::Rejected(format!("{}: $in needs an array", path))),
                },
                "$exists" => match operand {
                    Value::Bool(b) => Condition::Exists(*b),
                    _ => return Err(StoreError::Rejected(format!("{}: $exists needs a boolean", path))),
                },
                "$regex" => {
                    let pattern = operand
                        .as_str()
                        .ok_or_else(|| StoreError::Rejected(format!("{}: $regex needs a string", path)))?;
                    let case_insensitive = ops
                        .get("$options")
                        .and_then(Value::as_str)
                        .is_some_and(|o| o.contains('i'));
                    let regex = RegexBuilder::new(pattern)
                        .case_insensitive(case_insensitive)
                        .build()
                        .map_err(|e| StoreError::Rejected(format!("{}: {}", path, e)))?;
                    Condition::Regex(regex)
                }
                "$options" => continue,
                other => return Err(StoreError::Rejected(format!("{}: unsupported operator {}", path, other))),
            };
            conditions.push(condition);
        }
        Ok(conditions)
    }

    fn matches(&self, view: &Value) -> bool {
        self.fields.iter().all(|(path, conditions)| {
            let field = lookup(view, path);
            conditions.iter().all(|c| Self::holds(c, field))
        })
    }

    fn holds(condition: &Condition, field: Option<&Value>) -> bool {
        match condition {
            Condition::Exists(expected) => field.is_some() == *expected,
            Condition::Eq(expected) => field.is_some_and(|f| scalar_or_any(f, |v| v == expected)),
            Condition::In(options) => field.is_some_and(|f| scalar_or_any(f, |v| options.contains(v))),
            Condition::Cmp(direction, inclusive, bound) => field.is_some_and(|f| {
                scalar_or_any(f, |v| match compare(v, bound) {
                    Some(Ordering::Equal) => *inclusive,
                    Some(ord) => ord == *direction,
                    None => false,
                })
            }),
            Condition::Regex(regex) => field.is_some_and(|f| {
                scalar_or_any(f, |v| v.as_str().is_some_and(|s| regex.is_match(s)))
            }),
        }
    }
}

/// Apply `pred` to a scalar, or to any element when the field holds an array.
fn scalar_or_any(value: &Value, pred: impl Fn(&Value) -> bool) -> bool {
    match value {
        Value::Array(items) => items.iter().any(&pred),
        scalar => pred(scalar),
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        _ => None,
    }
}

fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, key| current.as_object()?.get(key))
}

/// Filterable projection of a document. Pages are left out.
fn filter_view(doc: &Document) -> Value {
    json!({
        "_id": doc.id,
        "filename": doc.filename,
        "path": doc.path,
        "tags": doc.tags,
        "text": doc.text,
        "text_clear": doc.text_clear,
    })
}

/// Thread-safe in-memory document collection.
pub struct MemoryDocumentStore {
    documents: RwLock<Vec<Document>>,
    available: AtomicBool,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(Vec::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Build a store from already-prepared documents, minting missing ids.
    pub fn from_documents(documents: impl IntoIterator<Item = Document>) -> StoreResult<Self> {
        let store = Self::new();
        for doc in documents {
            store.insert(doc)?;
        }
        Ok(store)
    }

    /// Simulate losing the connection: every call fails with `Unavailable`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, AtomicOrdering::SeqCst);
    }

    fn ensure_available(&self) -> StoreResult<()> {
        if self.available.load(AtomicOrdering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("in-memory store is offline".into()))
        }
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    /// One line per document: ` * <id>: <filename> — <subject>`
    pub fn list_compact(&self) -> Vec<String> {
        self.documents
            .read()
            .iter()
            .map(|doc| {
                let subject = doc.tags.get("subject").map(String::as_str).unwrap_or("—");
                let filename = if doc.filename.is_empty() { "—" } else { doc.filename.as_str() };
                format!(" * {}: {} — {}", doc.id, filename, subject)
            })
            .collect()
    }

    /// Write the whole collection as a pretty-printed JSON array.
    pub fn export_json(&self, path: impl AsRef<Path>) -> StoreResult<usize> {
        let documents = self.documents.read();
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), &*documents)?;
        Ok(documents.len())
    }

    /// Insert every document of a JSON array file. Returns the number inserted.
    pub fn import_json(&self, path: impl AsRef<Path>) -> StoreResult<usize> {
        let data = std::fs::read_to_string(path)?;
        let documents: Vec<Document> = serde_json::from_str(&data)?;
        let count = documents.len();
        for doc in documents {
            self.insert(doc)?;
        }
        Ok(count)
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn insert(&self, mut document: Document) -> StoreResult<String> {
        self.ensure_available()?;
        let mut documents = self.documents.write();
        if document.id.is_empty() {
            document.id = uuid::Uuid::new_v4().simple().to_string();
        } else if documents.iter().any(|d| d.id == document.id) {
            return Err(StoreError::Rejected(format!("duplicate id {}", document.id)));
        }
        let id = document.id.clone();
        documents.push(document);
        Ok(id)
    }

    fn get(&self, id: &str) -> StoreResult<Option<Document>> {
        self.ensure_available()?;
        Ok(self.documents.read().iter().find(|d| d.id == id).cloned())
    }

    fn delete(&self, id: &str) -> StoreResult<bool> {
        self.ensure_available()?;
        let mut documents = self.documents.write();
        let before = documents.len();
        documents.retain(|d| d.id != id);
        Ok(documents.len() != before)
    }

    fn distinct(&self, field: &str) -> StoreResult<Vec<String>> {
        self.ensure_available()?;
        let mut values = BTreeSet::new();
        for doc in self.documents.read().iter() {
            let view = filter_view(doc);
            let Some(found) = lookup(&view, field) else { continue };
            let items = match found {
                Value::Array(items) => items.iter().collect::<Vec<_>>(),
                scalar => vec![scalar],
            };
            for item in items {
                match item {
                    Value::String(s) => {
                        values.insert(s.clone());
                    }
                    Value::Number(n) => {
                        values.insert(n.to_string());
                    }
                    _ => {}
                }
            }
        }
        Ok(values.into_iter().collect())
    }

    fn find(&self, filter: &StoreFilter) -> StoreResult<Vec<Document>> {
        self.ensure_available()?;
        let compiled = CompiledFilter::compile(filter)?;
        Ok(self
            .documents
            .read()
            .iter()
            .filter(|doc| compiled.matches(&filter_view(doc)))
            .cloned()
            .collect())
    }
}
