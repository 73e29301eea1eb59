//! Folio - spatial phrase search over scanned documents
//!
//! Documents are stored as pages of positioned words. A phrase query is
//! answered in two stages: a coarse regex pre-filter evaluated by the document
//! store, then token-level KMP matching over each candidate page in reading
//! order, which yields the exact quadrilaterals of every hit. Hits are turned
//! into annotated page artifacts held in a SQLite report cache that front-ends
//! page through per user.

pub mod artifact;
pub mod config;
pub mod database;
pub mod filters;
pub mod ingest;
pub mod interface;
pub mod matcher;
pub mod memory_store;
pub mod normalize;
pub mod pager;
pub mod reading_order;
pub mod reports;
pub mod search;
pub mod service;
pub mod store;

pub use interface::*;
pub use filters::{StoreFilter, TagFilters, TagPredicate};
pub use memory_store::MemoryDocumentStore;
pub use reports::{ReportPage, ReportStore, UserSession};
pub use search::SearchEngine;
pub use service::Folio;
pub use store::DocumentStore;
