//! User-facing flow: submit a query, pick filters, build a report, page through it.
//!
//! A front-end (chat bot, web handler, CLI) drives [`Folio`] with a user id;
//! everything it needs between calls lives in the report store's session table.

use crate::artifact::{Annotator, PageRenderer};
use crate::config::FolioConfig;
use crate::database::ReportDatabase;
use crate::filters::TagFilters;
use crate::interface::{FolioError, FolioResult, SearchHit};
use crate::pager::{PageView, ReportPager};
use crate::reports::{PopulateSummary, ReportStore, Tags, UserSession};
use crate::search::SearchEngine;
use crate::store::DocumentStore;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

/// Result of [`Folio::run_report`].
#[derive(Debug, Clone)]
pub struct ReportOutcome {
    pub report_id: String,
    pub hits: usize,
    pub summary: PopulateSummary,
    /// First page, ready to show; `None` when nothing matched.
    pub first_page: Option<PageView>,
}

pub struct Folio<S> {
    engine: SearchEngine<S>,
    reports: Arc<ReportStore>,
    pager: ReportPager,
    renderer: Box<dyn PageRenderer>,
    annotator: Box<dyn Annotator>,
    min_query_chars: usize,
}

impl<S: DocumentStore> Folio<S> {
    pub fn new(
        store: S,
        reports: Arc<ReportStore>,
        renderer: Box<dyn PageRenderer>,
        annotator: Box<dyn Annotator>,
        config: &FolioConfig,
    ) -> Self {
        Self {
            engine: SearchEngine::with_match_mode(store, config.match_mode),
            pager: ReportPager::new(reports.clone(), config.tag_labels.clone()),
            reports,
            renderer,
            annotator,
            min_query_chars: config.min_query_chars,
        }
    }

    /// Open the report database and artifact directory named in `config`,
    /// annotating with the configured outline.
    pub fn open(config: &FolioConfig, store: S, renderer: Box<dyn PageRenderer>) -> FolioResult<Self> {
        let db = Arc::new(ReportDatabase::open(&config.report_db_path)?);
        let mut reports = ReportStore::new(db, &config.artifact_dir)?;
        if let Some(workers) = config.render_workers {
            reports = reports.with_render_workers(workers)?;
        }
        let annotator = Box::new(config.outline.annotator());
        Ok(Self::new(store, Arc::new(reports), renderer, annotator, config))
    }

    pub fn engine(&self) -> &SearchEngine<S> {
        &self.engine
    }

    pub fn reports(&self) -> &Arc<ReportStore> {
        &self.reports
    }

    pub fn pager(&self) -> &ReportPager {
        &self.pager
    }

    /// Record a new query for `user` and mint the report it will fill.
    /// The new report id becomes the user's last report, which abandons any
    /// report still being populated for them.
    pub fn submit_query(&self, user_id: &str, text: &str) -> FolioResult<String> {
        let query = text.trim();
        if query.chars().count() < self.min_query_chars {
            return Err(FolioError::InvalidQuery(format!(
                "query must be at least {} characters",
                self.min_query_chars
            )));
        }

        self.reports.set_query(user_id, query)?;
        let report_id = ReportStore::mint_report_id();
        self.reports.create_report(&report_id, query)?;
        self.reports.set_last_report(user_id, &report_id)?;
        tracing::debug!(user_id, report_id = %report_id, "query submitted");
        Ok(report_id)
    }

    /// Add or replace one equality filter; returns the user's filters.
    pub fn choose_filter(&self, user_id: &str, tag: &str, value: &str) -> FolioResult<BTreeMap<String, String>> {
        let mut filters = self.reports.get_filters(user_id)?;
        filters.insert(tag.to_string(), value.to_string());
        self.reports.set_filters(user_id, &filters)?;
        Ok(filters)
    }

    /// Values a tag takes across the collection, for offering filter choices.
    pub fn filter_values(&self, tag: &str) -> FolioResult<Vec<String>> {
        Ok(self.engine.store().distinct(&format!("tags.{}", tag))?)
    }

    pub fn clear_filters(&self, user_id: &str) -> FolioResult<()> {
        self.reports.clear_filters(user_id)
    }

    pub fn session(&self, user_id: &str) -> FolioResult<UserSession> {
        self.reports.session(user_id)
    }

    /// Search the user's last query and materialize the hits into their last
    /// report, or into a new one when that report already holds pages. With
    /// `use_filters` the stored session filters apply.
    pub fn run_report(&self, user_id: &str, use_filters: bool) -> FolioResult<ReportOutcome> {
        let session = self.reports.session(user_id)?;
        let query = session
            .last_query
            .ok_or_else(|| FolioError::InvalidQuery("no query submitted".into()))?;
        // A populated report is immutable; a rerun gets a fresh one.
        let report_id = match session.last_report_id {
            Some(id) if self.reports.page_count(&id)? == 0 => id,
            _ => {
                let id = ReportStore::mint_report_id();
                self.reports.create_report(&id, &query)?;
                self.reports.set_last_report(user_id, &id)?;
                id
            }
        };

        let filters = if use_filters {
            TagFilters::from_session(&session.filters)
        } else {
            TagFilters::new()
        };
        let hits = self.engine.search(&query, &filters)?;
        if hits.is_empty() {
            return Ok(ReportOutcome {
                report_id,
                hits: 0,
                summary: PopulateSummary::default(),
                first_page: None,
            });
        }

        let tags = self.document_tags(&hits)?;
        let still_current = || {
            self.reports
                .get_last_report(user_id)
                .map(|last| last.as_deref() == Some(report_id.as_str()))
                .unwrap_or(false)
        };
        let summary = self.reports.populate(
            &report_id,
            &hits,
            self.renderer.as_ref(),
            self.annotator.as_ref(),
            |hit| tags.get(&hit.doc_id).cloned().unwrap_or_default(),
            still_current,
        )?;

        let first_page = self.pager.page(&report_id, 0)?;
        Ok(ReportOutcome {
            report_id,
            hits: hits.len(),
            summary,
            first_page,
        })
    }

    fn document_tags(&self, hits: &[SearchHit]) -> FolioResult<HashMap<String, Tags>> {
        let mut tags = HashMap::new();
        for hit in hits {
            if tags.contains_key(&hit.doc_id) {
                continue;
            }
            let doc_tags = self
                .engine
                .store()
                .get(&hit.doc_id)?
                .map(|d| d.tags)
                .unwrap_or_default();
            tags.insert(hit.doc_id.clone(), doc_tags);
        }
        Ok(tags)
    }

    pub fn open_page(&self, report_id: &str, idx: usize) -> FolioResult<Option<PageView>> {
        self.pager.page(report_id, idx)
    }

    /// Source file of a document, for download.
    pub fn source_path(&self, doc_id: &str) -> FolioResult<Option<PathBuf>> {
        Ok(self.engine.store().get(doc_id)?.map(|d| PathBuf::from(d.path)))
    }
}
