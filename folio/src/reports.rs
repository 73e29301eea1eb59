//! Report cache and per-user sessions.
//!
//! A report is one materialized result set: each hit becomes an annotated page
//! artifact stored under `<artifact_dir>/<report_id>_<idx>.png` and a row in
//! the `pages` table. Lookups never fail for unknown reports or indexes; they
//! return `None`.

use crate::artifact::{Annotator, PageRenderer};
use crate::database::{DatabaseError, PageRow, ReportDatabase, UserField};
use crate::interface::{FolioError, FolioResult, SearchHit};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Tag name → value snapshot stored with each page.
pub type Tags = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub id: String,
    pub query: String,
    pub created_at: DateTime<Utc>,
}

/// Everything needed to show one page of a report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportPage {
    pub artifact_path: PathBuf,
    pub tags: Tags,
    /// 0-based
    pub page_idx: usize,
    /// Pages currently stored for the report
    pub total: usize,
    pub query: String,
    pub doc_id: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserSession {
    pub user_id: String,
    pub filters: BTreeMap<String, String>,
    pub last_query: Option<String>,
    pub last_report_id: Option<String>,
}

/// Outcome of [`ReportStore::populate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopulateSummary {
    /// Rows written, failed renders included.
    pub written: usize,
    /// Pages whose render or annotation failed.
    pub failed: usize,
    /// A newer report superseded this one before all rows were written.
    pub abandoned: bool,
}

enum Rendered {
    Ready,
    Failed,
    Skipped,
}

pub struct ReportStore {
    db: Arc<ReportDatabase>,
    artifact_dir: PathBuf,
    render_pool: Option<rayon::ThreadPool>,
}

impl ReportStore {
    /// Create a store writing artifacts under `artifact_dir` (created if absent).
    pub fn new(db: Arc<ReportDatabase>, artifact_dir: impl Into<PathBuf>) -> FolioResult<Self> {
        let artifact_dir = artifact_dir.into();
        std::fs::create_dir_all(&artifact_dir).map_err(DatabaseError::from)?;
        Ok(Self {
            db,
            artifact_dir,
            render_pool: None,
        })
    }

    /// Render pages in a dedicated pool of `workers` threads instead of the global one.
    pub fn with_render_workers(mut self, workers: usize) -> FolioResult<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("folio-render-{}", i))
            .build()
            .map_err(|e| FolioError::Config(format!("render pool: {}", e)))?;
        self.render_pool = Some(pool);
        Ok(self)
    }

    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    pub fn database(&self) -> &Arc<ReportDatabase> {
        &self.db
    }

    /// File name of the artifact for page `idx` of a report.
    pub fn artifact_name(report_id: &str, idx: usize) -> String {
        format!("{}_{}.png", report_id, idx)
    }

    pub fn artifact_path(&self, report_id: &str, idx: usize) -> PathBuf {
        self.artifact_dir.join(Self::artifact_name(report_id, idx))
    }

    pub fn mint_report_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // REPORTS
    // ═══════════════════════════════════════════════════════════════════════

    pub fn create_report(&self, report_id: &str, query: &str) -> FolioResult<()> {
        self.db.insert_report(report_id, query, Utc::now())?;
        Ok(())
    }

    pub fn get_report(&self, report_id: &str) -> FolioResult<Option<Report>> {
        Ok(self.db.fetch_report(report_id)?.map(|row| Report {
            id: row.id,
            query: row.query,
            created_at: row.created_at,
        }))
    }

    /// Upsert the page at `(report_id, idx)`. `artifact_ref` is resolved
    /// against the artifact directory on lookup.
    pub fn add_page(&self, report_id: &str, idx: usize, artifact_ref: &str, tags: &Tags, doc_id: &str) -> FolioResult<()> {
        let tags_json = serde_json::to_string(tags).map_err(DatabaseError::from)?;
        self.db.upsert_page(&PageRow {
            report_id: report_id.to_string(),
            page_idx: idx,
            artifact_ref: artifact_ref.to_string(),
            tags_json,
            doc_id: doc_id.to_string(),
        })?;
        Ok(())
    }

    /// Page `idx` of a report, or `None` when the report, the index or the
    /// artifact file does not exist.
    pub fn get_page(&self, report_id: &str, idx: usize) -> FolioResult<Option<ReportPage>> {
        let Some(lookup) = self.db.fetch_page(report_id, idx)? else {
            return Ok(None);
        };

        let artifact_path = self.artifact_dir.join(&lookup.page.artifact_ref);
        if !artifact_path.exists() {
            tracing::warn!(report_id, idx, path = %artifact_path.display(), "page artifact missing");
            return Ok(None);
        }

        let tags: Tags = serde_json::from_str(&lookup.page.tags_json).map_err(DatabaseError::from)?;
        Ok(Some(ReportPage {
            artifact_path,
            tags,
            page_idx: idx,
            total: lookup.total,
            query: lookup.query.unwrap_or_default(),
            doc_id: lookup.page.doc_id,
        }))
    }

    pub fn page_count(&self, report_id: &str) -> FolioResult<usize> {
        Ok(self.db.count_pages(report_id)?)
    }

    /// Render, annotate and store one page per hit.
    ///
    /// Artifacts are produced in parallel; rows are written afterwards in hit
    /// order. `still_current` is checked before each render and each write;
    /// once it returns false population stops, keeping rows already written
    /// and deleting artifacts rendered for indexes that got no row. A page
    /// whose render or annotation failed keeps its row but loses its file.
    pub fn populate<R, A, T, C>(
        &self,
        report_id: &str,
        hits: &[SearchHit],
        renderer: &R,
        annotator: &A,
        tags_of: T,
        still_current: C,
    ) -> FolioResult<PopulateSummary>
    where
        R: PageRenderer + ?Sized,
        A: Annotator + ?Sized,
        T: Fn(&SearchHit) -> Tags,
        C: Fn() -> bool + Sync,
    {
        let started = Instant::now();
        let render_all = || -> Vec<Rendered> {
            hits.par_iter()
                .enumerate()
                .map(|(idx, hit)| {
                    if !still_current() {
                        return Rendered::Skipped;
                    }
                    let output = self.artifact_path(report_id, idx);
                    let result = renderer
                        .render(Path::new(&hit.path), hit.page_index(), &output)
                        .and_then(|_| annotator.annotate(&output, &hit.coords));
                    match result {
                        Ok(()) => Rendered::Ready,
                        Err(e) => {
                            tracing::warn!(report_id, idx, doc_id = %hit.doc_id, page = hit.page, "page artifact failed: {}", e);
                            // An unannotated page must not be served.
                            remove_artifact(&output);
                            Rendered::Failed
                        }
                    }
                })
                .collect()
        };
        let rendered = match &self.render_pool {
            Some(pool) => pool.install(render_all),
            None => render_all(),
        };

        let mut summary = PopulateSummary::default();
        for (idx, (hit, outcome)) in hits.iter().zip(rendered).enumerate() {
            if matches!(outcome, Rendered::Skipped) || !still_current() {
                summary.abandoned = true;
                break;
            }
            if matches!(outcome, Rendered::Failed) {
                summary.failed += 1;
            }
            self.add_page(report_id, idx, &Self::artifact_name(report_id, idx), &tags_of(hit), &hit.doc_id)?;
            summary.written += 1;
        }
        if summary.abandoned {
            for idx in summary.written..hits.len() {
                remove_artifact(&self.artifact_path(report_id, idx));
            }
        }

        tracing::info!(
            report_id,
            written = summary.written,
            failed = summary.failed,
            abandoned = summary.abandoned,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "report populated"
        );
        Ok(summary)
    }

    /// Delete reports created more than `older_than` ago, with their pages and
    /// artifact files. Returns the number of reports removed.
    pub fn expire_reports(&self, older_than: chrono::Duration) -> FolioResult<usize> {
        let cutoff = Utc::now() - older_than;
        let mut removed = 0;
        for report_id in self.db.report_ids_created_before(cutoff)? {
            for page in self.db.fetch_pages(&report_id)? {
                remove_artifact(&self.artifact_dir.join(&page.artifact_ref));
            }
            if self.db.delete_report(&report_id)? {
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::info!(removed, "expired reports");
        }
        Ok(removed)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // SESSIONS
    // ═══════════════════════════════════════════════════════════════════════

    pub fn set_query(&self, user_id: &str, query: &str) -> FolioResult<()> {
        self.db.set_user_field(user_id, UserField::LastQuery, Some(query))?;
        Ok(())
    }

    pub fn get_query(&self, user_id: &str) -> FolioResult<Option<String>> {
        Ok(self.db.fetch_user(user_id)?.and_then(|u| u.last_query))
    }

    pub fn set_filters(&self, user_id: &str, filters: &BTreeMap<String, String>) -> FolioResult<()> {
        let json = serde_json::to_string(filters).map_err(DatabaseError::from)?;
        self.db.set_user_field(user_id, UserField::Filters, Some(&json))?;
        Ok(())
    }

    /// Stored filters, empty when unset.
    pub fn get_filters(&self, user_id: &str) -> FolioResult<BTreeMap<String, String>> {
        match self.db.fetch_user(user_id)?.and_then(|u| u.filters_json) {
            Some(json) => Ok(serde_json::from_str(&json).map_err(DatabaseError::from)?),
            None => Ok(BTreeMap::new()),
        }
    }

    pub fn clear_filters(&self, user_id: &str) -> FolioResult<()> {
        self.db.set_user_field(user_id, UserField::Filters, None)?;
        Ok(())
    }

    pub fn set_last_report(&self, user_id: &str, report_id: &str) -> FolioResult<()> {
        self.db.set_user_field(user_id, UserField::LastReport, Some(report_id))?;
        Ok(())
    }

    pub fn get_last_report(&self, user_id: &str) -> FolioResult<Option<String>> {
        Ok(self.db.fetch_user(user_id)?.and_then(|u| u.last_report_id))
    }

    /// Full session state; a user never seen has every field unset.
    pub fn session(&self, user_id: &str) -> FolioResult<UserSession> {
        let Some(row) = self.db.fetch_user(user_id)? else {
            return Ok(UserSession {
                user_id: user_id.to_string(),
                ..UserSession::default()
            });
        };
        let filters = match row.filters_json {
            Some(json) => serde_json::from_str(&json).map_err(DatabaseError::from)?,
            None => BTreeMap::new(),
        };
        Ok(UserSession {
            user_id: row.user_id,
            filters,
            last_query: row.last_query,
            last_report_id: row.last_report_id,
        })
    }
}

/// Delete an artifact file; an absent file is not an error.
fn remove_artifact(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), "could not remove artifact: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, ReportStore) {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(ReportDatabase::open_in_memory().unwrap());
        let store = ReportStore::new(db, dir.path().join("artifacts")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_get_page_resolves_artifact_and_tags() {
        let (_dir, store) = store();
        store.create_report("r", "привет").unwrap();
        std::fs::write(store.artifact_path("r", 0), b"png").unwrap();

        let mut tags = Tags::new();
        tags.insert("course".into(), "3".into());
        store.add_page("r", 0, &ReportStore::artifact_name("r", 0), &tags, "doc-1").unwrap();

        let page = store.get_page("r", 0).unwrap().unwrap();
        assert_eq!(page.artifact_path, store.artifact_path("r", 0));
        assert_eq!(page.tags, tags);
        assert_eq!(page.total, 1);
        assert_eq!(page.query, "привет");
        assert_eq!(page.doc_id, "doc-1");
    }

    #[test]
    fn test_missing_artifact_is_not_found() {
        let (_dir, store) = store();
        store.create_report("r", "q").unwrap();
        store.add_page("r", 0, "gone.png", &Tags::new(), "d").unwrap();
        assert!(store.get_page("r", 0).unwrap().is_none());
        assert_eq!(store.page_count("r").unwrap(), 1);
    }

    #[test]
    fn test_session_defaults_and_clear() {
        let (_dir, store) = store();
        assert_eq!(store.get_query("nobody").unwrap(), None);
        assert!(store.get_filters("nobody").unwrap().is_empty());
        assert_eq!(store.session("nobody").unwrap().user_id, "nobody");

        let mut filters = BTreeMap::new();
        filters.insert("course".to_string(), "3".to_string());
        store.set_filters("u", &filters).unwrap();
        store.set_query("u", "биология").unwrap();
        assert_eq!(store.get_filters("u").unwrap(), filters);

        store.clear_filters("u").unwrap();
        let session = store.session("u").unwrap();
        assert!(session.filters.is_empty());
        assert_eq!(session.last_query.as_deref(), Some("биология"));
        assert_eq!(session.last_report_id, None);
    }

    #[test]
    fn test_mint_report_id_unique() {
        assert_ne!(ReportStore::mint_report_id(), ReportStore::mint_report_id());
    }

    #[test]
    fn test_expire_removes_rows_and_files() {
        let (_dir, store) = store();
        store.create_report("r", "q").unwrap();
        let path = store.artifact_path("r", 0);
        std::fs::write(&path, b"png").unwrap();
        store.add_page("r", 0, &ReportStore::artifact_name("r", 0), &Tags::new(), "d").unwrap();

        assert_eq!(store.expire_reports(chrono::Duration::days(1)).unwrap(), 0);
        assert_eq!(store.expire_reports(chrono::Duration::seconds(-1)).unwrap(), 1);
        assert!(!path.exists());
        assert!(store.get_report("r").unwrap().is_none());
    }
}
