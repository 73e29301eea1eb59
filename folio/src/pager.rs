//! Turns stored report pages into what a front-end shows: the artifact, a
//! caption and previous/next navigation. Stateless; every call reads the
//! report store, so re-navigation never recomputes a search.

use crate::config::TagLabel;
use crate::interface::FolioResult;
use crate::reports::{ReportPage, ReportStore, Tags};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    /// Index of the previous page, if any
    pub previous: Option<usize>,
    pub next: Option<usize>,
    /// 1-based "i/N"
    pub position: String,
}

impl Navigation {
    pub fn new(page_idx: usize, total: usize) -> Self {
        Self {
            previous: page_idx.checked_sub(1),
            next: (page_idx + 1 < total).then_some(page_idx + 1),
            position: format!("{}/{}", page_idx + 1, total),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageView {
    pub page: ReportPage,
    pub caption: String,
    pub navigation: Navigation,
}

pub struct ReportPager {
    store: Arc<ReportStore>,
    labels: Vec<TagLabel>,
}

impl ReportPager {
    pub fn new(store: Arc<ReportStore>, labels: Vec<TagLabel>) -> Self {
        Self { store, labels }
    }

    /// Page `idx` of `report_id`, or `None` when it cannot be shown.
    pub fn page(&self, report_id: &str, idx: usize) -> FolioResult<Option<PageView>> {
        let Some(page) = self.store.get_page(report_id, idx)? else {
            return Ok(None);
        };
        Ok(Some(PageView {
            caption: self.caption(&page),
            navigation: Navigation::new(page.page_idx, page.total),
            page,
        }))
    }

    pub fn caption(&self, page: &ReportPage) -> String {
        let mut lines = vec![
            format!("By query \"{}\"", page.query),
            format!("Result ({} of {}):", page.page_idx + 1, page.total),
            String::new(),
        ];
        lines.extend(self.tag_lines(&page.tags));
        lines.join("\n")
    }

    fn tag_lines<'a>(&'a self, tags: &'a Tags) -> impl Iterator<Item = String> + 'a {
        self.labels.iter().filter_map(move |l| {
            tags.get(&l.tag)
                .filter(|v| !v.is_empty())
                .map(|v| format!("{}: {}", l.label, v))
        })
    }

    /// One ` * <label> = <value>` line per active filter; `None` when empty.
    pub fn describe_filters(&self, filters: &BTreeMap<String, String>) -> Option<String> {
        if filters.is_empty() {
            return None;
        }
        let lines: Vec<String> = filters
            .iter()
            .map(|(tag, value)| {
                let label = self
                    .labels
                    .iter()
                    .find(|l| &l.tag == tag)
                    .map(|l| l.label.as_str())
                    .unwrap_or(tag);
                format!(" * {} = {}", label, value)
            })
            .collect();
        Some(lines.join(",\n"))
    }
}
