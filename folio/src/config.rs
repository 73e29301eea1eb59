//! Configuration loaded from a JSON file.
//!
//! Every field has a default, so a partial file (or none at all) is valid.
//! `load_or_init` writes the defaults out on first run.

use crate::artifact::OutlineAnnotator;
use crate::interface::{FolioError, FolioResult, MatchMode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolioConfig {
    /// SQLite file holding reports and sessions
    pub report_db_path: PathBuf,
    /// Directory for rendered page artifacts
    pub artifact_dir: PathBuf,
    pub match_mode: MatchMode,
    /// Shortest accepted query, in characters after trimming
    pub min_query_chars: usize,
    /// Size of a dedicated render pool; the global rayon pool when unset
    pub render_workers: Option<usize>,
    pub outline: OutlineConfig,
    /// Tags shown in page captions, in display order
    pub tag_labels: Vec<TagLabel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlineConfig {
    pub color: [u8; 3],
    pub width_factor: f64,
    pub zoom: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagLabel {
    pub tag: String,
    pub label: String,
}

impl TagLabel {
    pub fn new(tag: impl Into<String>, label: impl Into<String>) -> Self {
        Self { tag: tag.into(), label: label.into() }
    }
}

impl Default for FolioConfig {
    fn default() -> Self {
        Self {
            report_db_path: PathBuf::from("data/reports.db"),
            artifact_dir: PathBuf::from("data/files"),
            match_mode: MatchMode::Substring,
            min_query_chars: 3,
            render_workers: None,
            outline: OutlineConfig::default(),
            tag_labels: default_tag_labels(),
        }
    }
}

impl Default for OutlineConfig {
    fn default() -> Self {
        Self {
            color: [255, 0, 0],
            width_factor: 0.005,
            zoom: 1.0,
        }
    }
}

fn default_tag_labels() -> Vec<TagLabel> {
    vec![
        TagLabel::new("subject", "Subject"),
        TagLabel::new("course", "Course"),
        TagLabel::new("semester", "Semester"),
        TagLabel::new("number", "Lecture"),
        TagLabel::new("date", "Date"),
        TagLabel::new("teacher", "Teacher"),
        TagLabel::new("doginfo", "Caption"),
    ]
}

impl OutlineConfig {
    pub fn annotator(&self) -> OutlineAnnotator {
        OutlineAnnotator {
            color: self.color,
            width_factor: self.width_factor,
            zoom: self.zoom,
        }
    }
}

impl FolioConfig {
    /// Read the config at `path`; a missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> FolioResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| FolioError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let config = serde_json::from_str(&content)
            .map_err(|e| FolioError::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Like [`load`](Self::load), but writes the default file when none exists.
    pub fn load_or_init(path: impl AsRef<Path>) -> FolioResult<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::load(path);
        }
        let config = Self::default();
        config.save(path)?;
        tracing::info!("Created default configuration at {:?}", path);
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> FolioResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| FolioError::Config(format!("Failed to create {}: {}", parent.display(), e)))?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| FolioError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)
            .map_err(|e| FolioError::Config(format!("Failed to write {}: {}", path.display(), e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("folio.json");
        std::fs::write(&path, r#"{"match_mode": "exact", "outline": {"zoom": 2.0}}"#).unwrap();

        let config = FolioConfig::load(&path).unwrap();
        assert_eq!(config.match_mode, MatchMode::Exact);
        assert_eq!(config.outline.zoom, 2.0);
        assert_eq!(config.outline.width_factor, 0.005);
        assert_eq!(config.min_query_chars, 3);
        assert_eq!(config.tag_labels.len(), 7);
    }

    #[test]
    fn test_load_or_init_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("folio.json");
        assert_eq!(FolioConfig::load(&path).unwrap(), FolioConfig::default());

        let config = FolioConfig::load_or_init(&path).unwrap();
        assert!(path.exists());
        assert_eq!(FolioConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("folio.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(FolioConfig::load(&path), Err(FolioError::Config(_))));
    }
}
