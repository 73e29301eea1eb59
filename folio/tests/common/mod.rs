//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use demo_data::{DemoDocument, ALL_DOCUMENTS};
use folio::artifact::ArtifactResult;
use folio::ingest::prepare_document;
use folio::{Document, DocumentStore, MemoryDocumentStore, Point, Token};
use image::{Rgb, RgbImage};
use std::path::Path;

/// Convert a demo lecture into a store document, as the importer would.
pub fn document(demo: &DemoDocument) -> Document {
    let pages = demo
        .pages
        .iter()
        .map(|page| {
            page.iter()
                .map(|t| Token::new(t.word, t.corners.iter().map(|&c| Point::from(c)).collect()))
                .collect()
        })
        .collect();

    prepare_document(Document {
        id: String::new(),
        filename: demo.filename.to_string(),
        path: demo.path.to_string(),
        tags: demo.tags.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        text: demo.text.to_string(),
        text_clear: String::new(),
        pages,
    })
}

/// Store holding every demo lecture; ids in insertion order.
pub fn demo_store() -> (MemoryDocumentStore, Vec<String>) {
    let store = MemoryDocumentStore::new();
    let ids = ALL_DOCUMENTS
        .iter()
        .map(|demo| store.insert(document(demo)).unwrap())
        .collect();
    (store, ids)
}

/// Stand-in for the external page renderer: writes a blank white PNG.
pub fn blank_renderer(_source: &Path, _page: usize, output: &Path) -> ArtifactResult<()> {
    RgbImage::from_pixel(64, 48, Rgb([255, 255, 255])).save(output)?;
    Ok(())
}
