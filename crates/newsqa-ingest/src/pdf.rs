//! PDF text extraction, one document per page.

use anyhow::{anyhow, Result};
use std::path::Path;
use tracing::debug;

use newsqa_core::types::Document;

pub const PAGE_KEY: &str = "page";
pub const TOTAL_PAGES_KEY: &str = "total_pages";

/// Pages are numbered from 0. Pages without extractable text are skipped.
#[cfg(feature = "pdf")]
pub fn load_pdf(path: &Path, source: &str) -> Result<Vec<Document>> {
    use pdf_oxide::converters::ConversionOptions;

    let path_str = path
        .to_str()
        .ok_or_else(|| anyhow!("PDF path {} is not valid UTF-8", path.display()))?;
    let mut doc = pdf_oxide::PdfDocument::open(path_str).map_err(|e| anyhow!("opening PDF: {e}"))?;
    let page_count = doc.page_count().map_err(|e| anyhow!("reading page count: {e}"))?;
    let options = ConversionOptions { include_images: false, ..ConversionOptions::default() };

    let mut docs = Vec::new();
    for page_index in 0..page_count {
        let text = doc
            .to_markdown(page_index, &options)
            .map_err(|e| anyhow!("extracting page {}: {e}", page_index + 1))?;
        if text.trim().is_empty() {
            continue;
        }
        docs.push(
            Document::new(text, source)
                .with_meta(PAGE_KEY, page_index.to_string())
                .with_meta(TOTAL_PAGES_KEY, page_count.to_string()),
        );
    }
    debug!(source, pages = page_count, with_text = docs.len(), "loaded PDF");
    Ok(docs)
}

#[cfg(not(feature = "pdf"))]
pub fn load_pdf(path: &Path, _source: &str) -> Result<Vec<Document>> {
    Err(anyhow!("cannot read {}: built without the `pdf` feature", path.display()))
}
