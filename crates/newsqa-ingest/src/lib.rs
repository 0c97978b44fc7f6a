//! newsqa-ingest
//!
//! Source loaders: web pages, PDF files and plain text. [`SourceLoader`]
//! dispatches on the [`Source`] kind.

pub mod pdf;
pub mod text;
pub mod url;

use anyhow::{Context, Result};
use tracing::info;

use newsqa_core::config::IngestConfig;
use newsqa_core::traits::DocumentLoader;
use newsqa_core::types::{Document, Source};

pub use url::{html_to_text, validate_url, UrlFetcher};

pub struct SourceLoader {
    fetcher: UrlFetcher,
}

impl SourceLoader {
    pub fn new(config: &IngestConfig) -> Result<Self> {
        Ok(Self { fetcher: UrlFetcher::new(config)? })
    }
}

impl DocumentLoader for SourceLoader {
    fn load(&self, source: &Source) -> Result<Vec<Document>> {
        let docs = match source {
            Source::Url(url) => self.fetcher.load(url)?,
            Source::Pdf(path) => {
                anyhow::ensure!(path.is_file(), "no such file: {}", path.display());
                pdf::load_pdf(path, &path.display().to_string())?
            }
            Source::Text(path) => text::load_text(path)
                .with_context(|| format!("loading {}", path.display()))?,
        };
        info!(%source, documents = docs.len(), "loaded source");
        Ok(docs)
    }
}
