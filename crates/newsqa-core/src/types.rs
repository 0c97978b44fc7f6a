//! Domain types flowing through ingestion, indexing and answering.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

pub type ChunkId = String;
/// Ordered so that serialized snapshots are byte-stable.
pub type Meta = BTreeMap<String, String>;

/// Metadata key every document is expected to carry.
pub const SOURCE_KEY: &str = "source";
/// Shown when a document arrives without a `source` entry.
pub const UNKNOWN_SOURCE: &str = "Unknown source";

/// Raw text produced by a loader, immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub metadata: Meta,
}

impl Document {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        let mut metadata = Meta::new();
        metadata.insert(SOURCE_KEY.to_string(), source.into());
        Self { text: text.into(), metadata }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn source(&self) -> &str {
        self.metadata.get(SOURCE_KEY).map(String::as_str).unwrap_or(UNKNOWN_SOURCE)
    }
}

/// A bounded slice of a document that is independently embedded and retrieved.
///
/// - `id`: content-derived identifier, stable across runs
/// - `text`: the chunk payload
/// - `metadata`: the parent document's metadata, unchanged
/// - `chunk_index`/`total_chunks`: position within the parent document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub text: String,
    pub metadata: Meta,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

impl Chunk {
    pub fn source(&self) -> &str {
        self.metadata.get(SOURCE_KEY).map(String::as_str).unwrap_or(UNKNOWN_SOURCE)
    }
}

/// Similarity used by the vector index. Higher scores are always better.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    Cosine,
    InnerProduct,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Cosine => write!(f, "cosine"),
            Metric::InnerProduct => write!(f, "inner_product"),
        }
    }
}

/// Where a document comes from. Interpreted by a `DocumentLoader`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "location", rename_all = "snake_case")]
pub enum Source {
    Url(String),
    Pdf(PathBuf),
    /// A text file or a directory of text files.
    Text(PathBuf),
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Url(url) => write!(f, "{url}"),
            Source::Pdf(path) | Source::Text(path) => write!(f, "{}", path.display()),
        }
    }
}

/// One supporting passage of an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceExcerpt {
    pub source: String,
    pub excerpt: String,
}

/// Answer plus the provenance of the chunks used as context, in retrieval order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    pub answer: String,
    pub sources: Vec<SourceExcerpt>,
}

/// Whether a build produced a fresh index or extended an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildMode {
    Created,
    Appended,
}

/// Result of an index build as seen by the lifecycle manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOutcome {
    pub mode: BuildMode,
    pub documents: usize,
    pub chunks_added: usize,
    pub total_entries: usize,
    pub dim: usize,
}

/// A source that failed to load during a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestFailure {
    pub source: String,
    pub reason: String,
}

/// Build outcome plus ingestion failures that did not abort the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    pub outcome: BuildOutcome,
    pub failed_sources: Vec<IngestFailure>,
}

/// Truncate to at most `max_chars` characters without splitting a code point.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}
