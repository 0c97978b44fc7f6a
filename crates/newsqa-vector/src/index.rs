//! Exact nearest-neighbour index over chunk embeddings.
//!
//! Scoring is brute force over every entry, which is plenty for the handful of
//! articles and papers a workspace holds. Results are ordered by descending
//! score; equal scores keep insertion order.

use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use newsqa_core::error::{Error, Result};
use newsqa_core::traits::Embedder;
use newsqa_core::types::{Chunk, Metric};

use crate::snapshot;

/// A stored chunk together with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// How chunks are pushed through the embedder.
#[derive(Debug, Clone, Copy)]
pub struct EmbedOptions {
    pub batch_size: usize,
    pub show_progress: bool,
}

impl Default for EmbedOptions {
    fn default() -> Self {
        Self { batch_size: 32, show_progress: false }
    }
}

#[derive(Debug, Clone)]
pub struct VectorIndex {
    dim: usize,
    metric: Metric,
    embedder_id: String,
    entries: Vec<IndexEntry>,
    norms: Vec<f32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl VectorIndex {
    pub fn create(chunks: &[Chunk], embedder: &dyn Embedder, metric: Metric) -> Result<Self> {
        Self::create_with(chunks, embedder, metric, EmbedOptions::default())
    }

    /// Embed `chunks` and build a fresh index.
    pub fn create_with(
        chunks: &[Chunk],
        embedder: &dyn Embedder,
        metric: Metric,
        options: EmbedOptions,
    ) -> Result<Self> {
        if chunks.is_empty() {
            return Err(Error::EmptyInput("cannot build an index from zero chunks".into()));
        }
        let dim = embedder.dim();
        let vectors = embed_chunks(chunks, embedder, options)?;
        let now = Utc::now();
        let mut index = Self {
            dim,
            metric,
            embedder_id: embedder.id().to_string(),
            entries: Vec::with_capacity(chunks.len()),
            norms: Vec::with_capacity(chunks.len()),
            created_at: now,
            updated_at: now,
        };
        index.extend(chunks, vectors);
        info!(entries = index.len(), dim, %metric, "created vector index");
        Ok(index)
    }

    pub fn append(self, chunks: &[Chunk], embedder: &dyn Embedder) -> Result<Self> {
        self.append_with(chunks, embedder, EmbedOptions::default())
    }

    /// Embed `chunks` and add them after the existing entries.
    ///
    /// All embeddings are computed and validated before anything is merged,
    /// so an error leaves no trace of the new chunks.
    pub fn append_with(
        mut self,
        chunks: &[Chunk],
        embedder: &dyn Embedder,
        options: EmbedOptions,
    ) -> Result<Self> {
        if chunks.is_empty() {
            return Err(Error::EmptyInput("nothing to append".into()));
        }
        self.check_embedder(embedder)?;
        let vectors = embed_chunks(chunks, embedder, options)?;
        let before = self.len();
        self.extend(chunks, vectors);
        self.updated_at = Utc::now();
        info!(added = self.len() - before, entries = self.len(), "appended to vector index");
        Ok(self)
    }

    /// Up to `k` entries by descending similarity to `query`.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if k == 0 {
            return Err(Error::InvalidArgument("k must be at least 1".into()));
        }
        if query.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: query.len() });
        }
        if query.iter().any(|x| !x.is_finite()) {
            return Err(Error::InvalidArgument("query vector contains non-finite values".into()));
        }
        let query_norm = l2_norm(query);
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .zip(&self.norms)
            .enumerate()
            .map(|(i, (entry, norm))| (i, self.score(query, query_norm, &entry.vector, *norm)))
            .collect();
        // stable sort: equal scores stay in insertion order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);
        debug!(k, returned = scored.len(), "vector search");
        Ok(scored
            .into_iter()
            .map(|(i, score)| ScoredChunk { chunk: self.entries[i].chunk.clone(), score })
            .collect())
    }

    /// The index is only usable with an embedder of the same dimension.
    pub fn check_embedder(&self, embedder: &dyn Embedder) -> Result<()> {
        if embedder.dim() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: embedder.dim() });
        }
        if embedder.id() != self.embedder_id {
            warn!(
                index = %self.embedder_id,
                embedder = %embedder.id(),
                "embedder differs from the one that built the index"
            );
        }
        Ok(())
    }

    pub fn persist(&self) -> Result<Vec<u8>> {
        snapshot::encode(self)
    }

    pub fn load(bytes: &[u8]) -> Result<Self> {
        snapshot::decode(bytes)
    }

    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
    pub fn dim(&self) -> usize { self.dim }
    pub fn metric(&self) -> Metric { self.metric }
    pub fn embedder_id(&self) -> &str { &self.embedder_id }
    pub fn entries(&self) -> &[IndexEntry] { &self.entries }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    /// Distinct chunk sources in first-seen order.
    pub fn sources(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.entries
            .iter()
            .map(|e| e.chunk.source())
            .filter(|s| seen.insert(*s))
            .map(str::to_string)
            .collect()
    }

    pub(crate) fn from_parts(
        dim: usize,
        metric: Metric,
        embedder_id: String,
        entries: Vec<IndexEntry>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        let norms = entries.iter().map(|e| l2_norm(&e.vector)).collect();
        Self { dim, metric, embedder_id, entries, norms, created_at, updated_at }
    }

    fn extend(&mut self, chunks: &[Chunk], vectors: Vec<Vec<f32>>) {
        for (chunk, vector) in chunks.iter().zip(vectors) {
            self.norms.push(l2_norm(&vector));
            self.entries.push(IndexEntry { chunk: chunk.clone(), vector });
        }
    }

    fn score(&self, query: &[f32], query_norm: f32, vector: &[f32], norm: f32) -> f32 {
        let dot = dot(query, vector);
        match self.metric {
            Metric::InnerProduct => dot,
            Metric::Cosine => {
                let denom = query_norm * norm;
                if denom <= f32::EPSILON { 0.0 } else { dot / denom }
            }
        }
    }
}

/// Embed chunk texts in batches, checking that the embedder keeps its contract.
fn embed_chunks(
    chunks: &[Chunk],
    embedder: &dyn Embedder,
    options: EmbedOptions,
) -> Result<Vec<Vec<f32>>> {
    let dim = embedder.dim();
    if dim == 0 {
        let id = embedder.id();
        return Err(Error::Embedding(anyhow::anyhow!("embedder '{id}' reports dimension 0")));
    }
    let pb = if options.show_progress {
        ProgressBar::new(chunks.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    if let Ok(style) = ProgressStyle::default_bar().template(concat!(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] ",
        "{pos}/{len} chunks ({percent}%) {msg}",
    )) {
        pb.set_style(style.progress_chars("#>-"));
    }

    let mut vectors = Vec::with_capacity(chunks.len());
    for batch in chunks.chunks(options.batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let embedded = embedder.embed_batch(&texts).map_err(Error::Embedding)?;
        if embedded.len() != batch.len() {
            return Err(Error::Embedding(anyhow::anyhow!(
                "embedder returned {} vectors for {} texts",
                embedded.len(),
                batch.len()
            )));
        }
        for v in &embedded {
            if v.len() != dim {
                return Err(Error::DimensionMismatch { expected: dim, actual: v.len() });
            }
            if v.iter().any(|x| !x.is_finite()) {
                let cause = anyhow::anyhow!("embedder produced non-finite values");
                return Err(Error::Embedding(cause));
            }
        }
        vectors.extend(embedded);
        pb.inc(batch.len() as u64);
    }
    pb.finish_and_clear();
    Ok(vectors)
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn l2_norm(v: &[f32]) -> f32 {
    dot(v, v).sqrt()
}
