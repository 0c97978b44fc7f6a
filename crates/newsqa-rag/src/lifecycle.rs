//! Create, append to and replace the persisted index of one workspace.
//!
//! The persisted snapshot is only ever replaced by a complete new one: every
//! failure (empty input, corrupt snapshot, embedder mismatch, embedding error)
//! happens before `IndexStore::save` is reached.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use newsqa_core::chunker::Chunker;
use newsqa_core::error::{Error, Result};
use newsqa_core::types::{BuildMode, BuildOutcome, Document, Metric};
use newsqa_vector::{EmbedOptions, IndexStore, VectorIndex};

use crate::embedder::EmbedderSlot;

/// Summary of a persisted index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStatus {
    pub location: String,
    pub entries: usize,
    pub sources: Vec<String>,
    pub dim: usize,
    pub embedder_id: String,
    pub metric: Metric,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IndexStatus {
    pub fn of(index: &VectorIndex, location: String) -> Self {
        Self {
            location,
            entries: index.len(),
            sources: index.sources(),
            dim: index.dim(),
            embedder_id: index.embedder_id().to_string(),
            metric: index.metric(),
            created_at: index.created_at(),
            updated_at: index.updated_at(),
        }
    }
}

/// Decoded snapshot of `store`, `None` when nothing was saved yet.
pub fn load_index(store: &dyn IndexStore) -> Result<Option<VectorIndex>> {
    store.load()?.map(|bytes| VectorIndex::load(&bytes)).transpose()
}

/// Status without needing an embedder, for read-only front ends.
pub fn index_status(store: &dyn IndexStore) -> Result<Option<IndexStatus>> {
    Ok(load_index(store)?.map(|index| IndexStatus::of(&index, store.location())))
}

pub struct IndexLifecycleManager<S: IndexStore> {
    store: S,
    embedder: Arc<EmbedderSlot>,
    chunker: Chunker,
    metric: Metric,
    options: EmbedOptions,
}

impl<S: IndexStore> IndexLifecycleManager<S> {
    pub fn new(store: S, embedder: Arc<EmbedderSlot>, chunker: Chunker, metric: Metric) -> Self {
        Self { store, embedder, chunker, metric, options: EmbedOptions::default() }
    }

    pub fn with_options(mut self, options: EmbedOptions) -> Self {
        self.options = options;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Chunk and embed `documents`, then persist the resulting index.
    ///
    /// With `append` the chunks are added to the persisted index when there
    /// is one; without a persisted index this is a plain create.
    pub fn build(&self, documents: &[Document], append: bool) -> Result<BuildOutcome> {
        if documents.is_empty() {
            return Err(Error::EmptyInput("no documents to index".into()));
        }
        let chunks = self.chunker.split(documents);
        if chunks.is_empty() {
            let detail = format!("{} documents contained no text", documents.len());
            return Err(Error::EmptyInput(detail));
        }

        let existing = if append { self.current()? } else { None };
        let embedder = self.embedder.get()?;
        let embedder = embedder.as_ref();
        let (index, mode) = match existing {
            Some(index) => {
                index.check_embedder(embedder)?;
                (index.append_with(&chunks, embedder, self.options)?, BuildMode::Appended)
            }
            None => {
                if append {
                    let location = self.store.location();
                    warn!(%location, "no index to append to, creating a new one");
                }
                let index = VectorIndex::create_with(&chunks, embedder, self.metric, self.options)?;
                (index, BuildMode::Created)
            }
        };

        self.store.save(&index.persist()?)?;
        let outcome = BuildOutcome {
            mode,
            documents: documents.len(),
            chunks_added: chunks.len(),
            total_entries: index.len(),
            dim: index.dim(),
        };
        info!(
            ?mode,
            documents = outcome.documents,
            chunks = outcome.chunks_added,
            total = outcome.total_entries,
            "index saved"
        );
        Ok(outcome)
    }

    pub fn current(&self) -> Result<Option<VectorIndex>> {
        load_index(&self.store)
    }

    pub fn status(&self) -> Result<Option<IndexStatus>> {
        index_status(&self.store)
    }

    /// Delete the persisted index; returns whether one existed.
    pub fn reset(&self) -> Result<bool> {
        let removed = self.store.remove()?;
        if removed {
            info!(location = %self.store.location(), "index removed");
        }
        Ok(removed)
    }
}
