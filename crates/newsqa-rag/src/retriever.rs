use newsqa_core::error::{Error, Result};
use newsqa_core::traits::Embedder;
use newsqa_core::types::Chunk;
use newsqa_vector::{ScoredChunk, VectorIndex};

/// Query text to nearest chunks, using the embedder the index was built with.
pub struct Retriever<'a> {
    index: &'a VectorIndex,
    embedder: &'a dyn Embedder,
}

impl<'a> Retriever<'a> {
    pub fn new(index: &'a VectorIndex, embedder: &'a dyn Embedder) -> Self {
        Self { index, embedder }
    }

    pub fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Chunk>> {
        Ok(self.retrieve_scored(query, k)?.into_iter().map(|hit| hit.chunk).collect())
    }

    pub fn retrieve_scored(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        let vector = self.embedder.embed_query(query).map_err(Error::Embedding)?;
        self.index.search(&vector, k)
    }
}
