//! Retrieval plus generation.

use std::sync::Arc;
use tracing::{debug, info};

use newsqa_core::config::RetrievalConfig;
use newsqa_core::error::{Error, Result};
use newsqa_core::traits::Generator;
use newsqa_core::types::{excerpt, QueryResult, SourceExcerpt};
use newsqa_vector::VectorIndex;

use crate::embedder::EmbedderSlot;
use crate::retriever::Retriever;

/// Chunks handed to the generator are separated by a blank line.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

pub struct AnswerEngine {
    embedder: Arc<EmbedderSlot>,
    generator: Box<dyn Generator>,
    retrieval: RetrievalConfig,
}

impl AnswerEngine {
    pub fn new(
        embedder: Arc<EmbedderSlot>,
        generator: Box<dyn Generator>,
        retrieval: RetrievalConfig,
    ) -> Self {
        Self { embedder, generator, retrieval }
    }

    pub fn retrieval(&self) -> &RetrievalConfig {
        &self.retrieval
    }

    pub fn answer(&self, question: &str, index: Option<&VectorIndex>) -> Result<QueryResult> {
        let index = index.ok_or(Error::NoIndex)?;
        let embedder = self.embedder.get()?;
        index.check_embedder(embedder.as_ref())?;

        let top_k = self.retrieval.top_k;
        let chunks = Retriever::new(index, embedder.as_ref()).retrieve(question, top_k)?;
        debug!(retrieved = chunks.len(), top_k, "retrieved context");
        let context = chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);

        let answer = self.generator.generate(question, &context).map_err(Error::Generation)?;
        let sources = chunks
            .iter()
            .map(|c| SourceExcerpt {
                source: c.source().to_string(),
                excerpt: excerpt(&c.text, self.retrieval.excerpt_chars),
            })
            .collect();
        info!(sources = chunks.len(), "answered question");
        Ok(QueryResult { answer, sources })
    }
}
