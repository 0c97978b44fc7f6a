use crate::types::{Document, Source};

/// Text to vector. Implementations must return vectors of exactly `dim()`
/// components for every input, and the same vector for the same text.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the model (e.g. `local:all-MiniLM-L6-v2:d384`).
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed_query(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector for the query"))
    }
}

/// (question, context) to answer. Calls may be slow, costly and non-idempotent.
pub trait Generator: Send + Sync {
    fn generate(&self, question: &str, context: &str) -> anyhow::Result<String>;
}

/// Turns a source into an ordered list of documents.
pub trait DocumentLoader: Send + Sync {
    fn load(&self, source: &Source) -> anyhow::Result<Vec<Document>>;
}

impl<T: Embedder + ?Sized> Embedder for Box<T> {
    fn id(&self) -> &str { (**self).id() }
    fn dim(&self) -> usize { (**self).dim() }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        (**self).embed_batch(texts)
    }
}

impl<T: Generator + ?Sized> Generator for Box<T> {
    fn generate(&self, question: &str, context: &str) -> anyhow::Result<String> {
        (**self).generate(question, context)
    }
}
