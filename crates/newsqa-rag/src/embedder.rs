use std::sync::{Arc, Mutex, PoisonError};

use newsqa_core::config::EmbeddingConfig;
use newsqa_core::error::{Error, Result};
use newsqa_core::traits::Embedder;
use newsqa_embed::get_default_embedder;

/// Embedder shared by the lifecycle manager and the answer engine.
///
/// A deferred slot loads the configured model on first use, so asking
/// before any build reports a missing index instead of a missing model.
pub struct EmbedderSlot {
    config: Option<EmbeddingConfig>,
    loaded: Mutex<Option<Arc<dyn Embedder>>>,
}

impl EmbedderSlot {
    pub fn ready(embedder: Arc<dyn Embedder>) -> Self {
        Self { config: None, loaded: Mutex::new(Some(embedder)) }
    }

    pub fn deferred(config: EmbeddingConfig) -> Self {
        Self { config: Some(config), loaded: Mutex::new(None) }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// The embedder, loading it from the configuration the first time.
    ///
    /// A failed load is not cached; the next call tries again.
    pub fn get(&self) -> Result<Arc<dyn Embedder>> {
        let mut loaded = self.loaded.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(embedder) = loaded.as_ref() {
            return Ok(Arc::clone(embedder));
        }
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| Error::InvalidConfig("no embedder configured".into()))?;
        let embedder: Arc<dyn Embedder> =
            Arc::from(get_default_embedder(config).map_err(Error::Embedding)?);
        *loaded = Some(Arc::clone(&embedder));
        Ok(embedder)
    }
}
