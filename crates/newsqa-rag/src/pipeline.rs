//! The two-call query surface: build an index from sources, ask questions.

use std::sync::Arc;
use tracing::{info, warn};

use newsqa_core::chunker::Chunker;
use newsqa_core::config::Settings;
use newsqa_core::error::{Error, Result};
use newsqa_core::traits::{DocumentLoader, Embedder, Generator};
use newsqa_core::types::{BuildReport, Document, IngestFailure, QueryResult, Source};
use newsqa_ingest::SourceLoader;
use newsqa_llm::DeferredGenerator;
use newsqa_vector::{EmbedOptions, FsIndexStore, IndexStore};

use crate::answer::AnswerEngine;
use crate::embedder::EmbedderSlot;
use crate::lifecycle::{IndexLifecycleManager, IndexStatus};

pub struct Pipeline<S: IndexStore = FsIndexStore> {
    loader: Box<dyn DocumentLoader>,
    lifecycle: IndexLifecycleManager<S>,
    engine: AnswerEngine,
}

impl Pipeline<FsIndexStore> {
    /// Wire the real collaborators: HTTP/PDF/text loaders, the configured
    /// embedder and generator (both loaded on first use), and the
    /// workspace's snapshot under `index.data_dir`.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        settings.validate()?;
        let store = FsIndexStore::open(&settings.index.data_dir(), &settings.index.workspace)?;
        let loader = SourceLoader::new(&settings.ingest)
            .map_err(|e| Error::InvalidConfig(format!("{e:#}")))?;
        let embedder = Arc::new(EmbedderSlot::deferred(settings.embedding.clone()));
        let generator = DeferredGenerator::new(settings.llm.clone());
        Self::assemble_with_slot(settings, store, Box::new(loader), embedder, Box::new(generator))
    }
}

impl<S: IndexStore> Pipeline<S> {
    pub fn new(
        loader: Box<dyn DocumentLoader>,
        lifecycle: IndexLifecycleManager<S>,
        engine: AnswerEngine,
    ) -> Self {
        Self { loader, lifecycle, engine }
    }

    /// Build from explicit collaborators, taking chunking, metric and
    /// retrieval parameters from `settings`.
    pub fn assemble(
        settings: &Settings,
        store: S,
        loader: Box<dyn DocumentLoader>,
        embedder: Arc<dyn Embedder>,
        generator: Box<dyn Generator>,
    ) -> Result<Self> {
        let embedder = Arc::new(EmbedderSlot::ready(embedder));
        Self::assemble_with_slot(settings, store, loader, embedder, generator)
    }

    fn assemble_with_slot(
        settings: &Settings,
        store: S,
        loader: Box<dyn DocumentLoader>,
        embedder: Arc<EmbedderSlot>,
        generator: Box<dyn Generator>,
    ) -> Result<Self> {
        let chunker = Chunker::new(settings.chunking)?;
        let options = EmbedOptions {
            batch_size: settings.embedding.batch_size,
            show_progress: settings.index.show_progress,
        };
        let lifecycle =
            IndexLifecycleManager::new(store, Arc::clone(&embedder), chunker, settings.index.metric)
                .with_options(options);
        let engine = AnswerEngine::new(embedder, generator, settings.retrieval);
        Ok(Self::new(loader, lifecycle, engine))
    }

    pub fn lifecycle(&self) -> &IndexLifecycleManager<S> {
        &self.lifecycle
    }

    /// Load every source, then create or extend the index.
    ///
    /// A source that fails to load is recorded in the report and skipped; the
    /// build only fails for ingestion when nothing at all could be loaded.
    pub fn build_index(&self, sources: &[Source], append: bool) -> Result<BuildReport> {
        if sources.is_empty() {
            return Err(Error::EmptyInput("no sources given".into()));
        }
        let mut documents: Vec<Document> = Vec::new();
        let mut failed_sources = Vec::new();
        for source in sources {
            match self.load_source(source) {
                Ok(docs) if docs.is_empty() => {
                    warn!(%source, "source yielded no content");
                    failed_sources.push(IngestFailure {
                        source: source.to_string(),
                        reason: "no content could be loaded".into(),
                    });
                }
                Ok(docs) => documents.extend(docs),
                Err(e) => {
                    warn!(%source, error = %e, "skipping source");
                    let reason = match e {
                        Error::Ingestion { cause, .. } => format!("{cause:#}"),
                        other => other.to_string(),
                    };
                    failed_sources.push(IngestFailure { source: source.to_string(), reason });
                }
            }
        }

        if documents.is_empty() {
            let detail: Vec<String> =
                failed_sources.iter().map(|f| format!("{}: {}", f.source, f.reason)).collect();
            let message = format!("no documents could be loaded ({})", detail.join("; "));
            return Err(Error::EmptyInput(message));
        }

        let outcome = self.lifecycle.build(&documents, append)?;
        info!(
            loaded = sources.len() - failed_sources.len(),
            failed = failed_sources.len(),
            "build finished"
        );
        Ok(BuildReport { outcome, failed_sources })
    }

    pub fn ask(&self, question: &str) -> Result<QueryResult> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::InvalidArgument("question is empty".into()));
        }
        let index = self.lifecycle.current()?;
        self.engine.answer(question, index.as_ref())
    }

    pub fn status(&self) -> Result<Option<IndexStatus>> {
        self.lifecycle.status()
    }

    fn load_source(&self, source: &Source) -> Result<Vec<Document>> {
        self.loader
            .load(source)
            .map_err(|cause| Error::Ingestion { origin: source.to_string(), cause })
    }
}
