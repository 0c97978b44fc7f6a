use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use newsqa_core::config::{ChunkingConfig, LlmProvider, RetrievalConfig, Settings};
use newsqa_core::error::Error;
use newsqa_core::traits::{DocumentLoader, Embedder, Generator};
use newsqa_core::types::{BuildMode, Document, Source};
use newsqa_embed::HashEmbedder;
use newsqa_llm::ExtractiveGenerator;
use newsqa_rag::Pipeline;
use newsqa_vector::{IndexStore, MemoryIndexStore};

const PARIS: &str = "Paris is the capital of France. It has the Eiffel Tower.";

/// Serves canned documents by source name; any other source fails to load.
struct MapLoader {
    docs: HashMap<String, Vec<Document>>,
}

impl MapLoader {
    fn new(entries: &[(&str, &str)]) -> Self {
        let docs = entries
            .iter()
            .map(|(source, text)| (source.to_string(), vec![Document::new(*text, *source)]))
            .collect();
        Self { docs }
    }
}

impl DocumentLoader for MapLoader {
    fn load(&self, source: &Source) -> anyhow::Result<Vec<Document>> {
        self.docs
            .get(&source.to_string())
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("connection refused"))
    }
}

struct FailingGenerator;

impl Generator for FailingGenerator {
    fn generate(&self, _question: &str, _context: &str) -> anyhow::Result<String> {
        anyhow::bail!("quota exceeded")
    }
}

fn src(name: &str) -> Source {
    Source::Text(PathBuf::from(name))
}

fn settings() -> Settings {
    Settings {
        chunking: ChunkingConfig::new(50, 10).expect("chunking"),
        retrieval: RetrievalConfig { top_k: 4, excerpt_chars: 20 },
        ..Settings::default()
    }
}

fn pipeline_with(
    store: Arc<MemoryIndexStore>,
    loader: MapLoader,
    embedder: Arc<dyn Embedder>,
    generator: Box<dyn Generator>,
) -> Pipeline<Arc<MemoryIndexStore>> {
    Pipeline::assemble(&settings(), store, Box::new(loader), embedder, generator).expect("pipeline")
}

fn pipeline(store: Arc<MemoryIndexStore>, loader: MapLoader) -> Pipeline<Arc<MemoryIndexStore>> {
    let embedder = Arc::new(HashEmbedder::new(64));
    pipeline_with(store, loader, embedder, Box::new(ExtractiveGenerator::new()))
}

fn news_loader() -> MapLoader {
    MapLoader::new(&[
        ("doc1", PARIS),
        ("doc2", "The Berlin Wall fell in 1989. Germany reunified a year later."),
        ("blank", "   \n\n  "),
    ])
}

#[test]
fn ask_before_build_is_no_index() {
    let p = pipeline(Arc::new(MemoryIndexStore::new()), news_loader());
    assert!(matches!(p.ask("What is the capital of France?"), Err(Error::NoIndex)));
    assert!(p.status().expect("status").is_none());
}

#[test]
fn paris_scenario() {
    let store = Arc::new(MemoryIndexStore::new());
    let p = pipeline(Arc::clone(&store), news_loader());

    let report = p.build_index(&[src("doc1")], false).expect("build");
    assert_eq!(report.outcome.mode, BuildMode::Created);
    assert!(report.outcome.chunks_added >= 2);
    assert!(report.failed_sources.is_empty());

    let result = p.ask("What is the capital of France?").expect("ask");
    assert!(result.answer.contains("Paris"), "{}", result.answer);
    assert!(result.sources.iter().any(|s| s.source == "doc1"));
    assert!(result.sources.iter().all(|s| s.excerpt.chars().count() <= 20));
}

#[test]
fn append_on_empty_workspace_equals_create() {
    let appended_store = Arc::new(MemoryIndexStore::new());
    let created_store = Arc::new(MemoryIndexStore::new());
    let appended = pipeline(Arc::clone(&appended_store), news_loader());
    let created = pipeline(Arc::clone(&created_store), news_loader());

    let a = appended.build_index(&[src("doc1"), src("doc2")], true).expect("append");
    let c = created.build_index(&[src("doc1"), src("doc2")], false).expect("create");
    assert_eq!(a.outcome, c.outcome);
    assert_eq!(a.outcome.mode, BuildMode::Created);

    let a_index = appended.lifecycle().current().expect("load").expect("index");
    let c_index = created.lifecycle().current().expect("load").expect("index");
    assert_eq!(a_index.entries(), c_index.entries());
}

#[test]
fn append_extends_and_rebuild_replaces() {
    let p = pipeline(Arc::new(MemoryIndexStore::new()), news_loader());
    let first = p.build_index(&[src("doc1")], false).expect("first");
    let second = p.build_index(&[src("doc2")], true).expect("second");
    assert_eq!(second.outcome.mode, BuildMode::Appended);
    assert_eq!(
        second.outcome.total_entries,
        first.outcome.chunks_added + second.outcome.chunks_added
    );

    let status = p.status().expect("status").expect("present");
    assert_eq!(status.sources, vec!["doc1".to_string(), "doc2".to_string()]);
    assert_eq!(status.dim, 64);
    assert!(status.updated_at >= status.created_at);

    let replaced = p.build_index(&[src("doc2")], false).expect("replace");
    assert_eq!(replaced.outcome.mode, BuildMode::Created);
    assert_eq!(replaced.outcome.total_entries, second.outcome.chunks_added);
    let result = p.ask("What is the capital of France?").expect("ask");
    assert!(result.sources.iter().all(|s| s.source == "doc2"));
}

#[test]
fn empty_input_leaves_snapshot_untouched() {
    let store = Arc::new(MemoryIndexStore::new());
    let p = pipeline(Arc::clone(&store), news_loader());
    p.build_index(&[src("doc1")], false).expect("build");
    let before = store.load().expect("load");

    assert!(matches!(p.build_index(&[], true), Err(Error::EmptyInput(_))));
    assert!(matches!(p.build_index(&[src("blank")], false), Err(Error::EmptyInput(_))));
    assert!(matches!(p.lifecycle().build(&[], false), Err(Error::EmptyInput(_))));
    assert_eq!(store.load().expect("load"), before);
}

#[test]
fn partial_ingest_failure_is_reported() {
    let p = pipeline(Arc::new(MemoryIndexStore::new()), news_loader());
    let report = p.build_index(&[src("doc1"), src("offline")], false).expect("build");
    assert_eq!(report.failed_sources.len(), 1);
    assert_eq!(report.failed_sources[0].source, "offline");
    assert!(report.failed_sources[0].reason.contains("connection refused"));
    assert_eq!(report.outcome.documents, 1);
}

#[test]
fn all_sources_failing_is_empty_input() {
    let store = Arc::new(MemoryIndexStore::new());
    let p = pipeline(Arc::clone(&store), news_loader());
    match p.build_index(&[src("offline"), src("also-offline")], false) {
        Err(Error::EmptyInput(msg)) => {
            assert!(msg.contains("offline: connection refused"), "{msg}");
            assert!(msg.contains("also-offline"), "{msg}");
        }
        other => panic!("unexpected: {other:?}"),
    }
    assert!(store.load().expect("load").is_none());
}

#[test]
fn generation_failure_is_surfaced() {
    let p = pipeline_with(
        Arc::new(MemoryIndexStore::new()),
        news_loader(),
        Arc::new(HashEmbedder::new(64)),
        Box::new(FailingGenerator),
    );
    p.build_index(&[src("doc1")], false).expect("build");
    let err = p.ask("What is the capital of France?").expect_err("generation fails");
    assert!(matches!(err, Error::Generation(_)));
    assert!(err.to_string().contains("quota exceeded"));
}

#[test]
fn dimension_mismatch_keeps_old_snapshot() {
    let store = Arc::new(MemoryIndexStore::new());
    pipeline(Arc::clone(&store), news_loader()).build_index(&[src("doc1")], false).expect("build");
    let before = store.load().expect("load");

    let narrow = pipeline_with(
        Arc::clone(&store),
        news_loader(),
        Arc::new(HashEmbedder::new(32)),
        Box::new(ExtractiveGenerator::new()),
    );
    assert!(matches!(
        narrow.ask("What is the capital of France?"),
        Err(Error::DimensionMismatch { expected: 64, actual: 32 })
    ));
    assert!(matches!(
        narrow.build_index(&[src("doc2")], true),
        Err(Error::DimensionMismatch { expected: 64, actual: 32 })
    ));
    assert_eq!(store.load().expect("load"), before);
}

#[test]
fn corrupt_snapshot_is_not_overwritten_by_append() {
    let store = Arc::new(MemoryIndexStore::new());
    store.save(b"definitely not an index").expect("seed");
    let p = pipeline(Arc::clone(&store), news_loader());

    assert!(matches!(p.build_index(&[src("doc1")], true), Err(Error::CorruptIndex(_))));
    assert_eq!(store.load().expect("load").as_deref(), Some(&b"definitely not an index"[..]));
    assert!(matches!(p.ask("anything?"), Err(Error::CorruptIndex(_))));

    // an explicit rebuild replaces it
    let report = p.build_index(&[src("doc1")], false).expect("rebuild");
    assert_eq!(report.outcome.mode, BuildMode::Created);
    assert!(p.ask("What is the capital of France?").is_ok());
}

#[test]
fn blank_question_is_rejected() {
    let p = pipeline(Arc::new(MemoryIndexStore::new()), news_loader());
    assert!(matches!(p.ask("   "), Err(Error::InvalidArgument(_))));
}

#[test]
fn reset_removes_the_index() {
    let p = pipeline(Arc::new(MemoryIndexStore::new()), news_loader());
    p.build_index(&[src("doc1")], false).expect("build");
    assert!(p.lifecycle().reset().expect("reset"));
    assert!(!p.lifecycle().reset().expect("reset"));
    assert!(matches!(p.ask("What is the capital of France?"), Err(Error::NoIndex)));
}

#[test]
fn from_settings_runs_offline_end_to_end() {
    let tmp = tempfile::TempDir::new().expect("tmp");
    let article = tmp.path().join("article.txt");
    std::fs::write(&article, PARIS).expect("write");

    let mut settings = settings();
    settings.index.data_dir = tmp.path().join("data").display().to_string();
    settings.index.workspace = "e2e".into();
    settings.embedding.use_fake = true;
    settings.embedding.fake_dim = 48;
    settings.llm.provider = LlmProvider::Extractive;

    let p = Pipeline::from_settings(&settings).expect("pipeline");
    p.build_index(&[Source::Text(article.clone())], false).expect("build");
    assert!(tmp.path().join("data/e2e/index.nqix").is_file());

    // a second process sees the same snapshot
    let again = Pipeline::from_settings(&settings).expect("pipeline");
    let result = again.ask("What is the capital of France?").expect("ask");
    assert!(result.answer.contains("Paris"));
    assert_eq!(result.sources[0].source, article.display().to_string());
}

#[test]
fn missing_model_still_reports_no_index() {
    let tmp = tempfile::TempDir::new().expect("tmp");
    let mut settings = settings();
    settings.index.data_dir = tmp.path().join("data").display().to_string();
    settings.embedding.use_fake = false;
    settings.embedding.model_dir = Some(tmp.path().join("no-model").display().to_string());
    settings.llm.provider = LlmProvider::Extractive;

    let p = Pipeline::from_settings(&settings).expect("pipeline without loading the model");
    assert!(matches!(p.ask("What is the capital of France?"), Err(Error::NoIndex)));
    assert!(p.status().expect("status").is_none());
}
