use newsqa_core::chunker::{split, Chunker};
use newsqa_core::config::{ChunkingConfig, Config, LlmProvider, Settings};
use newsqa_core::error::Error;
use newsqa_core::types::{excerpt, Document, Metric, Meta, UNKNOWN_SOURCE};

const PARIS: &str = "Paris is the capital of France. It has the Eiffel Tower.";

#[test]
fn scenario_document_splits_into_overlapping_chunks() {
    let docs = vec![Document::new(PARIS, "doc1")];
    let chunks = split(&docs, 50, 10).expect("split");

    assert!(chunks.len() >= 2, "56 characters cannot fit in one 50-character chunk");
    for (i, c) in chunks.iter().enumerate() {
        assert_eq!(c.source(), "doc1");
        assert_eq!(c.chunk_index, i);
        assert_eq!(c.total_chunks, chunks.len());
        assert!(c.text.chars().count() <= 50, "chunk too long: {:?}", c.text);
    }
    assert_eq!(chunks[0].text, "Paris is the capital of France. It has the Eiffel");
    assert_eq!(chunks[1].text, "the Eiffel Tower.");
}

#[test]
fn short_document_is_a_single_unmodified_chunk() {
    let text = "Hello  world.\n\nSecond   paragraph with odd   spacing.";
    let chunks = split(&[Document::new(text, "a.txt")], 200, 20).expect("split");
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].text, text);
}

#[test]
fn whitespace_only_document_yields_nothing() {
    let chunks = split(&[Document::new("  \n\n\t ", "blank")], 10, 2).expect("split");
    assert!(chunks.is_empty());
}

#[test]
fn character_level_overlap_repeats_previous_tail() {
    let doc = Document::new("abcdefghijklmnopqrstuvwxyz", "alpha");
    let chunks = split(&[doc], 10, 3).expect("split");
    let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["abcdefghij", "hijklmnopq", "opqrstuvwx", "vwxyz"]);
    for pair in chunks.windows(2) {
        let prev: Vec<char> = pair[0].text.chars().collect();
        let tail: String = prev[prev.len() - 3..].iter().collect();
        assert!(pair[1].text.starts_with(&tail));
    }
}

#[test]
fn paragraphs_are_preferred_cut_points() {
    let text = "para one words here.\n\npara two words here.";
    let chunks = split(&[Document::new(text, "p")], 25, 5).expect("split");
    let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["para one words here.", "para two words here."]);
}

#[test]
fn chunks_respect_size_and_document_boundaries() {
    let long_a: String = (0..200).map(|i| format!("alpha{} ", i % 17)).collect();
    let long_b: String = (0..150).map(|i| format!("b{} ", i)).collect();
    let docs = vec![Document::new(long_a, "a"), Document::new(long_b, "b")];
    let chunker = Chunker::new(ChunkingConfig::new(80, 15).expect("config")).expect("chunker");
    let chunks = chunker.split(&docs);

    assert!(chunks.iter().all(|c| c.text.chars().count() <= 80));
    let first_b = chunks.iter().position(|c| c.source() == "b").expect("b chunks");
    assert!(chunks[..first_b].iter().all(|c| c.source() == "a"));
    assert!(chunks[first_b..].iter().all(|c| c.source() == "b"));
    assert_eq!(chunks[first_b].chunk_index, 0, "ordinals restart per document");
    assert!(!chunks[first_b].text.contains("alpha"));
}

#[test]
fn chunking_is_deterministic() {
    let text: String = (0..300).map(|i| format!("word{} ", i * 7 % 31)).collect();
    let docs = vec![Document::new(text, "x").with_meta("page", "3")];
    let first = split(&docs, 120, 30).expect("split");
    let second = split(&docs, 120, 30).expect("split");
    assert_eq!(first, second);
    assert!(first.iter().all(|c| c.metadata.get("page").map(String::as_str) == Some("3")));
}

#[test]
fn overlap_must_be_smaller_than_size() {
    let err = split(&[Document::new(PARIS, "doc1")], 10, 10).expect_err("invalid");
    assert!(matches!(err, Error::InvalidConfig(_)));
    assert!(ChunkingConfig::new(0, 0).is_err());
}

#[test]
fn missing_source_falls_back_to_unknown() {
    let doc = Document { text: "orphan".into(), metadata: Meta::new() };
    assert_eq!(doc.source(), UNKNOWN_SOURCE);
}

#[test]
fn excerpt_respects_char_boundaries() {
    assert_eq!(excerpt("héllo wörld", 2), "hé");
    assert_eq!(excerpt("short", 300), "short");
}

#[test]
fn settings_defaults() {
    let settings = Config::from_toml_str("").settings().expect("settings");
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.chunking.chunk_size, 1000);
    assert_eq!(settings.chunking.chunk_overlap, 100);
    assert_eq!(settings.retrieval.top_k, 4);
    assert_eq!(settings.retrieval.excerpt_chars, 300);
    assert_eq!(settings.index.metric, Metric::Cosine);
    assert_eq!(settings.llm.model, "gemini-2.0-flash");
}

#[test]
fn settings_toml_overrides_merge_with_defaults() {
    let config = Config::from_toml_str(
        r#"
        [chunking]
        chunk_size = 50
        chunk_overlap = 10

        [index]
        workspace = "papers"
        metric = "inner_product"

        [llm]
        provider = "extractive"
        "#,
    );
    let settings = config.settings().expect("settings");
    assert_eq!(settings.chunking, ChunkingConfig { chunk_size: 50, chunk_overlap: 10 });
    assert_eq!(settings.index.workspace, "papers");
    assert_eq!(settings.index.metric, Metric::InnerProduct);
    assert_eq!(settings.llm.provider, LlmProvider::Extractive);
    assert_eq!(settings.retrieval.top_k, 4, "untouched sections keep defaults");
    assert_eq!(config.get::<usize>("chunking.chunk_size").expect("get"), 50);
}

#[test]
fn settings_validation_rejects_bad_values() {
    let bad_overlap = Config::from_toml_str("[chunking]\nchunk_size = 100\nchunk_overlap = 100\n");
    assert!(matches!(bad_overlap.settings(), Err(Error::InvalidConfig(_))));

    let bad_workspace = Config::from_toml_str("[index]\nworkspace = \"../elsewhere\"\n");
    assert!(matches!(bad_workspace.settings(), Err(Error::InvalidConfig(_))));

    let bad_k = Config::from_toml_str("[retrieval]\ntop_k = 0\n");
    assert!(matches!(bad_k.settings(), Err(Error::InvalidConfig(_))));
}

#[test]
fn error_kinds_are_distinct() {
    let errors = [
        Error::EmptyInput("x".into()),
        Error::CorruptIndex("x".into()),
        Error::DimensionMismatch { expected: 3, actual: 4 },
        Error::NoIndex,
        Error::Generation(anyhow::anyhow!("boom")),
        Error::Ingestion { origin: "u".into(), cause: anyhow::anyhow!("404") },
    ];
    let kinds: std::collections::HashSet<_> = errors.iter().map(Error::kind).collect();
    assert_eq!(kinds.len(), errors.len());
    assert_eq!(
        Error::DimensionMismatch { expected: 3, actual: 4 }.to_string(),
        "Embedding dimension mismatch: index expects 3, got 4"
    );
}
