//! Recursive character splitter.
//!
//! Text is cut on the coarsest separator present (paragraph, line, word,
//! character) and adjacent pieces are merged back up to `chunk_size`
//! characters. When a chunk is emitted, its trailing pieces totalling at most
//! `chunk_overlap` characters are carried into the next chunk of the same
//! document.

use std::collections::VecDeque;
use tracing::debug;

use crate::config::ChunkingConfig;
use crate::error::Result;
use crate::types::{Chunk, Document};

const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Default for Chunker {
    fn default() -> Self {
        Self { config: ChunkingConfig::default() }
    }
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> ChunkingConfig {
        self.config
    }

    /// Split every document in order. Chunks never span two documents.
    pub fn split(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for document in documents {
            let pieces = self.split_text(&document.text);
            let total_chunks = pieces.len();
            let source = document.source();
            for (chunk_index, text) in pieces.into_iter().enumerate() {
                chunks.push(Chunk {
                    id: chunk_id(source, chunk_index, &text),
                    text,
                    metadata: document.metadata.clone(),
                    chunk_index,
                    total_chunks,
                });
            }
        }
        debug!(documents = documents.len(), chunks = chunks.len(), "split documents");
        chunks
    }

    /// Split a single text. A text whose trimmed length fits in one chunk is
    /// returned as-is (trimmed); whitespace-only text yields nothing.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }
        if char_len(trimmed) <= self.config.chunk_size {
            return vec![trimmed.to_string()];
        }
        self.split_recursive(trimmed, &SEPARATORS)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let (separator, rest) = pick_separator(text, separators);
        let splits: Vec<&str> = if separator.is_empty() {
            text.char_indices().map(|(i, c)| &text[i..i + c.len_utf8()]).collect()
        } else {
            text.split(separator).filter(|s| !s.is_empty()).collect()
        };

        let mut out = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();
        for piece in splits {
            if char_len(piece) < self.config.chunk_size {
                fitting.push(piece);
                continue;
            }
            if !fitting.is_empty() {
                out.extend(self.merge(&fitting, separator));
                fitting.clear();
            }
            if rest.is_empty() {
                out.push(piece.to_string());
            } else {
                out.extend(self.split_recursive(piece, rest));
            }
        }
        if !fitting.is_empty() {
            out.extend(self.merge(&fitting, separator));
        }
        out
    }

    fn merge(&self, pieces: &[&str], separator: &str) -> Vec<String> {
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;
        let sep_len = char_len(separator);

        let mut docs = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;
        for &piece in pieces {
            let len = char_len(piece);
            let joiner = if current.is_empty() { 0 } else { sep_len };
            if total + len + joiner > size && !current.is_empty() {
                if let Some(doc) = join_trimmed(&current, separator) {
                    docs.push(doc);
                }
                // keep only a tail of at most `overlap` characters that still
                // leaves room for the incoming piece
                while let Some(first) = current.front() {
                    if total == 0 || (total <= overlap && total + len + sep_len <= size) {
                        break;
                    }
                    let drop = char_len(first) + if current.len() > 1 { sep_len } else { 0 };
                    total = total.saturating_sub(drop);
                    current.pop_front();
                }
            }
            current.push_back(piece);
            total += len + if current.len() > 1 { sep_len } else { 0 };
        }
        if let Some(doc) = join_trimmed(&current, separator) {
            docs.push(doc);
        }
        docs
    }
}

/// Convenience wrapper over [`Chunker`] for one-off calls.
pub fn split(documents: &[Document], size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    let chunker = Chunker::new(ChunkingConfig::new(size, overlap)?)?;
    Ok(chunker.split(documents))
}

fn pick_separator<'a>(text: &str, separators: &'a [&'a str]) -> (&'a str, &'a [&'a str]) {
    for (i, sep) in separators.iter().enumerate() {
        if sep.is_empty() || text.contains(sep) {
            return (sep, &separators[i + 1..]);
        }
    }
    ("", &[])
}

fn join_trimmed(pieces: &VecDeque<&str>, separator: &str) -> Option<String> {
    let joined = pieces.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn chunk_id(source: &str, chunk_index: usize, text: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(source.as_bytes());
    hasher.update(&[0]);
    hasher.update(text.as_bytes());
    let hex = hasher.finalize().to_hex();
    format!("{}:{}", &hex[..16], chunk_index)
}
