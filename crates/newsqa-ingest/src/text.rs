//! Plain-text files, or every text file under a directory.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use newsqa_core::types::Document;

const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "markdown", "text"];

pub fn load_text(path: &Path) -> Result<Vec<Document>> {
    if path.is_dir() {
        let files = list_text_files(path);
        debug!(dir = %path.display(), files = files.len(), "loading text directory");
        let mut docs = Vec::with_capacity(files.len());
        for file in files {
            match read_file(&file) {
                Ok(doc) => docs.push(doc),
                Err(e) => warn!(file = %file.display(), error = %e, "skipping unreadable file"),
            }
        }
        return Ok(docs);
    }
    Ok(vec![read_file(path)?])
}

fn read_file(path: &Path) -> Result<Document> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    // lossy: a stray invalid byte should not cost the whole article
    let text = String::from_utf8_lossy(&bytes).into_owned();
    Ok(Document::new(text, path.display().to_string()))
}

/// Text files under `root`, sorted so builds are reproducible.
fn list_text_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|s| s.to_str())
                .is_some_and(|ext| TEXT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        })
        .collect();
    files.sort();
    files
}
