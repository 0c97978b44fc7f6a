//! Durable homes for index snapshots.
//!
//! A store is a handle to exactly one snapshot slot; the workspace key picks
//! the slot, so several corpora can live side by side under one data
//! directory. Writes replace the previous snapshot atomically. There is no
//! locking: two processes building the same workspace at once race, and the
//! last rename wins.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;
use tracing::debug;

use newsqa_core::config::validate_workspace;
use newsqa_core::error::{Error, Result};

pub const SNAPSHOT_FILE: &str = "index.nqix";

pub trait IndexStore: Send + Sync {
    /// Human-readable location of the slot.
    fn location(&self) -> String;
    /// Current snapshot bytes, `None` when nothing was ever saved.
    fn load(&self) -> Result<Option<Vec<u8>>>;
    /// Replace the snapshot. Either the new bytes or the old ones are visible
    /// afterwards, never a mix.
    fn save(&self, bytes: &[u8]) -> Result<()>;
    /// Delete the snapshot; returns whether one existed.
    fn remove(&self) -> Result<bool>;

    fn exists(&self) -> Result<bool> {
        Ok(self.load()?.is_some())
    }
}

/// `<data_dir>/<workspace>/index.nqix` on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsIndexStore {
    path: PathBuf,
}

impl FsIndexStore {
    pub fn open(data_dir: &Path, workspace: &str) -> Result<Self> {
        validate_workspace(workspace)?;
        Ok(Self { path: data_dir.join(workspace).join(SNAPSHOT_FILE) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IndexStore for FsIndexStore {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, bytes: &[u8]) -> Result<()> {
        let dir = self
            .path
            .parent()
            .ok_or_else(|| {
                Error::InvalidConfig(format!("{} has no parent directory", self.path.display()))
            })?;
        fs::create_dir_all(dir)?;
        // temp file in the same directory so the rename stays on one filesystem
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| Error::Storage(e.error))?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "snapshot saved");
        Ok(())
    }

    fn remove(&self) -> Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn exists(&self) -> Result<bool> {
        Ok(self.path.is_file())
    }
}

/// Process-local slot, handy for tests and embedding the pipeline in another
/// program that persists elsewhere.
#[derive(Debug, Default)]
pub struct MemoryIndexStore {
    bytes: Mutex<Option<Vec<u8>>>,
}

impl MemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> Result<std::sync::MutexGuard<'_, Option<Vec<u8>>>> {
        self.bytes
            .lock()
            .map_err(|_| Error::Storage(io::Error::other("memory store lock poisoned")))
    }
}

impl IndexStore for MemoryIndexStore {
    fn location(&self) -> String {
        "memory".to_string()
    }

    fn load(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.slot()?.clone())
    }

    fn save(&self, bytes: &[u8]) -> Result<()> {
        *self.slot()? = Some(bytes.to_vec());
        Ok(())
    }

    fn remove(&self) -> Result<bool> {
        Ok(self.slot()?.take().is_some())
    }
}

impl<T: IndexStore + ?Sized> IndexStore for std::sync::Arc<T> {
    fn location(&self) -> String { (**self).location() }
    fn load(&self) -> Result<Option<Vec<u8>>> { (**self).load() }
    fn save(&self, bytes: &[u8]) -> Result<()> { (**self).save(bytes) }
    fn remove(&self) -> Result<bool> { (**self).remove() }
    fn exists(&self) -> Result<bool> { (**self).exists() }
}
