//! newsqa-vector
//!
//! In-memory similarity index over chunk embeddings, its snapshot format, and
//! the stores that keep one snapshot per workspace.

pub mod index;
pub mod snapshot;
pub mod store;

pub use index::{EmbedOptions, IndexEntry, ScoredChunk, VectorIndex};
pub use store::{FsIndexStore, IndexStore, MemoryIndexStore};
