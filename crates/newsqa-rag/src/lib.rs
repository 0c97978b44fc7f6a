//! newsqa-rag
//!
//! Retrieval-augmented question answering over a persisted vector index:
//! [`Retriever`] finds chunks, [`AnswerEngine`] turns them into an answer,
//! [`IndexLifecycleManager`] owns the snapshot of one workspace and
//! [`Pipeline`] ties loaders, index and answering into `build_index` / `ask`.

pub mod answer;
pub mod embedder;
pub mod lifecycle;
pub mod pipeline;
pub mod retriever;

pub use answer::AnswerEngine;
pub use embedder::EmbedderSlot;
pub use lifecycle::{index_status, load_index, IndexLifecycleManager, IndexStatus};
pub use pipeline::Pipeline;
pub use retriever::Retriever;
