//! newsqa-core
//!
//! Shared vocabulary of the question-answering pipeline: documents, chunks,
//! the error taxonomy, layered configuration, the recursive chunker and the
//! traits behind which the embedding model, language model and source loaders
//! sit.

pub mod chunker;
pub mod config;
pub mod error;
pub mod logging;
pub mod traits;
pub mod types;

pub use chunker::Chunker;
pub use error::{Error, Result};
