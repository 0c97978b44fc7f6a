//! Error taxonomy shared by every pipeline crate.
//!
//! Each variant is a distinct outcome the caller can branch on. Failures of
//! external collaborators (embedding model, language model, source loaders)
//! keep their original cause attached.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// No usable documents or chunks were supplied.
    #[error("No usable input: {0}")]
    EmptyInput(String),

    /// Persisted index bytes could not be decoded.
    #[error("Corrupt index snapshot: {0}")]
    CorruptIndex(String),

    /// The embedding space differs from the one the index was built with.
    #[error("Embedding dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A query arrived before any index was built.
    #[error("No index has been built yet")]
    NoIndex,

    #[error("Answer generation failed: {0:#}")]
    Generation(#[source] anyhow::Error),

    /// A single source could not be loaded.
    #[error("Failed to load '{origin}': {cause:#}")]
    Ingestion {
        origin: String,
        #[source]
        cause: anyhow::Error,
    },

    #[error("Embedding failed: {0:#}")]
    Embedding(#[source] anyhow::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// Stable short name of the variant, used by front ends for exit codes and
    /// machine-readable output.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::EmptyInput(_) => "empty_input",
            Error::CorruptIndex(_) => "corrupt_index",
            Error::DimensionMismatch { .. } => "dimension_mismatch",
            Error::NoIndex => "no_index",
            Error::Generation(_) => "generation",
            Error::Ingestion { .. } => "ingestion",
            Error::Embedding(_) => "embedding",
            Error::Storage(_) => "storage",
            Error::InvalidConfig(_) => "invalid_config",
            Error::InvalidArgument(_) => "invalid_argument",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
