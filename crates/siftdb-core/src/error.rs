//! Error taxonomy shared across the engine crates.
//!
//! Every fallible operation in the store, the indexes and the providers
//! returns this error type so callers can tell "no matches" apart from
//! "search failed".

use std::time::Duration;
use thiserror::Error;

use crate::types::ChunkId;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Chunk not found: {0}")]
    NotFound(ChunkId),

    #[error("Duplicate chunk id: {0}")]
    DuplicateId(ChunkId),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Embedding provider rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
