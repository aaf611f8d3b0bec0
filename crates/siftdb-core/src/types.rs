//! Domain types used by the lexical and vector engines.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub type ChunkId = String;

/// A bounded span of source text, the unit of indexing and retrieval.
///
/// - `id`: globally unique chunk identifier, caller-supplied or derived
///   as `"{source}:{seq}"` during ingestion
/// - `source`: stable identity of the originating document
/// - `text`: the text payload of the chunk
/// - `seq`: position within the parent document
///
/// Chunks are immutable once created and owned exclusively by the
/// [`ChunkStore`](crate::store::ChunkStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub source: String,
    pub text: String,
    pub seq: usize,
}

/// Caller-facing result record, joined with the chunk store. The
/// engines themselves rank ephemeral `(ChunkId, score)` pairs; this is
/// what the caller receives after attribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryHit {
    pub id: ChunkId,
    pub source: String,
    pub text: String,
    pub score: f32,
}

/// Retrieval strategy for a single query.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum QueryMode {
    Vector,
    Lexical,
    Hybrid,
    HybridReranked,
}

/// Per-query parameters. `alpha` weighs the vector side of hybrid
/// fusion; `1 - alpha` weighs the lexical side.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QueryParams {
    pub k: usize,
    pub mode: QueryMode,
    pub alpha: f32,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self { k: 10, mode: QueryMode::Hybrid, alpha: 0.5 }
    }
}

/// One `(source, text)` ingestion record. Producing these (e.g. document
/// parsing and splitting) is the caller's responsibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceText {
    pub source: String,
    pub text: String,
}

impl SourceText {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self { source: source.into(), text: text.into() }
    }
}

/// Partial-success summary of an ingestion run. A failed chunk never
/// aborts the run; it is listed here and skipped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestReport {
    pub indexed: usize,
    pub failures: Vec<IngestFailure>,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestFailure {
    pub source: String,
    pub error: String,
}

/// Cooperative cancellation flag checked between ingestion batches.
///
/// Cancelling aborts before the next batch commit; a partially embedded
/// batch is never committed.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
