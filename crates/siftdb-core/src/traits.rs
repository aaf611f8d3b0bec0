use crate::error::Result;
use crate::types::{CancelFlag, ChunkId, IngestReport, QueryHit, QueryParams, SourceText};

pub trait EmbedProvider: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `hash:xx64:d384`).
    fn embedder_id(&self) -> &str;
    /// Embedding dimensionality (D).
    fn dim(&self) -> usize;
    /// Maximum input length in tokens.
    fn max_len(&self) -> usize;
    /// Compute embeddings for a batch of input texts. Must be
    /// deterministic for identical input within a provider version.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

impl std::fmt::Debug for dyn EmbedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbedProvider").field("embedder_id", &self.embedder_id()).finish()
    }
}

pub trait LexicalIndexer: Send + Sync {
    fn insert(&mut self, id: ChunkId, text: &str);
    fn remove(&mut self, id: &str) -> bool;
    fn search(&self, query: &str, k: usize) -> Vec<(ChunkId, f32)>;
}

pub trait VectorIndexer: Send + Sync {
    fn dim(&self) -> usize;
    fn insert(&mut self, id: ChunkId, vector: Vec<f32>) -> Result<()>;
    fn remove(&mut self, id: &str) -> bool;
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<(ChunkId, f32)>>;
}

/// A candidate handed to the second-stage scorer.
#[derive(Debug, Clone, Copy)]
pub struct RerankCandidate<'a> {
    pub id: &'a str,
    pub text: &'a str,
}

/// Second-stage precision scorer applied to the head of a fused result
/// list (e.g. a cross-encoder stand-in).
pub trait Reranker: Send + Sync {
    /// Score each candidate against the query; one score per candidate,
    /// in input order.
    fn rescore(&self, query: &str, candidates: &[RerankCandidate<'_>]) -> Result<Vec<f32>>;
}

pub trait SearchEngine: Send + Sync {
    fn ingest(&self, records: &[SourceText], cancel: &CancelFlag) -> Result<IngestReport>;
    fn query(&self, query: &str, params: &QueryParams) -> Result<Vec<QueryHit>>;
}
