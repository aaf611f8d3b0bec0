//! siftdb-hybrid
//!
//! The hybrid engine: owns the chunk store and both indexes behind a
//! single read-write lock (one writer at a time, readers share a
//! consistent snapshot), embeds through an [`EmbedProvider`], and serves
//! the four query modes. Fusion and reranking live in `fusion` and
//! `rerank`.

pub mod fusion;
pub mod rerank;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, instrument, warn};

use siftdb_core::config::EngineConfig;
use siftdb_core::error::{Error, Result};
use siftdb_core::store::ChunkStore;
use siftdb_core::traits::{
    EmbedProvider, LexicalIndexer, Reranker, RerankCandidate, SearchEngine, VectorIndexer,
};
use siftdb_core::types::{
    CancelFlag, Chunk, ChunkId, IngestFailure, IngestReport, QueryHit, QueryMode, QueryParams,
    SourceText,
};
use siftdb_lexical::LexicalIndex;
use siftdb_vector::VectorIndex;

pub use rerank::OverlapReranker;

/// Engine wired with the owned in-memory indexes.
pub type DefaultEngine = HybridSearchEngine<LexicalIndex, VectorIndex>;

/// Build a [`DefaultEngine`] whose vector index matches the provider's
/// dimension.
pub fn build_engine(embedder: Arc<dyn EmbedProvider>, config: EngineConfig) -> Result<DefaultEngine> {
    let vector = VectorIndex::new(embedder.dim());
    HybridSearchEngine::new(LexicalIndex::new(), vector, embedder, config)
}

pub struct HybridSearchEngine<L, V>
where
    L: LexicalIndexer,
    V: VectorIndexer,
{
    state: RwLock<IndexState<L, V>>,
    embedder: Arc<dyn EmbedProvider>,
    reranker: Option<Arc<dyn Reranker>>,
    config: EngineConfig,
}

struct IndexState<L, V> {
    store: ChunkStore,
    lexical: L,
    vector: V,
    next_seq: HashMap<String, usize>,
}

impl<L, V> HybridSearchEngine<L, V>
where
    L: LexicalIndexer,
    V: VectorIndexer,
{
    pub fn new(
        lexical: L,
        vector: V,
        embedder: Arc<dyn EmbedProvider>,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        if embedder.dim() != vector.dim() {
            return Err(Error::DimensionMismatch {
                expected: vector.dim(),
                actual: embedder.dim(),
            });
        }
        Ok(Self {
            state: RwLock::new(IndexState {
                store: ChunkStore::new(),
                lexical,
                vector,
                next_seq: HashMap::new(),
            }),
            embedder,
            reranker: None,
            config,
        })
    }

    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Embed and index `records` in batches. Each record becomes one
    /// chunk with id `"{source}:{seq}"`, seq continuing per source across
    /// calls. A batch whose embedding fails is reported per record and
    /// skipped; the run carries on. Cancellation is honored between
    /// batches, never mid-commit.
    #[instrument(skip_all, fields(records = records.len()))]
    pub fn ingest(&self, records: &[SourceText], cancel: &CancelFlag) -> Result<IngestReport> {
        let mut report = IngestReport::default();
        for batch in records.chunks(self.config.batch_size) {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let texts: Vec<String> = batch.iter().map(|r| r.text.clone()).collect();
            // Embedding runs outside the writer lock; the batch is
            // committed only once all of its embeddings are in hand.
            let embeddings = match self.embedder.embed_batch(&texts) {
                Ok(embeddings) if embeddings.len() == batch.len() => embeddings,
                Ok(embeddings) => {
                    let error = format!(
                        "provider returned {} embeddings for {} inputs",
                        embeddings.len(),
                        batch.len()
                    );
                    warn!("{error}");
                    for record in batch {
                        report
                            .failures
                            .push(IngestFailure { source: record.source.clone(), error: error.clone() });
                    }
                    continue;
                }
                Err(e) => {
                    warn!("embedding batch failed: {e}");
                    for record in batch {
                        report
                            .failures
                            .push(IngestFailure { source: record.source.clone(), error: e.to_string() });
                    }
                    continue;
                }
            };
            let mut state = self.state.write().expect("engine lock poisoned");
            for (record, embedding) in batch.iter().zip(embeddings) {
                let seq = *state.next_seq.get(&record.source).unwrap_or(&0);
                let chunk = Chunk {
                    id: format!("{}:{}", record.source, seq),
                    source: record.source.clone(),
                    text: record.text.clone(),
                    seq,
                };
                match Self::commit_chunk(&mut state, chunk, embedding) {
                    Ok(()) => {
                        state.next_seq.insert(record.source.clone(), seq + 1);
                        report.indexed += 1;
                    }
                    Err(e) => report
                        .failures
                        .push(IngestFailure { source: record.source.clone(), error: e.to_string() }),
                }
            }
        }
        debug!(indexed = report.indexed, failures = report.failures.len(), "ingest finished");
        Ok(report)
    }

    fn commit_chunk(state: &mut IndexState<L, V>, chunk: Chunk, embedding: Vec<f32>) -> Result<()> {
        let text = chunk.text.clone();
        let id = state.store.insert(chunk)?;
        if let Err(e) = state.vector.insert(id.clone(), embedding) {
            // keep store and indexes consistent
            let _ = state.store.remove(&id);
            return Err(e);
        }
        state.lexical.insert(id, &text);
        Ok(())
    }

    /// Remove a chunk and cascade to both indexes under one writer lock.
    pub fn delete(&self, id: &str) -> Result<()> {
        let mut state = self.state.write().expect("engine lock poisoned");
        state.store.remove(id)?;
        state.vector.remove(id);
        state.lexical.remove(id);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Chunk> {
        let state = self.state.read().expect("engine lock poisoned");
        state.store.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.read().expect("engine lock poisoned").store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().expect("engine lock poisoned").store.is_empty()
    }

    /// Run one query in the requested mode and return at most `k` hits
    /// joined with their source attribution.
    #[instrument(skip_all, fields(mode = ?params.mode, k = params.k))]
    pub fn query(&self, query: &str, params: &QueryParams) -> Result<Vec<QueryHit>> {
        if query.trim().is_empty() {
            return Err(Error::InvalidQuery("query text is empty".to_string()));
        }
        if params.k == 0 {
            return Err(Error::InvalidQuery("k must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&params.alpha) {
            return Err(Error::InvalidQuery(format!(
                "alpha must be within [0, 1], got {}",
                params.alpha
            )));
        }
        match params.mode {
            QueryMode::Vector => {
                let query_vec = self.embed_query(query)?;
                let state = self.state.read().expect("engine lock poisoned");
                let hits = state.vector.search(&query_vec, params.k)?;
                Ok(join_hits(&state.store, &hits))
            }
            QueryMode::Lexical => {
                let state = self.state.read().expect("engine lock poisoned");
                let hits = state.lexical.search(query, params.k);
                Ok(join_hits(&state.store, &hits))
            }
            QueryMode::Hybrid | QueryMode::HybridReranked => {
                let reranker = if params.mode == QueryMode::HybridReranked {
                    Some(self.reranker.clone().ok_or_else(|| {
                        Error::InvalidConfig(
                            "no reranker configured for hybrid_reranked mode".to_string(),
                        )
                    })?)
                } else {
                    None
                };
                let query_vec = self.embed_query(query)?;
                let state = self.state.read().expect("engine lock poisoned");
                let vector_hits = state.vector.search(&query_vec, params.k)?;
                let lexical_hits = state.lexical.search(query, params.k);
                let mut fused = fusion::fuse(&vector_hits, &lexical_hits, params.alpha, params.k);
                if let Some(reranker) = reranker {
                    self.rerank_head(query, &mut fused, &state.store, reranker.as_ref())?;
                }
                Ok(join_hits(&state.store, &fused))
            }
        }
    }

    fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.embedder.embed_batch(&[query.to_string()])?;
        if embeddings.is_empty() {
            return Err(Error::ProviderUnavailable(
                "provider returned no embedding for the query".to_string(),
            ));
        }
        Ok(embeddings.remove(0))
    }

    /// Re-score the top `rerank_window` fused candidates and re-sort that
    /// prefix; positions beyond the window keep their fused order.
    fn rerank_head(
        &self,
        query: &str,
        ranked: &mut [(ChunkId, f32)],
        store: &ChunkStore,
        reranker: &dyn Reranker,
    ) -> Result<()> {
        let window = self.config.rerank_window.min(ranked.len());
        if window == 0 {
            return Ok(());
        }
        let scores = {
            let mut candidates = Vec::with_capacity(window);
            for (id, _) in &ranked[..window] {
                let chunk = store.get(id)?;
                candidates.push(RerankCandidate { id, text: &chunk.text });
            }
            let scores = reranker.rescore(query, &candidates)?;
            if scores.len() != candidates.len() {
                return Err(Error::ProviderUnavailable(format!(
                    "reranker returned {} scores for {} candidates",
                    scores.len(),
                    candidates.len()
                )));
            }
            scores
        };
        let head = &mut ranked[..window];
        for (slot, score) in head.iter_mut().zip(scores) {
            slot.1 = score;
        }
        head.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        Ok(())
    }
}

fn join_hits(store: &ChunkStore, hits: &[(ChunkId, f32)]) -> Vec<QueryHit> {
    hits.iter()
        .filter_map(|(id, score)| {
            store.get(id).ok().map(|chunk| QueryHit {
                id: id.clone(),
                source: chunk.source.clone(),
                text: chunk.text.clone(),
                score: *score,
            })
        })
        .collect()
}

impl<L, V> SearchEngine for HybridSearchEngine<L, V>
where
    L: LexicalIndexer,
    V: VectorIndexer,
{
    fn ingest(&self, records: &[SourceText], cancel: &CancelFlag) -> Result<IngestReport> {
        Self::ingest(self, records, cancel)
    }

    fn query(&self, query: &str, params: &QueryParams) -> Result<Vec<QueryHit>> {
        Self::query(self, query, params)
    }
}
