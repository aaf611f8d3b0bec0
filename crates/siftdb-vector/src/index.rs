//! Brute-force cosine similarity search.
//!
//! Entries are keyed by chunk id and share one fixed dimension chosen at
//! index creation. A query scans every entry, O(n·d), and returns the top
//! k by descending similarity with ties broken by ascending chunk id.

use std::collections::BTreeMap;
use tracing::instrument;

use siftdb_core::error::{Error, Result};
use siftdb_core::traits::VectorIndexer;
use siftdb_core::types::ChunkId;

#[derive(Debug)]
pub struct VectorIndex {
    dim: usize,
    entries: BTreeMap<ChunkId, Vec<f32>>,
}

impl VectorIndex {
    /// Create an index for embeddings of dimension `dim`.
    pub fn new(dim: usize) -> Self {
        Self { dim, entries: BTreeMap::new() }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert an embedding, failing with [`Error::DimensionMismatch`] if
    /// its length differs from the index dimension. Re-inserting an id
    /// replaces its previous vector.
    pub fn insert(&mut self, id: ChunkId, vector: Vec<f32>) -> Result<()> {
        self.check_dim(vector.len())?;
        self.entries.insert(id, vector);
        Ok(())
    }

    /// Drop the entry for `id`. Returns false for unknown ids.
    pub fn remove(&mut self, id: &str) -> bool {
        self.entries.remove(id).is_some()
    }

    /// Scan every entry and return the top `k` by descending cosine
    /// similarity, ties by ascending chunk id.
    #[instrument(skip_all, fields(index_size = self.entries.len(), k = k))]
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(ChunkId, f32)>> {
        self.check_dim(query.len())?;
        let mut hits: Vec<(ChunkId, f32)> = self
            .entries
            .iter()
            .map(|(id, v)| (id.clone(), cosine_similarity(query, v)))
            .collect();
        hits.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        hits.truncate(k);
        Ok(hits)
    }

    fn check_dim(&self, actual: usize) -> Result<()> {
        if actual != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual });
        }
        Ok(())
    }
}

/// Cosine similarity of two equal-length vectors. Zero-norm vectors
/// score 0.0 against everything.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(&x, &y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|y| y * y).sum::<f32>().sqrt();
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot / (mag_a * mag_b)
}

impl VectorIndexer for VectorIndex {
    fn dim(&self) -> usize {
        Self::dim(self)
    }

    fn insert(&mut self, id: ChunkId, vector: Vec<f32>) -> Result<()> {
        Self::insert(self, id, vector)
    }

    fn remove(&mut self, id: &str) -> bool {
        Self::remove(self, id)
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<(ChunkId, f32)>> {
        Self::search(self, query, k)
    }
}
