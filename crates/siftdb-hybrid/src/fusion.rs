//! Score fusion for hybrid retrieval.
//!
//! Each input list is min-max normalized within itself, then combined per
//! chunk as `alpha * vector + (1 - alpha) * lexical`; a chunk present in
//! only one list uses 0 for the missing component. The fused list is
//! sorted descending with ties broken by ascending chunk id.

use std::collections::{BTreeSet, HashMap};

use siftdb_core::types::ChunkId;

/// Scale a result list's scores to [0, 1] within the list.
pub fn min_max_normalize(hits: &[(ChunkId, f32)]) -> HashMap<ChunkId, f32> {
    if hits.is_empty() {
        return HashMap::new();
    }
    let min = hits.iter().map(|h| h.1).fold(f32::INFINITY, f32::min);
    let max = hits.iter().map(|h| h.1).fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;
    hits.iter()
        .map(|(id, score)| {
            // A constant or single-entry list carries no ordering signal;
            // presence itself still does, so every member maps to 1.0.
            let normalized = if range <= f32::EPSILON { 1.0 } else { (*score - min) / range };
            (id.clone(), normalized)
        })
        .collect()
}

/// Merge the two ranked lists into one list of at most `k` entries.
pub fn fuse(
    vector_hits: &[(ChunkId, f32)],
    lexical_hits: &[(ChunkId, f32)],
    alpha: f32,
    k: usize,
) -> Vec<(ChunkId, f32)> {
    let vector_norm = min_max_normalize(vector_hits);
    let lexical_norm = min_max_normalize(lexical_hits);
    let ids: BTreeSet<&ChunkId> = vector_norm.keys().chain(lexical_norm.keys()).collect();
    let mut fused: Vec<(ChunkId, f32)> = ids
        .into_iter()
        .map(|id| {
            let v = vector_norm.get(id).copied().unwrap_or(0.0);
            let l = lexical_norm.get(id).copied().unwrap_or(0.0);
            (id.clone(), alpha * v + (1.0 - alpha) * l)
        })
        .collect();
    fused.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    fused.truncate(k);
    fused
}
