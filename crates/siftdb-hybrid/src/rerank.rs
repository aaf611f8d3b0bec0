//! Second-stage scorers.

use siftdb_core::error::Result;
use siftdb_core::traits::{Reranker, RerankCandidate};

/// Query-term overlap scorer: the fraction of query words contained in
/// the candidate text. A cheap stand-in for a cross-encoder signal.
pub struct OverlapReranker;

impl Reranker for OverlapReranker {
    fn rescore(&self, query: &str, candidates: &[RerankCandidate<'_>]) -> Result<Vec<f32>> {
        let query_lower = query.to_lowercase();
        let query_words: Vec<&str> = query_lower.split_whitespace().collect();
        Ok(candidates
            .iter()
            .map(|candidate| {
                if query_words.is_empty() {
                    return 0.0;
                }
                let text_lower = candidate.text.to_lowercase();
                let matched = query_words.iter().filter(|w| text_lower.contains(**w)).count();
                matched as f32 / query_words.len() as f32
            })
            .collect())
    }
}
