//! Inverted index with TF-IDF scoring.
//!
//! Postings map each term to the chunks containing it and the term's
//! frequency there. A query accumulates `tf * ln(N / df)` per matching
//! term, where N is the indexed chunk count and df the number of chunks
//! containing the term. Chunks sharing no term with the query are never
//! returned. Ties are broken by ascending chunk id.

use std::collections::{BTreeMap, HashMap};
use tracing::instrument;

use siftdb_core::traits::LexicalIndexer;
use siftdb_core::types::ChunkId;

use crate::tokenize::tokenize;

#[derive(Debug, Default)]
pub struct LexicalIndex {
    // term -> chunk id -> term frequency; BTreeMap keeps postings in
    // ascending id order so equal scores fall out deterministically.
    postings: HashMap<String, BTreeMap<ChunkId, u32>>,
    // distinct terms per chunk, kept for removal
    terms_by_chunk: HashMap<ChunkId, Vec<String>>,
}

impl LexicalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed chunks (N in the scoring formula).
    pub fn len(&self) -> usize {
        self.terms_by_chunk.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms_by_chunk.is_empty()
    }

    /// Tokenize `text` and add its postings. Re-inserting an id replaces
    /// its previous postings.
    #[instrument(skip_all, fields(text_len = text.len()))]
    pub fn insert(&mut self, id: ChunkId, text: &str) {
        if self.terms_by_chunk.contains_key(&id) {
            self.remove(&id);
        }
        let mut frequencies: HashMap<String, u32> = HashMap::new();
        for term in tokenize(text) {
            *frequencies.entry(term).or_insert(0) += 1;
        }
        let mut terms: Vec<String> = frequencies.keys().cloned().collect();
        terms.sort();
        for (term, tf) in frequencies {
            self.postings.entry(term).or_default().insert(id.clone(), tf);
        }
        self.terms_by_chunk.insert(id, terms);
    }

    /// Drop all postings for `id`. Returns false for unknown ids.
    pub fn remove(&mut self, id: &str) -> bool {
        let Some(terms) = self.terms_by_chunk.remove(id) else {
            return false;
        };
        for term in terms {
            if let Some(posting) = self.postings.get_mut(&term) {
                posting.remove(id);
                if posting.is_empty() {
                    self.postings.remove(&term);
                }
            }
        }
        true
    }

    /// Score every chunk sharing a term with `query` and return the top
    /// `k` by descending TF-IDF score, ties by ascending chunk id.
    pub fn search(&self, query: &str, k: usize) -> Vec<(ChunkId, f32)> {
        let n = self.terms_by_chunk.len();
        if n == 0 {
            return vec![];
        }
        let mut scores: BTreeMap<ChunkId, f32> = BTreeMap::new();
        for term in tokenize(query) {
            let Some(posting) = self.postings.get(&term) else {
                continue;
            };
            let idf = (n as f32 / posting.len() as f32).ln();
            for (id, tf) in posting {
                *scores.entry(id.clone()).or_insert(0.0) += *tf as f32 * idf;
            }
        }
        // BTreeMap iteration is in ascending id order; the stable sort
        // preserves it among equal scores.
        let mut hits: Vec<(ChunkId, f32)> = scores.into_iter().collect();
        hits.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        hits
    }
}

impl LexicalIndexer for LexicalIndex {
    fn insert(&mut self, id: ChunkId, text: &str) {
        Self::insert(self, id, text);
    }

    fn remove(&mut self, id: &str) -> bool {
        Self::remove(self, id)
    }

    fn search(&self, query: &str, k: usize) -> Vec<(ChunkId, f32)> {
        Self::search(self, query, k)
    }
}
