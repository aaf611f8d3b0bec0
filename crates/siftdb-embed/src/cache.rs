//! Write-through embedding cache keyed by `(content_hash, embedder_id)`.
//!
//! The cache is consulted before calling the wrapped provider and written
//! through on misses, so repeated ingestion of unchanged text never
//! re-embeds it.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

use siftdb_core::error::{Error, Result};
use siftdb_core::traits::EmbedProvider;

fn content_hash(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

pub struct CachedProvider {
    inner: Arc<dyn EmbedProvider>,
    entries: RwLock<HashMap<(String, String), Vec<f32>>>,
}

impl CachedProvider {
    pub fn new(inner: Arc<dyn EmbedProvider>) -> Self {
        Self { inner, entries: RwLock::new(HashMap::new()) }
    }

    pub fn cached_entries(&self) -> usize {
        self.entries.read().expect("cache lock poisoned").len()
    }
}

impl EmbedProvider for CachedProvider {
    fn embedder_id(&self) -> &str {
        self.inner.embedder_id()
    }

    fn dim(&self) -> usize {
        self.inner.dim()
    }

    fn max_len(&self) -> usize {
        self.inner.max_len()
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let embedder_id = self.inner.embedder_id().to_string();
        let hashes: Vec<String> = texts.iter().map(|t| content_hash(t)).collect();
        let mut vectors: Vec<Option<Vec<f32>>> = vec![None; texts.len()];

        {
            let entries = self.entries.read().expect("cache lock poisoned");
            for (i, hash) in hashes.iter().enumerate() {
                if let Some(v) = entries.get(&(hash.clone(), embedder_id.clone())) {
                    vectors[i] = Some(v.clone());
                }
            }
        }

        let miss_indices: Vec<usize> =
            (0..texts.len()).filter(|&i| vectors[i].is_none()).collect();
        debug!(
            hits = texts.len() - miss_indices.len(),
            misses = miss_indices.len(),
            "embedding cache lookup"
        );

        if !miss_indices.is_empty() {
            let miss_texts: Vec<String> =
                miss_indices.iter().map(|&i| texts[i].clone()).collect();
            let embeddings = self.inner.embed_batch(&miss_texts)?;
            if embeddings.len() != miss_texts.len() {
                return Err(Error::ProviderUnavailable(format!(
                    "provider returned {} embeddings for {} inputs",
                    embeddings.len(),
                    miss_texts.len()
                )));
            }
            let mut entries = self.entries.write().expect("cache lock poisoned");
            for (j, &i) in miss_indices.iter().enumerate() {
                entries.insert((hashes[i].clone(), embedder_id.clone()), embeddings[j].clone());
                vectors[i] = Some(embeddings[j].clone());
            }
        }

        vectors
            .into_iter()
            .map(|v| {
                v.ok_or_else(|| Error::ProviderUnavailable("cache assembly failed".to_string()))
            })
            .collect()
    }
}
