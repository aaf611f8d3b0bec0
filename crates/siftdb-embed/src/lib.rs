//! Embedding providers.
//!
//! Two concrete providers sit behind [`EmbedProvider`]: a deterministic
//! hash-derived embedder for tests and offline use, and a candle-based
//! local transformer model. Either can be wrapped in a write-through
//! cache. Provider selection is explicit via [`EmbedConfig`]; nothing in
//! this crate reads ambient process state.

pub mod cache;
pub mod device;
pub mod model;
pub mod pool;
pub mod tokenize;

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::Arc;
use twox_hash::XxHash64;

use siftdb_core::error::{Error, Result};
use siftdb_core::traits::EmbedProvider;

pub use cache::CachedProvider;
pub use model::{LocalModelEmbedder, ModelConfig};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Hash,
    LocalModel,
}

/// Explicit provider configuration, assembled at the application edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedConfig {
    pub provider: ProviderKind,
    /// Dimensionality of the hash provider; the model provider reads its
    /// dimension from the model config instead.
    pub dim: usize,
    pub max_len: usize,
    pub model_dir: Option<PathBuf>,
    pub cached: bool,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Hash,
            dim: 384,
            max_len: 256,
            model_dir: None,
            cached: true,
        }
    }
}

/// Build the provider described by `config`.
pub fn build_provider(config: &EmbedConfig) -> Result<Arc<dyn EmbedProvider>> {
    let base: Arc<dyn EmbedProvider> = match config.provider {
        ProviderKind::Hash => {
            if config.dim == 0 {
                return Err(Error::InvalidConfig("embedding dim must be positive".to_string()));
            }
            Arc::new(HashEmbedder::new(config.dim))
        }
        ProviderKind::LocalModel => {
            let model_dir = config.model_dir.clone().ok_or_else(|| {
                Error::InvalidConfig("model_dir is required for the local model provider".to_string())
            })?;
            Arc::new(LocalModelEmbedder::load(&ModelConfig {
                model_dir,
                max_len: config.max_len,
            })?)
        }
    };
    Ok(if config.cached { Arc::new(CachedProvider::new(base)) } else { base })
}

/// Deterministic embedder deriving vectors from token hashes.
///
/// Each whitespace token is hashed with xxHash64 and scattered into a
/// bucket of the output vector; the result is L2-normalized. Identical
/// input always produces identical output, which makes this the pinned
/// provider for tests.
pub struct HashEmbedder {
    dim: usize,
    id: String,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        let id = format!("hash:xx64:d{dim}");
        Self { dim, id }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        v
    }
}

impl EmbedProvider for HashEmbedder {
    fn embedder_id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn max_len(&self) -> usize {
        usize::MAX
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}
