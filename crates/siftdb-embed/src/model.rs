//! Local transformer embedding provider.
//!
//! Loads an XLM-RoBERTa-family model (e.g. BGE-M3) from an explicit
//! model directory holding `tokenizer.json`, `config.json` and
//! `pytorch_model.bin`. Sentence vectors are the attention-masked mean
//! of the final hidden states, L2-normalized.

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use serde::Deserialize;
use std::path::PathBuf;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use siftdb_core::error::{Error, Result};
use siftdb_core::traits::EmbedProvider;

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::encode_padded;

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub model_dir: PathBuf,
    pub max_len: usize,
}

#[derive(Deserialize)]
struct HiddenSize {
    hidden_size: usize,
}

pub struct LocalModelEmbedder {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_len: usize,
    id: String,
}

impl LocalModelEmbedder {
    /// Load tokenizer, config and weights from `config.model_dir`.
    pub fn load(config: &ModelConfig) -> Result<Self> {
        let device = select_device();
        let model_dir = &config.model_dir;
        info!("loading embedding model from {}", model_dir.display());

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            Error::ProviderUnavailable(format!(
                "failed to load tokenizer from {}: {e}",
                tokenizer_path.display()
            ))
        })?;

        let config_path = model_dir.join("config.json");
        let config_json = std::fs::read_to_string(&config_path).map_err(|e| {
            Error::ProviderUnavailable(format!(
                "failed to read model config {}: {e}",
                config_path.display()
            ))
        })?;
        let model_config: XLMRobertaConfig = serde_json::from_str(&config_json)
            .map_err(|e| Error::ProviderUnavailable(format!("invalid model config: {e}")))?;
        let hidden: HiddenSize = serde_json::from_str(&config_json)
            .map_err(|e| Error::ProviderUnavailable(format!("invalid model config: {e}")))?;

        let weights_path = model_dir.join("pytorch_model.bin");
        let weights = candle_core::pickle::read_all(&weights_path).map_err(|e| {
            Error::ProviderUnavailable(format!(
                "failed to read model weights {}: {e}",
                weights_path.display()
            ))
        })?;
        let weights_map: std::collections::HashMap<String, Tensor> = weights.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights_map, DType::F32, &device);
        let model = XLMRobertaModel::new(&model_config, vb)
            .map_err(|e| Error::ProviderUnavailable(format!("failed to build model: {e}")))?;

        let dim = hidden.hidden_size;
        let id = format!("local:xlm-roberta:d{dim}");
        info!("embedding model loaded (dim {dim})");
        Ok(Self { model, tokenizer, device, dim, max_len: config.max_len, id })
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let (input_ids, attention_mask) =
            encode_padded(&self.tokenizer, text, self.max_len, &self.device)?;
        let token_type_ids = Tensor::zeros((1, self.max_len), DType::I64, &self.device)
            .map_err(inference_err)?;
        let hidden_states = self
            .model
            .forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)
            .map_err(inference_err)?;
        let rows = masked_mean_l2(&hidden_states, &attention_mask)?;
        let embedding = rows.into_iter().next().ok_or_else(|| {
            Error::ProviderUnavailable("model returned no pooled rows".to_string())
        })?;
        if embedding.len() != self.dim {
            return Err(Error::ProviderUnavailable(format!(
                "model returned dimension {}, expected {}",
                embedding.len(),
                self.dim
            )));
        }
        Ok(embedding)
    }
}

fn inference_err(e: candle_core::Error) -> Error {
    Error::ProviderUnavailable(format!("inference failed: {e}"))
}

impl EmbedProvider for LocalModelEmbedder {
    fn embedder_id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn max_len(&self) -> usize {
        self.max_len
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        debug!("embedding batch of {}", texts.len());
        texts.iter().map(|t| self.embed_one(t)).collect()
    }
}
