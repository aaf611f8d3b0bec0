//! Pooling over transformer hidden states.
//!
//! Sentence vectors are the attention-masked mean of the final hidden
//! states, L2-normalized. Shape problems surface as typed provider
//! errors rather than panics so a misbehaving model is reported the same
//! way as an unreachable one.

use candle_core::{Device, Tensor};

use siftdb_core::error::{Error, Result};

/// Attention-masked mean over the token axis followed by L2
/// normalization. `hidden` must be `[B, T, H]` and `attention_mask`
/// `[B, T]`; returns one unit-norm row per batch entry.
pub fn masked_mean_l2(hidden: &Tensor, attention_mask: &Tensor) -> Result<Vec<Vec<f32>>> {
    let (batch, tokens, hidden_dim) = hidden.dims3().map_err(|_| {
        Error::ProviderUnavailable(format!(
            "hidden states must be [batch, tokens, hidden], got {:?}",
            hidden.dims()
        ))
    })?;
    let mask_dims = attention_mask.dims2().map_err(|_| {
        Error::ProviderUnavailable(format!(
            "attention mask must be [batch, tokens], got {:?}",
            attention_mask.dims()
        ))
    })?;
    if mask_dims != (batch, tokens) {
        return Err(Error::ProviderUnavailable(format!(
            "attention mask {:?} does not cover hidden states {:?}",
            attention_mask.dims(),
            hidden.dims()
        )));
    }

    let mask = attention_mask.to_dtype(hidden.dtype()).map_err(tensor_err)?;
    let spread = mask
        .unsqueeze(2)
        .and_then(|m| m.broadcast_as((batch, tokens, hidden_dim)))
        .map_err(tensor_err)?;
    let summed = hidden
        .broadcast_mul(&spread)
        .and_then(|t| t.sum(1))
        .map_err(tensor_err)?;
    // Floor the token counts so an all-masked row divides to zeros
    // instead of NaNs.
    let counts = mask
        .sum_keepdim(1)
        .and_then(|c| c.maximum(1e-9))
        .map_err(tensor_err)?;
    let mean = summed.broadcast_div(&counts).map_err(tensor_err)?;
    let norms = mean
        .sqr()
        .and_then(|m| m.sum_keepdim(1))
        .and_then(|n| n.sqrt())
        .and_then(|n| n.maximum(1e-12))
        .map_err(tensor_err)?;
    let pooled = mean
        .broadcast_div(&norms)
        .and_then(|t| t.to_device(&Device::Cpu))
        .map_err(tensor_err)?;
    pooled.to_vec2::<f32>().map_err(tensor_err)
}

fn tensor_err(e: candle_core::Error) -> Error {
    Error::ProviderUnavailable(format!("pooling failed: {e}"))
}
