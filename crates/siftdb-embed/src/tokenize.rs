use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

use siftdb_core::error::{Error, Result};

/// Encode `text`, truncate or pad to `max_len` (pad id 1, mask 0), and
/// lift ids and attention mask onto `device` as `[1, max_len]` tensors.
pub fn encode_padded(
    tokenizer: &Tokenizer,
    text: &str,
    max_len: usize,
    device: &Device,
) -> Result<(Tensor, Tensor)> {
    let enc = tokenizer
        .encode(text, true)
        .map_err(|e| Error::ProviderUnavailable(format!("tokenization failed: {e}")))?;
    let mut ids = enc.get_ids().to_vec();
    let mut mask = enc.get_attention_mask().to_vec();
    if ids.len() > max_len {
        ids.truncate(max_len);
        mask.truncate(max_len);
    }
    if ids.len() < max_len {
        let pad = max_len - ids.len();
        ids.extend(std::iter::repeat(1).take(pad));
        mask.extend(std::iter::repeat(0).take(pad));
    }
    let input_ids = Tensor::from_iter(ids, device)
        .and_then(|t| t.reshape((1, max_len)))
        .map_err(tensor_err)?;
    let attention_mask = Tensor::from_iter(mask, device)
        .and_then(|t| t.reshape((1, max_len)))
        .map_err(tensor_err)?;
    Ok((input_ids, attention_mask))
}

fn tensor_err(e: candle_core::Error) -> Error {
    Error::ProviderUnavailable(format!("tensor construction failed: {e}"))
}
