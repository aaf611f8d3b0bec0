//! Term pipeline: case-fold and split on non-alphanumeric boundaries.

/// Tokenize `text` into lowercase terms. Runs of non-alphanumeric
/// characters delimit terms; empty segments are dropped.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}
