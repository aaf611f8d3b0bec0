//! Text splitting for ingestion.
//!
//! Splits raw document text on blank-line paragraph boundaries; oversized
//! paragraphs fall back to a word window with configurable overlap. The
//! output is a sequence of `(source, text)` records ready for the engine.

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::types::SourceText;

#[derive(Debug, Clone)]
pub struct SplitConfig {
    pub max_tokens: usize,
    pub overlap_percent: f32,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self { max_tokens: 500, overlap_percent: 0.2 }
    }
}

#[derive(Default)]
pub struct TextSplitter {
    config: SplitConfig,
}

impl TextSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SplitConfig) -> Self {
        Self { config }
    }

    /// Split raw text into chunk-sized pieces.
    pub fn split(&self, text: &str) -> Vec<String> {
        let mut pieces = Vec::new();
        for paragraph in text.split("\n\n") {
            let paragraph = paragraph.trim();
            if paragraph.is_empty() {
                continue;
            }
            if self.count_tokens(paragraph) <= self.config.max_tokens {
                pieces.push(paragraph.to_string());
            } else {
                pieces.extend(self.split_paragraph_with_overlap(paragraph));
            }
        }
        pieces
    }

    /// Walk `data_dir` for `.txt` files and split each into records whose
    /// source is the file stem.
    pub fn process_directory(&self, data_dir: &Path) -> Result<Vec<SourceText>> {
        let files = self.list_txt_files(data_dir);
        if files.is_empty() {
            info!("no .txt files found under {}", data_dir.display());
            return Ok(vec![]);
        }
        let mut records = Vec::new();
        for (file_index, file_path) in files.iter().enumerate() {
            debug!("processing file {}/{}: {}", file_index + 1, files.len(), file_path.display());
            let content = self.read_file_content(file_path)?;
            let source = extract_source_id(file_path);
            for piece in self.split(&content) {
                records.push(SourceText::new(source.clone(), piece));
            }
        }
        info!("processed {} files into {} records", files.len(), records.len());
        Ok(records)
    }

    fn read_file_content(&self, file_path: &Path) -> Result<String> {
        match fs::read_to_string(file_path) {
            Ok(content) => Ok(content),
            Err(_) => Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string()),
        }
    }

    // Rough heuristic: words per token ratio of 0.75.
    fn count_tokens(&self, text: &str) -> usize {
        let word_count = text.split_whitespace().count();
        (word_count as f32 / 0.75) as usize
    }

    fn split_paragraph_with_overlap(&self, paragraph: &str) -> Vec<String> {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        let words_per_chunk = 300;
        let overlap_words = (words_per_chunk as f32 * self.config.overlap_percent) as usize;
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < words.len() {
            let end = (start + words_per_chunk).min(words.len());
            chunks.push(words[start..end].join(" "));
            if end >= words.len() {
                break;
            }
            start = end - overlap_words;
        }
        chunks
    }

    fn list_txt_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut txt_files = Vec::new();
        for entry in walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("txt") {
                txt_files.push(path.to_path_buf());
            }
        }
        txt_files.sort();
        txt_files
    }
}

fn extract_source_id(file_path: &Path) -> String {
    file_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| file_path.to_string_lossy().to_string())
}
