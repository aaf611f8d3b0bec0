use std::fs;

use tempfile::TempDir;

use siftdb_core::config::EngineConfig;
use siftdb_core::error::Error;
use siftdb_core::splitter::{SplitConfig, TextSplitter};
use siftdb_core::store::ChunkStore;
use siftdb_core::types::Chunk;

fn chunk(id: &str, source: &str, text: &str, seq: usize) -> Chunk {
    Chunk { id: id.to_string(), source: source.to_string(), text: text.to_string(), seq }
}

#[test]
fn store_roundtrip() {
    let mut store = ChunkStore::new();
    let inserted = chunk("plan:0", "plan", "emergency services are covered", 0);
    let id = store.insert(inserted.clone()).expect("insert");
    assert_eq!(id, "plan:0");
    let got = store.get(&id).expect("get");
    assert_eq!(got, &inserted);
    assert_eq!(store.len(), 1);
}

#[test]
fn store_rejects_duplicate_id() {
    let mut store = ChunkStore::new();
    store.insert(chunk("a:0", "a", "first", 0)).expect("insert");
    let err = store.insert(chunk("a:0", "a", "second", 1)).expect_err("duplicate");
    assert!(matches!(err, Error::DuplicateId(id) if id == "a:0"));
}

#[test]
fn store_remove_then_get_is_not_found() {
    let mut store = ChunkStore::new();
    store.insert(chunk("a:0", "a", "text", 0)).expect("insert");
    let removed = store.remove("a:0").expect("remove");
    assert_eq!(removed.id, "a:0");
    assert!(matches!(store.get("a:0"), Err(Error::NotFound(_))));
    assert!(matches!(store.remove("a:0"), Err(Error::NotFound(_))));
}

#[test]
fn split_small_paragraph_is_one_piece() {
    let splitter = TextSplitter::new();
    let pieces = splitter.split("Short text");
    assert_eq!(pieces.len(), 1, "one small paragraph becomes one piece");
    assert_eq!(pieces[0], "Short text");
}

#[test]
fn split_skips_blank_paragraphs() {
    let splitter = TextSplitter::new();
    let pieces = splitter.split("alpha\n\n\n\nbravo");
    assert_eq!(pieces, vec!["alpha".to_string(), "bravo".to_string()]);
}

#[test]
fn split_oversized_paragraph_overlaps_windows() {
    let splitter = TextSplitter::with_config(SplitConfig { max_tokens: 50, overlap_percent: 0.2 });
    let words: Vec<String> = (0..700).map(|i| format!("w{i}")).collect();
    let text = words.join(" ");
    let pieces = splitter.split(&text);
    assert!(pieces.len() > 1, "oversized paragraph is windowed");
    // Consecutive windows share their overlap region.
    let first: Vec<&str> = pieces[0].split_whitespace().collect();
    let second: Vec<&str> = pieces[1].split_whitespace().collect();
    assert_eq!(first.len(), 300);
    assert_eq!(&first[first.len() - 60..], &second[..60]);
}

#[test]
fn process_directory_assigns_file_stem_sources() {
    let tmp = TempDir::new().expect("tempdir");
    let dir = tmp.path();
    fs::write(dir.join("a.txt"), "alpha bravo").expect("write");
    fs::write(dir.join("b.txt"), "charlie delta").expect("write");

    let splitter = TextSplitter::new();
    let records = splitter.process_directory(dir).expect("process");

    assert_eq!(records.len(), 2);
    let mut sources: Vec<&str> = records.iter().map(|r| r.source.as_str()).collect();
    sources.sort();
    assert_eq!(sources, vec!["a", "b"]);
}

#[test]
fn engine_config_validation() {
    assert!(EngineConfig::default().validate().is_ok());
    let bad_alpha = EngineConfig { alpha: 1.5, ..EngineConfig::default() };
    assert!(matches!(bad_alpha.validate(), Err(Error::InvalidConfig(_))));
    let bad_batch = EngineConfig { batch_size: 0, ..EngineConfig::default() };
    assert!(matches!(bad_batch.validate(), Err(Error::InvalidConfig(_))));
}
