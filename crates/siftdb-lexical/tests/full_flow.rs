use siftdb_lexical::{tokenize, LexicalIndex};

#[test]
fn tokenize_case_folds_and_splits_on_non_alphanumeric() {
    assert_eq!(tokenize("Hello, World! 123"), vec!["hello", "world", "123"]);
    assert_eq!(tokenize("don't-stop"), vec!["don", "t", "stop"]);
    assert_eq!(tokenize("  \t\n"), Vec::<String>::new());
}

#[test]
fn score_matches_tf_idf_formula() {
    let mut index = LexicalIndex::new();
    index.insert("a".to_string(), "alpha alpha beta");
    index.insert("b".to_string(), "beta gamma");
    index.insert("c".to_string(), "gamma delta");

    // "alpha" appears twice in one of three chunks: score = 2 * ln(3).
    let hits = index.search("alpha", 10);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].0, "a");
    let expected = 2.0 * 3.0f32.ln();
    assert!((hits[0].1 - expected).abs() < 1e-5, "got {}", hits[0].1);
}

#[test]
fn score_is_monotonic_in_term_frequency() {
    let mut index = LexicalIndex::new();
    index.insert("once".to_string(), "alpha filler filler");
    index.insert("thrice".to_string(), "alpha alpha alpha");
    index.insert("none".to_string(), "beta");

    let hits = index.search("alpha", 10);
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].0, "thrice");
    assert_eq!(hits[1].0, "once");
    assert!(hits[0].1 > hits[1].1);
}

#[test]
fn chunks_without_query_terms_are_excluded() {
    let mut index = LexicalIndex::new();
    index.insert("a".to_string(), "emergency services available");
    index.insert("b".to_string(), "dental coverage plan");

    let hits = index.search("emergency", 10);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].0, "a");
}

#[test]
fn term_present_everywhere_scores_zero_but_matches() {
    let mut index = LexicalIndex::new();
    index.insert("a".to_string(), "common word");
    index.insert("b".to_string(), "common thing");

    // df == N, so idf is ln(1) = 0; overlap still counts as a match.
    let hits = index.search("common", 10);
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].1, 0.0);
    assert_eq!(hits[1].1, 0.0);
    // ties fall back to ascending chunk id
    assert_eq!(hits[0].0, "a");
    assert_eq!(hits[1].0, "b");
}

#[test]
fn removal_drops_postings() {
    let mut index = LexicalIndex::new();
    index.insert("a".to_string(), "alpha beta");
    index.insert("b".to_string(), "alpha gamma");
    assert!(index.remove("a"));
    assert!(!index.remove("a"));

    let hits = index.search("alpha beta", 10);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].0, "b");
    assert_eq!(index.len(), 1);
}

#[test]
fn reinsert_replaces_postings() {
    let mut index = LexicalIndex::new();
    index.insert("a".to_string(), "alpha");
    index.insert("a".to_string(), "beta");
    assert_eq!(index.len(), 1);
    assert!(index.search("alpha", 10).is_empty());
    assert_eq!(index.search("beta", 10).len(), 1);
}

#[test]
fn multi_term_queries_accumulate() {
    let mut index = LexicalIndex::new();
    index.insert("a".to_string(), "emergency services");
    index.insert("b".to_string(), "dental services");
    index.insert("c".to_string(), "travel insurance");

    let hits = index.search("emergency services", 10);
    assert_eq!(hits[0].0, "a", "chunk matching both terms ranks first");
    assert_eq!(hits[1].0, "b");
    assert!(hits[0].1 > hits[1].1);
}

#[test]
fn truncates_to_k() {
    let mut index = LexicalIndex::new();
    for i in 0..20 {
        index.insert(format!("chunk:{i:02}"), "alpha");
    }
    let hits = index.search("alpha", 5);
    assert_eq!(hits.len(), 5);
}
