use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use siftdb_core::config::EngineConfig;
use siftdb_core::error::{Error, Result};
use siftdb_core::traits::{EmbedProvider, Reranker, RerankCandidate};
use siftdb_core::types::{CancelFlag, QueryMode, QueryParams, SourceText};
use siftdb_embed::HashEmbedder;
use siftdb_hybrid::{build_engine, fusion, DefaultEngine};

const DIM: usize = 64;

fn engine() -> DefaultEngine {
    build_engine(Arc::new(HashEmbedder::new(DIM)), EngineConfig::default()).expect("engine")
}

fn engine_with(config: EngineConfig) -> DefaultEngine {
    build_engine(Arc::new(HashEmbedder::new(DIM)), config).expect("engine")
}

fn record(source: &str, text: &str) -> SourceText {
    SourceText::new(source, text)
}

fn params(mode: QueryMode, k: usize) -> QueryParams {
    QueryParams { k, mode, alpha: 0.5 }
}

/// Hash provider that fails whole batches containing a poison marker.
struct FlakyProvider {
    inner: HashEmbedder,
}

impl EmbedProvider for FlakyProvider {
    fn embedder_id(&self) -> &str {
        "flaky"
    }

    fn dim(&self) -> usize {
        self.inner.dim()
    }

    fn max_len(&self) -> usize {
        self.inner.max_len()
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.iter().any(|t| t.contains("poison")) {
            return Err(Error::RateLimited { retry_after: Some(Duration::from_secs(2)) });
        }
        self.inner.embed_batch(texts)
    }
}

/// Succeeds for the first `limit` calls, then reports the provider down.
struct FailAfter {
    inner: HashEmbedder,
    limit: usize,
    calls: AtomicUsize,
}

impl FailAfter {
    fn new(limit: usize) -> Self {
        Self { inner: HashEmbedder::new(DIM), limit, calls: AtomicUsize::new(0) }
    }
}

impl EmbedProvider for FailAfter {
    fn embedder_id(&self) -> &str {
        "fail-after"
    }

    fn dim(&self) -> usize {
        self.inner.dim()
    }

    fn max_len(&self) -> usize {
        self.inner.max_len()
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if self.calls.fetch_add(1, Ordering::SeqCst) >= self.limit {
            return Err(Error::ProviderUnavailable("connection refused".to_string()));
        }
        self.inner.embed_batch(texts)
    }
}

/// Cancels the run from inside the first embedding call.
struct CancellingProvider {
    inner: HashEmbedder,
    flag: CancelFlag,
}

impl EmbedProvider for CancellingProvider {
    fn embedder_id(&self) -> &str {
        "cancelling"
    }

    fn dim(&self) -> usize {
        self.inner.dim()
    }

    fn max_len(&self) -> usize {
        self.inner.max_len()
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.flag.cancel();
        self.inner.embed_batch(texts)
    }
}

/// Scores candidates by their position, ascending, so the reranked head
/// comes back reversed.
struct ReversingReranker;

impl Reranker for ReversingReranker {
    fn rescore(&self, _query: &str, candidates: &[RerankCandidate<'_>]) -> Result<Vec<f32>> {
        Ok((0..candidates.len()).map(|i| i as f32).collect())
    }
}

#[test]
fn three_chunk_benefits_example() {
    let engine = engine();
    let report = engine
        .ingest(
            &[
                record("plan-a", "emergency services are covered in full"),
                record("plan-b", "dental coverage includes two cleanings"),
                record("plan-c", "vision benefits cover annual exams"),
            ],
            &CancelFlag::new(),
        )
        .expect("ingest");
    assert_eq!(report.indexed, 3);
    assert!(report.failures.is_empty());

    // Lexical: "emergency" ranks plan-a first and excludes plan-b.
    let hits = engine.query("emergency", &params(QueryMode::Lexical, 10)).expect("lexical");
    assert_eq!(hits[0].source, "plan-a");
    assert!(hits.iter().all(|h| h.source != "plan-b"));

    // Vector: the query embedding identical to chunk A's ranks it first.
    let hits = engine
        .query("emergency services are covered in full", &params(QueryMode::Vector, 10))
        .expect("vector");
    assert_eq!(hits[0].source, "plan-a");
    assert!((hits[0].score - 1.0).abs() < 1e-5);

    // k = 1 returns exactly one result.
    let hits = engine.query("emergency", &params(QueryMode::Vector, 1)).expect("k=1");
    assert_eq!(hits.len(), 1);
}

#[test]
fn fusion_combines_normalized_scores() {
    let vector = vec![("a".to_string(), 0.9), ("b".to_string(), 0.5)];
    let lexical = vec![("b".to_string(), 10.0), ("c".to_string(), 2.0)];

    let fused = fusion::fuse(&vector, &lexical, 0.7, 10);
    assert_eq!(fused.len(), 3);

    // a: only vector side, normalized to 1.0 -> 0.7 * 1.0
    assert_eq!(fused[0].0, "a");
    assert!((fused[0].1 - 0.7).abs() < 1e-6);
    // b: vector norm 0.0, lexical norm 1.0 -> 0.3
    assert_eq!(fused[1].0, "b");
    assert!((fused[1].1 - 0.3).abs() < 1e-6);
    // c: lexical norm 0.0 only
    assert_eq!(fused[2].0, "c");
    assert!((fused[2].1 - 0.0).abs() < 1e-6);
}

#[test]
fn fusion_ties_break_by_ascending_id() {
    let vector = vec![("z".to_string(), 1.0), ("a".to_string(), 1.0)];
    let lexical: Vec<(String, f32)> = vec![];
    let fused = fusion::fuse(&vector, &lexical, 1.0, 10);
    // Constant-score list: both normalize to 1.0, tie resolved by id.
    assert_eq!(fused[0].0, "a");
    assert_eq!(fused[1].0, "z");
}

#[test]
fn rerank_leaves_tail_beyond_window_unchanged() {
    let config = EngineConfig { rerank_window: 2, ..EngineConfig::default() };
    let engine = engine_with(config)
        .with_reranker(Arc::new(ReversingReranker));
    let records: Vec<SourceText> = (0..6)
        .map(|i| record(&format!("doc-{i}"), &format!("benefit clause number {i} covers item {i}")))
        .collect();
    engine.ingest(&records, &CancelFlag::new()).expect("ingest");

    let plain = engine
        .query("benefit clause number", &params(QueryMode::Hybrid, 6))
        .expect("hybrid");
    let reranked = engine
        .query("benefit clause number", &params(QueryMode::HybridReranked, 6))
        .expect("reranked");
    assert_eq!(plain.len(), reranked.len());

    // Head (window of 2) is reordered by the reranker...
    let plain_head: Vec<&str> = plain[..2].iter().map(|h| h.id.as_str()).collect();
    let reranked_head: Vec<&str> = reranked[..2].iter().map(|h| h.id.as_str()).collect();
    assert_eq!(reranked_head, vec![plain_head[1], plain_head[0]]);

    // ...and everything beyond the window keeps its fused order.
    for (p, r) in plain[2..].iter().zip(reranked[2..].iter()) {
        assert_eq!(p.id, r.id);
        assert!((p.score - r.score).abs() < 1e-6);
    }
}

#[test]
fn failing_batch_is_reported_and_skipped() {
    let provider = Arc::new(FlakyProvider { inner: HashEmbedder::new(DIM) });
    let config = EngineConfig { batch_size: 1, ..EngineConfig::default() };
    let engine = build_engine(provider, config).expect("engine");

    let report = engine
        .ingest(
            &[
                record("good-1", "routine checkups"),
                record("bad", "poison pill clause"),
                record("good-2", "hospital stays"),
            ],
            &CancelFlag::new(),
        )
        .expect("ingest");

    assert_eq!(report.indexed, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].source, "bad");
    assert!(report.failures[0].error.contains("rate limited"));
    assert_eq!(engine.len(), 2);
}

#[test]
fn cancellation_stops_between_batches() {
    let flag = CancelFlag::new();
    let provider = Arc::new(CancellingProvider { inner: HashEmbedder::new(DIM), flag: flag.clone() });
    let config = EngineConfig { batch_size: 2, ..EngineConfig::default() };
    let engine = build_engine(provider, config).expect("engine");

    let records: Vec<SourceText> =
        (0..6).map(|i| record("doc", &format!("section {i}"))).collect();
    let report = engine.ingest(&records, &flag).expect("ingest");

    // The first batch was already embedded when the flag flipped; no
    // later batch is committed.
    assert!(report.cancelled);
    assert_eq!(report.indexed, 2);
    assert_eq!(engine.len(), 2);
}

#[test]
fn delete_cascades_to_both_indexes() {
    let engine = engine();
    engine
        .ingest(
            &[
                record("doc", "emergency room visits"),
                record("doc", "dental cleanings"),
                record("doc", "vision exams"),
            ],
            &CancelFlag::new(),
        )
        .expect("ingest");

    engine.delete("doc:0").expect("delete");
    assert!(matches!(engine.get("doc:0"), Err(Error::NotFound(_))));
    assert!(matches!(engine.delete("doc:0"), Err(Error::NotFound(_))));

    let lexical = engine.query("emergency room", &params(QueryMode::Lexical, 10)).expect("lexical");
    assert!(lexical.iter().all(|h| h.id != "doc:0"));
    let vector = engine
        .query("emergency room visits", &params(QueryMode::Vector, 10))
        .expect("vector");
    assert!(vector.iter().all(|h| h.id != "doc:0"));
}

#[test]
fn invalid_queries_are_rejected() {
    let engine = engine();
    engine.ingest(&[record("doc", "some text")], &CancelFlag::new()).expect("ingest");

    assert!(matches!(
        engine.query("   ", &params(QueryMode::Hybrid, 5)),
        Err(Error::InvalidQuery(_))
    ));
    assert!(matches!(
        engine.query("text", &params(QueryMode::Hybrid, 0)),
        Err(Error::InvalidQuery(_))
    ));
    let bad_alpha = QueryParams { k: 5, mode: QueryMode::Hybrid, alpha: 1.5 };
    assert!(matches!(engine.query("text", &bad_alpha), Err(Error::InvalidQuery(_))));
    assert!(matches!(
        engine.query("text", &params(QueryMode::HybridReranked, 5)),
        Err(Error::InvalidConfig(_))
    ));
}

#[test]
fn provider_failure_at_query_time_is_typed() {
    let provider = Arc::new(FailAfter::new(1));
    let engine = build_engine(provider, EngineConfig::default()).expect("engine");
    engine
        .ingest(&[record("doc", "emergency services")], &CancelFlag::new())
        .expect("ingest");

    // The provider is now down: vector queries surface the typed error
    // instead of an empty result.
    let err = engine
        .query("emergency", &params(QueryMode::Vector, 5))
        .expect_err("provider down");
    assert!(matches!(err, Error::ProviderUnavailable(_)));

    // Lexical mode needs no provider and keeps working.
    let hits = engine.query("emergency", &params(QueryMode::Lexical, 5)).expect("lexical");
    assert_eq!(hits.len(), 1);
}

#[test]
fn bulk_ingest_caps_results_and_attributes_sources() {
    let engine = engine();
    let sources = ["benefits-guide", "enrollment-faq", "provider-directory"];
    let mut records = Vec::new();
    for source in &sources {
        for i in 0..212 {
            records.push(record(source, &format!("clause {i} of {source} explains item {i}")));
        }
    }
    let report = engine.ingest(&records, &CancelFlag::new()).expect("ingest");
    assert_eq!(report.indexed, 636);
    assert_eq!(engine.len(), 636);

    let hits = engine.query("clause explains item", &params(QueryMode::Hybrid, 50)).expect("query");
    assert!(hits.len() <= 50);
    assert!(!hits.is_empty());
    for hit in &hits {
        assert!(sources.contains(&hit.source.as_str()), "unknown source {}", hit.source);
    }
}
