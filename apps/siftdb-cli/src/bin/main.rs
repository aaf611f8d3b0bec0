use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use siftdb_core::config::{expand_path, resolve_with_base, Config, EngineConfig};
use siftdb_core::splitter::TextSplitter;
use siftdb_core::types::{CancelFlag, IngestReport, QueryMode, QueryParams};
use siftdb_embed::{build_provider, EmbedConfig, ProviderKind};
use siftdb_hybrid::{build_engine, DefaultEngine, OverlapReranker};

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() {
        eprintln!("Usage: {} <ingest|query> [args...]", prog);
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let (cmd, args) = parse_args();
    match cmd.as_str() {
        "ingest" => {
            let data_dir = data_dir_from(&config, args.first());
            let engine = build_default_engine(&config)?;
            let report = ingest_directory(&engine, &data_dir)?;
            println!(
                "✅ Ingest complete ({} chunks, {} failures)",
                report.indexed,
                report.failures.len()
            );
            for failure in &report.failures {
                eprintln!("  ⚠️  {}: {}", failure.source, failure.error);
            }
        }
        "query" => {
            let query_text = args.first().cloned().unwrap_or_else(|| {
                eprintln!("Usage: siftdb query \"<query>\" [data_dir] [mode]");
                std::process::exit(1)
            });
            let data_dir = data_dir_from(&config, args.get(1));
            let params = query_params_from(&config, args.get(2))?;
            let engine = build_default_engine(&config)?;
            let report = ingest_directory(&engine, &data_dir)?;
            if report.indexed == 0 {
                println!("Nothing indexed under {}", data_dir.display());
                return Ok(());
            }
            let hits = engine.query(&query_text, &params)?;
            if hits.is_empty() {
                println!("No matches for \"{}\"", query_text);
            }
            for (rank, hit) in hits.iter().enumerate() {
                let preview: String = hit.text.chars().take(160).collect();
                println!("{:>2}. [{:.4}] {}: {}", rank + 1, hit.score, hit.source, preview);
            }
        }
        _ => {
            eprintln!("Unknown command: {}", cmd);
            std::process::exit(1);
        }
    }
    Ok(())
}

// Paths coming from config files are taken relative to `data.base_dir`;
// paths given on the command line are used as-is.
fn config_base_dir(config: &Config) -> PathBuf {
    let base: String = config.get("data.base_dir").unwrap_or_else(|_| ".".to_string());
    expand_path(base)
}

fn data_dir_from(config: &Config, arg: Option<&String>) -> PathBuf {
    arg.map(PathBuf::from).unwrap_or_else(|| {
        let dir: String = config
            .get("data.txt_dir")
            .unwrap_or_else(|_| "./data/txt".to_string());
        resolve_with_base(&config_base_dir(config), dir)
    })
}

fn query_params_from(config: &Config, mode_arg: Option<&String>) -> anyhow::Result<QueryParams> {
    let mode_name = mode_arg.cloned().unwrap_or_else(|| {
        config.get("query.mode").unwrap_or_else(|_| "hybrid".to_string())
    });
    let mode = match mode_name.as_str() {
        "vector" => QueryMode::Vector,
        "lexical" => QueryMode::Lexical,
        "hybrid" => QueryMode::Hybrid,
        "hybrid_reranked" => QueryMode::HybridReranked,
        other => anyhow::bail!("unknown query mode: {other}"),
    };
    Ok(QueryParams {
        k: config.get("query.k").unwrap_or(10),
        mode,
        alpha: config.get("query.alpha").unwrap_or(0.5),
    })
}

fn build_default_engine(config: &Config) -> anyhow::Result<DefaultEngine> {
    let provider_name: String =
        config.get("embed.provider").unwrap_or_else(|_| "hash".to_string());
    let embed = EmbedConfig {
        provider: match provider_name.as_str() {
            "local_model" => ProviderKind::LocalModel,
            _ => ProviderKind::Hash,
        },
        dim: config.get("embed.dim").unwrap_or(384),
        max_len: config.get("embed.max_len").unwrap_or(256),
        model_dir: config
            .get::<String>("embed.model_dir")
            .ok()
            .map(|p| resolve_with_base(&config_base_dir(config), p)),
        cached: config.get("embed.cached").unwrap_or(true),
    };
    let provider = build_provider(&embed)?;
    let engine_config = EngineConfig {
        alpha: config.get("engine.alpha").unwrap_or(0.5),
        rerank_window: config.get("engine.rerank_window").unwrap_or(50),
        batch_size: config.get("engine.batch_size").unwrap_or(32),
    };
    let engine = build_engine(provider, engine_config)?;
    Ok(engine.with_reranker(Arc::new(OverlapReranker)))
}

fn ingest_directory(engine: &DefaultEngine, data_dir: &Path) -> anyhow::Result<IngestReport> {
    println!("Ingesting from {}", data_dir.display());
    let splitter = TextSplitter::new();
    let records = splitter.process_directory(data_dir)?;
    let pb = ProgressBar::new(records.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")?
            .progress_chars("#>-"),
    );
    let cancel = CancelFlag::new();
    let mut report = IngestReport::default();
    for slice in records.chunks(64) {
        let partial = engine.ingest(slice, &cancel)?;
        report.indexed += partial.indexed;
        report.failures.extend(partial.failures);
        report.cancelled |= partial.cancelled;
        pb.inc(slice.len() as u64);
    }
    pb.finish_with_message("indexing complete");
    Ok(report)
}
