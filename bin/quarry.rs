use anyhow::{Context, Result};
use clap::Parser;
use quarry::{AnalyzerRegistry, Document, EngineSettings, Index, IndexMapping, SearchRequest};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "quarry")]
#[command(about = "Index newline-delimited JSON documents and run one search", long_about = None)]
struct Args {
    /// Mapping file (JSON object of field declarations)
    #[arg(long, env = "QUARRY_SCHEMA")]
    schema: PathBuf,

    /// Documents file, one `{"id": .., "source": {..}}` per line
    #[arg(long, env = "QUARRY_DOCS")]
    docs: PathBuf,

    /// Query DSL as inline JSON; omitted matches every document
    #[arg(long, env = "QUARRY_QUERY")]
    query: Option<String>,

    /// Aggregations as inline JSON
    #[arg(long, env = "QUARRY_AGGS")]
    aggs: Option<String>,

    /// Number of hits to return
    #[arg(long, env = "QUARRY_LIMIT")]
    limit: Option<usize>,

    /// Number of hits to skip
    #[arg(long, env = "QUARRY_OFFSET", default_value = "0")]
    offset: usize,

    /// BM25 term frequency saturation
    #[arg(long, env = "QUARRY_K1", default_value = "1.2")]
    k1: f32,

    /// BM25 length normalization
    #[arg(long, env = "QUARRY_B", default_value = "0.75")]
    b: f32,

    /// Index name
    #[arg(long, env = "QUARRY_INDEX", default_value = "default")]
    index: String,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    info!("Starting quarry v{}", quarry::VERSION);

    let schema: Value = read_json(&args.schema)?;
    let mapping = IndexMapping::from_json(&schema)?;
    let settings = EngineSettings::default().with_bm25(args.k1, args.b);
    let index = Index::new(args.index.clone(), mapping, &AnalyzerRegistry::default(), settings)?;

    let docs = fs::read_to_string(&args.docs)
        .with_context(|| format!("failed to read {}", args.docs.display()))?;
    let skipped = index_lines(&index, &docs, &args.docs.display().to_string());
    info!(
        "Indexed {} documents ({} skipped)",
        index.doc_count(),
        skipped
    );

    let mut request = SearchRequest::new().with_offset(args.offset);
    if let Some(query) = &args.query {
        request = request.with_query(serde_json::from_str(query).context("invalid --query JSON")?);
    }
    if let Some(aggs) = &args.aggs {
        request = request.with_aggs(serde_json::from_str(aggs).context("invalid --aggs JSON")?);
    }
    if let Some(limit) = args.limit {
        request = request.with_limit(limit);
    }

    let response = index.execute(&request)?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

/// Index every ndjson line, skipping lines that fail to parse or index
///
/// Returns the number of skipped lines.
fn index_lines(index: &Index, docs: &str, source: &str) -> usize {
    let mut skipped = 0;
    for (line_no, line) in docs.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let doc = match Document::from_json_line(line) {
            Ok(doc) => doc,
            Err(e) => {
                warn!("Skipping {}:{}: {}", source, line_no + 1, e);
                skipped += 1;
                continue;
            }
        };
        if let Err(e) = index.add_document(doc.id, &doc.source) {
            warn!("Skipping document {}: {}", doc.id, e);
            skipped += 1;
        }
    }
    skipped
}

fn read_json(path: &Path) -> Result<Value> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid JSON in {}", path.display()))
}
