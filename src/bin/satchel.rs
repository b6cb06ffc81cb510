//! satchel CLI: ingest, query, and manage a local document corpus.
//!
//! Exit codes: 0 success, 2 configuration error, 3 ingest failure,
//! 4 query failure, 1 anything else.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use satchel::{
    maybe_seed_samples, ChatMode, Engine, IngestInput, IngestOptions, Preset, QueryRequest,
    RagConfig, RetrievalMode,
};

const EXIT_CONFIG: u8 = 2;
const EXIT_INGEST: u8 = 3;
const EXIT_QUERY: u8 = 4;

#[derive(Parser)]
#[command(name = "satchel", version, about = "Local retrieval-augmented QA over your documents")]
struct Cli {
    /// Database file holding the corpus and indices.
    #[arg(long, global = true, default_value = "satchel.redb")]
    db: PathBuf,

    /// YAML configuration file (overrides the preset).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Configuration preset: fast, balanced, or accurate.
    #[arg(long, global = true)]
    preset: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest files (txt, md, pdf) into the corpus.
    Ingest {
        /// Paths to ingest, kind inferred from the extension.
        files: Vec<PathBuf>,
    },
    /// Ask a question over the corpus.
    Query {
        /// The question or search phrase.
        text: String,
        /// Retrieval mode: lexical, semantic, or hybrid.
        #[arg(long)]
        mode: Option<String>,
        /// Result budget (1-30).
        #[arg(long)]
        top_k: Option<usize>,
        /// Semantic weight for hybrid fusion (0.0-1.0).
        #[arg(long)]
        alpha: Option<f32>,
        /// Force the polish post-processor on.
        #[arg(long)]
        polish: bool,
        /// Generate an answer instead of just retrieving.
        #[arg(long)]
        chat: bool,
    },
    /// Seed the bundled sample corpus when the store is empty.
    Seed,
    /// Delete every document, chunk, vector, and index.
    Reset,
    /// Print corpus and latency statistics.
    Stats,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    run(cli).await
}

async fn run(cli: Cli) -> ExitCode {
    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("config error: {message}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let engine = match Engine::builder().open(&cli.db) {
        Ok(builder) => match builder.config(config).build() {
            Ok(engine) => engine,
            Err(err) => {
                eprintln!("config error: {err}");
                return ExitCode::from(EXIT_CONFIG);
            }
        },
        Err(err) => {
            eprintln!("failed to open {}: {err}", cli.db.display());
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    match cli.command {
        Command::Ingest { files } => ingest_files(&engine, &files).await,
        Command::Query {
            text,
            mode,
            top_k,
            alpha,
            polish,
            chat,
        } => query(&engine, text, mode, top_k, alpha, polish, chat).await,
        Command::Seed => match maybe_seed_samples(&engine).await {
            Ok(count) => {
                println!("seeded {count} sample document(s)");
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("seed failed: {err}");
                ExitCode::from(EXIT_INGEST)
            }
        },
        Command::Reset => match engine.reset() {
            Ok(()) => {
                println!("corpus reset");
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("reset failed: {err}");
                ExitCode::FAILURE
            }
        },
        Command::Stats => match engine.stats() {
            Ok(stats) => {
                println!(
                    "docs: {}  chunks: {}  vectors: {}  lexical index: {}",
                    stats.docs,
                    stats.chunks,
                    stats.vectors,
                    if stats.lexical_fresh { "fresh" } else { "absent" }
                );
                let l = stats.latency;
                if l.count > 0 {
                    println!(
                        "query latency over last {}: p50 {}ms  p95 {}ms  p99 {}ms  mean {:.1}ms",
                        l.count, l.p50_ms, l.p95_ms, l.p99_ms, l.mean_ms
                    );
                }
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("stats failed: {err}");
                ExitCode::FAILURE
            }
        },
    }
}

fn resolve_config(cli: &Cli) -> Result<RagConfig, String> {
    if let Some(path) = &cli.config {
        return RagConfig::from_file(path).map_err(|e| e.to_string());
    }
    if let Some(preset) = &cli.preset {
        let preset: Preset = preset.parse().map_err(|e: satchel::ConfigError| e.to_string())?;
        return Ok(preset.config());
    }
    Ok(RagConfig::default())
}

async fn ingest_files(engine: &Engine, files: &[PathBuf]) -> ExitCode {
    if files.is_empty() {
        eprintln!("nothing to ingest");
        return ExitCode::from(EXIT_INGEST);
    }
    for path in files {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                eprintln!("cannot read {}: {err}", path.display());
                return ExitCode::from(EXIT_INGEST);
            }
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let input = match IngestInput::from_named_bytes(name, bytes) {
            Ok(input) => input,
            Err(err) => {
                eprintln!("cannot ingest {}: {err}", path.display());
                return ExitCode::from(EXIT_INGEST);
            }
        };

        let options = IngestOptions {
            cancel: None,
            on_progress: Some(Arc::new(|p: f32| {
                tracing::debug!(progress = p, "ingest progress");
            })),
        };
        match engine.ingest(input, options).await {
            Ok(doc) => {
                let chunks = engine
                    .store()
                    .chunks_for_doc(&doc.id)
                    .map(|c| c.len())
                    .unwrap_or(0);
                println!("ingested {} as {} ({chunks} chunks)", doc.name, doc.id);
            }
            Err(err) => {
                eprintln!("ingest of {} failed: {err}", path.display());
                return ExitCode::from(EXIT_INGEST);
            }
        }
    }
    ExitCode::SUCCESS
}

#[allow(clippy::too_many_arguments)]
async fn query(
    engine: &Engine,
    text: String,
    mode: Option<String>,
    top_k: Option<usize>,
    alpha: Option<f32>,
    polish: bool,
    chat: bool,
) -> ExitCode {
    let mut request = QueryRequest::new(text);
    if let Some(mode) = mode {
        match mode.parse::<RetrievalMode>() {
            Ok(mode) => request.mode = Some(mode),
            Err(err) => {
                eprintln!("config error: {err}");
                return ExitCode::from(EXIT_CONFIG);
            }
        }
    }
    request.top_k = top_k;
    request.alpha = alpha;
    if polish {
        request.polish = Some(true);
    }
    if chat {
        request.chat_mode = ChatMode::Chat;
    }

    match engine.query(request).await {
        Ok(result) => {
            if let Some(answer) = &result.generated_answer {
                println!("{}", answer.answer);
                println!();
            }
            if result.citations.is_empty() {
                println!("no matches");
            }
            for (rank, citation) in result.citations.iter().enumerate() {
                let score = citation
                    .score
                    .map(|s| format!("{s:.4}"))
                    .unwrap_or_else(|| "-".into());
                println!(
                    "{:>2}. [{}] {} p.{} - {}",
                    rank + 1,
                    score,
                    citation.doc_name,
                    citation.page_number,
                    snippet(&citation.text, 100),
                );
            }
            tracing::info!(
                retrieval_ms = result.latency.retrieval_ms,
                total_ms = result.latency.total_ms,
                "query complete"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("query failed: {err}");
            ExitCode::from(EXIT_QUERY)
        }
    }
}

fn snippet(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let cut: String = text.chars().take(limit).collect();
    format!("{}…", cut.trim_end())
}
