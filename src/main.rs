//! Neural Engine - command-line front-end
//!
//! Builds an engine from `neural-engine.yaml` (plus env overrides), runs
//! requests through it and prints results as JSON on stdout. Logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use neural_engine::encoding::RequestShape;
use neural_engine::events::EventBus;
use neural_engine::metrics::InMemoryMetrics;
use neural_engine::{Config, NeuralEngine};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "neural-engine")]
#[command(about = "Layered neural simulation engine")]
struct Cli {
    /// Path to the YAML config file (default: ./neural-engine.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Seed for the random source (overrides config and NEURAL_ENGINE_SEED)
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process one request (optionally several times)
    Process {
        /// Request type
        #[arg(short = 't', long = "type")]
        request_type: String,

        /// Free-text content
        #[arg(short, long)]
        content: Option<String>,

        /// Priority in [0, 1]
        #[arg(short, long)]
        priority: Option<f64>,

        /// Keyword (repeatable)
        #[arg(short, long = "keyword")]
        keywords: Vec<String>,

        /// How many times to submit the request
        #[arg(short, long, default_value = "1")]
        repeat: usize,
    },

    /// Initialize the engine and print its status
    Status,

    /// Process every request in a JSON array file
    Replay {
        /// Path to the JSON file
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::from_yaml_and_env(cli.config.as_deref())?;
    if let Some(seed) = cli.seed {
        config.engine.seed = Some(seed);
    }

    init_tracing(&config);

    let metrics = Arc::new(InMemoryMetrics::new());
    let bus = Arc::new(EventBus::new(config.engine.event_capacity));
    let engine = NeuralEngine::new(config.engine)
        .with_metrics(metrics.clone())
        .with_event_emitter(bus);

    engine.initialize().await?;

    match cli.command {
        Commands::Process {
            request_type,
            content,
            priority,
            keywords,
            repeat,
        } => {
            let mut request = RequestShape::new(request_type).with_keywords(keywords);
            if let Some(content) = content {
                request = request.with_content(content);
            }
            if let Some(priority) = priority {
                request = request.with_priority(priority);
            }
            for _ in 0..repeat.max(1) {
                let result = engine.process_request(request.clone()).await?;
                print_json(&result)?;
            }
        }
        Commands::Status => {}
        Commands::Replay { file } => run_replay(&engine, &file).await?,
    }

    let status = engine.shutdown().await;
    print_json(&serde_json::json!({
        "status": status,
        "metrics": metrics.snapshot(),
    }))
}

fn init_tracing(config: &Config) {
    let default_filter = config
        .log_filter
        .clone()
        .unwrap_or_else(|| "info,neural_engine=debug".into());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    let json = config.log_json;
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| fmt::layer().with_writer(std::io::stderr)))
        .init();
}

async fn run_replay(engine: &NeuralEngine, path: &std::path::Path) -> Result<()> {
    tracing::info!("Replaying requests from {}", path.display());

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let requests: Vec<serde_json::Value> = serde_json::from_str(&contents)
        .with_context(|| format!("{} is not a JSON array", path.display()))?;

    let mut failed = 0;
    for (index, value) in requests.into_iter().enumerate() {
        match engine.process_value(value).await {
            Ok(result) => print_json(&result)?,
            Err(e) => {
                failed += 1;
                tracing::warn!(index, error = %e, "Replay request failed");
                print_json(&serde_json::json!({
                    "index": index,
                    "error": e.to_string(),
                    "kind": e.kind(),
                }))?;
            }
        }
    }

    tracing::info!(failed, "Replay complete");
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
