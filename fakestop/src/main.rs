/*
fakestop - single-binary main.rs
Starts the HTTP API by default; `analyze` and `history` run one request from the terminal.
*/

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::{init_db_pool, Config};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use fakestop::analysis::{AnalysisOptions, AnalysisService};
use fakestop::llm::remote::RemoteLlmProvider;
use fakestop::llm::LlmProvider;
use fakestop::pipeline::PipelineExecutor;
use fakestop::server::launch_rocket;
use fakestop::storage::{AnalysisRecord, AnalysisStore};
use fakestop::Error;

#[derive(Parser, Debug)]
#[command(name = "fakestop", about = "Multi-agent news credibility checker")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API (default)
    Serve,
    /// Analyse one article and print every agent's findings
    Analyze {
        /// Article text
        text: Option<String>,
        /// Read the article from a file instead
        #[arg(long, value_name = "FILE", conflicts_with = "text")]
        file: Option<PathBuf>,
    },
    /// Print the stored analyses, newest first
    History,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    // API credentials may live in a local .env file
    if let Ok(path) = dotenv::dotenv() {
        info!(path = %path.display(), "loaded environment file");
    }

    let config = load_config(args.config).await?;

    let db_path_abs = match tokio::fs::canonicalize(&config.database.path).await {
        Ok(p) => p.to_string_lossy().to_string(),
        Err(_) => config.database.path.clone(),
    };
    info!(db_path = %db_path_abs, "resolved DB path");

    let db_pool = init_db_pool(&db_path_abs).await.map_err(|e| {
        error!(%e, db_path = %db_path_abs, "failed to initialize database pool");
        e
    })?;
    let store = AnalysisStore::new(db_pool);
    store.initialize().await.context("failed to prepare analyses table")?;

    let command = args.command.unwrap_or(Command::Serve);

    if let Command::History = command {
        let records = store.list_all().await?;
        print_history(&records);
        return Ok(());
    }

    let llm_config = config.llm.as_ref().context("missing [llm] section in configuration")?;
    let provider: Arc<dyn LlmProvider> = Arc::from(create_llm_provider(llm_config)?);
    let options = AnalysisOptions {
        temperature: config.pipeline.as_ref().and_then(|p| p.temperature),
        classification_uses_findings: config.classification_uses_findings(),
    };
    let service = Arc::new(AnalysisService::new(PipelineExecutor::new(provider), store, options));

    match command {
        Command::Analyze { text, file } => {
            let document = match (text, file) {
                (Some(text), _) => text,
                (None, Some(path)) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("Failed to read article: {}", path.display()))?,
                (None, None) => anyhow::bail!("provide the article text or --file"),
            };
            run_analysis(&service, &document).await
        }
        Command::Serve => {
            info!("Launching Rocket HTTP server");
            launch_rocket(service, config.server.as_ref()).await?;
            info!("Shutdown complete");
            Ok(())
        }
        Command::History => Ok(()),
    }
}

/// config.default.toml, overridden by --config or ./config.toml
async fn load_config(explicit: Option<PathBuf>) -> Result<Config> {
    let default_path = PathBuf::from("config.default.toml");

    let override_path = if let Some(p) = explicit {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            anyhow::bail!("Config file not found: {}", p.display());
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() { Some(p) } else { None }
    };

    let config = Config::load_with_defaults(
        if default_path.exists() { Some(&default_path) } else { None },
        override_path.as_deref(),
    )
    .await
    .map_err(|e| {
        error!(%e, "failed to load configuration");
        e
    })?;
    info!(default = ?default_path, override = ?override_path, "configuration loaded");
    Ok(config)
}

/// Create an LLM provider based on configuration. The API key is read here, once.
fn create_llm_provider(llm_config: &common::LlmConfig) -> Result<Box<dyn LlmProvider>> {
    let adapter = llm_config.adapter.as_deref().unwrap_or("remote");
    match adapter {
        "remote" => {
            let remote_config = llm_config.remote.clone().unwrap_or_default();

            let api_key_env = remote_config.api_key_env.as_deref().unwrap_or("OPENAI_API_KEY");
            let api_key = std::env::var(api_key_env)
                .with_context(|| format!("LLM API key env var '{}' not set", api_key_env))?;

            let model = remote_config.model.unwrap_or_else(|| "gpt-4o-mini".to_string());
            let api_url = remote_config
                .api_url
                .unwrap_or_else(|| "https://api.openai.com/v1/chat/completions".to_string());

            let provider = RemoteLlmProvider::new(api_url.clone(), api_key, model).with_defaults(
                remote_config.timeout_seconds.unwrap_or(60),
                remote_config.max_tokens.unwrap_or(1500),
                remote_config.temperature.unwrap_or(0.7),
            );
            info!(model = provider.model(), api_url = %api_url, "LLM provider initialized");
            Ok(Box::new(provider))
        }
        _ => anyhow::bail!("Unknown LLM adapter type: {}", adapter),
    }
}

async fn run_analysis(service: &AnalysisService, document: &str) -> Result<()> {
    match service.analyze(document).await {
        Ok(outcome) => {
            for (i, record) in outcome.investigation.iter().chain(&outcome.classification).enumerate() {
                println!("== {} - Task {} ({})", record.agent_label, i + 1, record.stage_label);
                println!("{}\n", record.text);
            }
            println!(
                "Stored as analysis #{} ({} tokens)",
                outcome.record.id, outcome.usage.total_tokens
            );
            Ok(())
        }
        Err(Error::StageExecution(e)) => {
            for record in fakestop::pipeline::flatten(&e.partial) {
                println!("== {} ({})", record.agent_label, record.stage_label);
                println!("{}\n", record.text);
            }
            Err(anyhow::Error::new(*e).context("analysis aborted; nothing was stored"))
        }
        Err(e) => Err(e.into()),
    }
}

fn print_history(records: &[AnalysisRecord]) {
    if records.is_empty() {
        println!("No analyses stored yet.");
        return;
    }
    for r in records {
        println!("Analysis #{} ({})", r.id, r.created_at.to_rfc3339());
        println!("  Article:        {}", r.document);
        println!("  Collector:      {}", r.collector_result);
        println!("  Linguistic:     {}", r.linguistic_result);
        println!("  Fact check:     {}", r.factcheck_result);
        println!("  Classification: {}", r.classification_result);
        println!();
    }
}
