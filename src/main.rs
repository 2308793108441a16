//! Recap Analyzer CLI
//!
//! Reads an analysis request (JSON), runs it, and writes the `Analysis` JSON to
//! stdout or a file. Logs and progress go to stderr. Ctrl-C cancels the run
//! and writes the partial result instead.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use recap_analyzer::{
    AnalysisOrchestrator, AnalysisRequest, AnalysisStrategy, AppError, ConfigStore,
    OpenAIProvider, ProgressReporter, StaticDeploymentCatalog,
};

#[derive(Parser)]
#[command(name = "recap-analyzer", about = "Structured analysis of meeting transcripts")]
struct Cli {
    /// Request file: transcript, template and options
    #[arg(long)]
    request: PathBuf,

    /// Config file (defaults to ~/.recap/config.json when present)
    #[arg(long, env = "RECAP_CONFIG")]
    config: Option<PathBuf>,

    /// Override the request's strategy: basic, hybrid, advanced or auto
    #[arg(long)]
    strategy: Option<AnalysisStrategy>,

    /// Skip the self-evaluation pass
    #[arg(long)]
    no_evaluation: bool,

    /// Write the result here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// OpenAI-compatible endpoint base URL
    #[arg(long, env = "RECAP_BASE_URL")]
    base_url: Option<String>,

    #[arg(long, env = "RECAP_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let store = match &cli.config {
        Some(path) => ConfigStore::new(path),
        None => ConfigStore::default_location()?,
    };
    let mut config = if cli.config.is_some() {
        store.load()
    } else {
        store.load_or_default()
    }
    .with_context(|| format!("failed to load config from {}", store.path().display()))?;

    if let Some(key) = cli.api_key {
        config.provider.api_key = Some(key);
    }
    if let Some(base_url) = cli.base_url {
        config.provider.base_url = Some(base_url);
    }

    let raw = std::fs::read_to_string(&cli.request)
        .with_context(|| format!("failed to read request {}", cli.request.display()))?;
    let mut request: AnalysisRequest =
        serde_json::from_str(&raw).context("request is not a valid analysis request")?;
    if let Some(strategy) = cli.strategy {
        request.strategy = Some(strategy);
    }
    if cli.no_evaluation {
        request.run_evaluation = Some(false);
    }

    let provider = Arc::new(OpenAIProvider::new(config.provider.clone())?);
    let catalog = Arc::new(StaticDeploymentCatalog::new(config.deployments.clone()));
    let orchestrator = AnalysisOrchestrator::new(provider, catalog, config);

    let (progress, mut events) = ProgressReporter::channel();
    let progress_log = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            info!(
                "[{}/{}] {}",
                event.completed_units, event.total_units, event.message
            );
        }
    });

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling analysis");
            on_signal.cancel();
        }
    });

    let result = orchestrator.analyze(&request, &progress, &cancel).await;
    drop(progress);
    let _ = progress_log.await;

    match result {
        Ok(analysis) => {
            write_output(cli.output.as_ref(), &serde_json::to_string_pretty(&analysis)?)?;
            Ok(())
        }
        Err(AppError::Cancelled(partial)) => {
            write_output(cli.output.as_ref(), &serde_json::to_string_pretty(&partial)?)?;
            anyhow::bail!(
                "analysis cancelled after {} completed phase(s)",
                partial.completed_phases()
            )
        }
        Err(e) => Err(e.into()),
    }
}

fn write_output(path: Option<&PathBuf>, json: &str) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
