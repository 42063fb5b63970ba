//! Zabbot CLI
//!
//! Command-line interface for inspecting how operator questions are
//! classified and which monitoring context they pull in.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use zabbot_context::{
    BundleRenderer, Chatbot, ContextAggregator, HostExtractor, IntentClassifier, SnapshotSource,
};
use zabbot_core::ChatConfig;

#[derive(Parser)]
#[command(name = "zabbot")]
#[command(about = "Zabbot - monitoring context assistant")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.zabbot/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the intents detected in a question
    Classify {
        /// Operator question
        text: String,
    },

    /// Show the host hint extracted from a question
    Host {
        /// Operator question
        text: String,
    },

    /// Gather the context bundle for a question
    Gather {
        /// JSON snapshot of the monitoring data
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Print prompt-ready text instead of JSON
        #[arg(long)]
        render: bool,

        /// Optional session identifier for log correlation
        #[arg(long)]
        session: Option<String>,

        /// Operator question
        text: String,
    },

    /// Check the data source and cache
    Health {
        /// JSON snapshot of the monitoring data
        #[arg(short, long)]
        snapshot: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Classify { text } => cmd_classify(&text),
        Commands::Host { text } => cmd_host(&config, &text),
        Commands::Gather {
            snapshot,
            render,
            session,
            text,
        } => cmd_gather(&config, &snapshot, render, session.as_deref(), &text).await,
        Commands::Health { snapshot } => cmd_health(&config, &snapshot).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<ChatConfig> {
    match path {
        Some(path) => ChatConfig::load_from_with_overrides(path, |key| std::env::var(key).ok())
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(ChatConfig::load()),
    }
}

fn cmd_classify(text: &str) -> Result<()> {
    let intents = IntentClassifier::new().classify(text);
    println!("{}", intents.names().join(", "));
    Ok(())
}

fn cmd_host(config: &ChatConfig, text: &str) -> Result<()> {
    match HostExtractor::with_fallback(config.host_fallback).extract(text) {
        Some(hint) => println!("{} ({:?})", hint.name, hint.rule),
        None => println!("No host mentioned."),
    }
    Ok(())
}

async fn build_chatbot(config: &ChatConfig, snapshot: &Path) -> Result<Chatbot> {
    let source = SnapshotSource::load(snapshot)
        .await
        .with_context(|| format!("Failed to load snapshot {}", snapshot.display()))?;
    tracing::debug!(sections = ?source.sections(), "Using snapshot data source");
    let aggregator = ContextAggregator::new(Arc::new(source), config);
    Ok(Chatbot::new(aggregator, None))
}

async fn cmd_gather(
    config: &ChatConfig,
    snapshot: &Path,
    render: bool,
    session: Option<&str>,
    text: &str,
) -> Result<()> {
    let chatbot = build_chatbot(config, snapshot).await?;
    let (intents, result) = chatbot.gather(text, session).await;

    println!("Intents:    {}", intents.names().join(", "));
    match &result.host {
        Some(host) => println!("Host:       {} (id {})", host.hint.name, host.host_id),
        None => println!("Host:       -"),
    }
    println!("Operations:");
    for op in result.operations.as_slice() {
        println!("  {}", op);
    }
    println!();

    if render {
        let renderer = BundleRenderer::from_config(&config.render);
        println!("{}", renderer.render(&result.bundle));
    } else {
        let json = serde_json::to_string_pretty(&result.bundle)
            .context("Failed to serialize context bundle")?;
        println!("{}", json);
    }

    Ok(())
}

async fn cmd_health(config: &ChatConfig, snapshot: &Path) -> Result<()> {
    let chatbot = build_chatbot(config, snapshot).await?;
    let health = chatbot.health().await;

    println!("Chatbot:     {}", health.chatbot);
    println!("Data source: {}", health.data_source);
    println!("Generator:   {}", health.generator);
    println!("Cache size:  {}", health.cache_size);
    println!("Hit rate:    {:.1}%", health.cache_hit_rate * 100.0);
    println!("Requests:    {}", health.requests_total);
    println!("Avg latency: {:.1}ms", health.avg_latency_ms);
    println!("Uptime:      {}s", health.uptime_secs);
    for latency in &health.fetch_latency {
        println!(
            "  {:<32} n={:<5} p50={:.1}ms p99={:.1}ms",
            latency.operation, latency.samples, latency.p50_ms, latency.p99_ms
        );
    }
    println!("Checked at:  {}", health.timestamp);

    Ok(())
}
