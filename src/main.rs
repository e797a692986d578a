//! Sikt CLI entry point.

use anyhow::Result;
use clap::Parser;
use sikt::cli::{commands, Cli, Commands};
use sikt::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("sikt={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&std::path::PathBuf::from(path)))?,
        None => Settings::load()?,
    };

    // Ensure the data directory exists
    std::fs::create_dir_all(settings.data_dir())?;

    match &cli.command {
        Commands::Ingest { manifest, question } => {
            commands::run_ingest(manifest, question.clone(), settings).await?;
        }

        Commands::Ask { question, job } => {
            commands::run_ask(question, job, settings).await?;
        }

        Commands::Jobs => {
            commands::run_jobs(settings).await?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(host, *port, settings).await?;
        }
    }

    Ok(())
}
