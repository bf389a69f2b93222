//! Harvester CLI entry point.

use anyhow::Result;
use clap::Parser;
use harvester::cli::{commands, Cli, Commands};
use harvester::config::{PathProbe, PreferenceSources, Preferences};
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
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("harvester={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Resolve preferences: file, then HARVESTER_* environment, then flags
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(Preferences::default_config_path);
    let sources = cli.command.overrides().into_iter().fold(
        PreferenceSources::from_process(Some(config_path.clone())),
        |sources, (key, value)| sources.with_override(key, value),
    );
    let preferences = Preferences::resolve_from(&sources, &PathProbe);

    // Execute command
    match &cli.command {
        Commands::Fetch {
            criteria,
            mode,
            json,
            ..
        } => {
            commands::run_fetch(criteria, *mode, *json, preferences).await?;
        }

        Commands::Search { criteria, json, .. } => {
            commands::run_search(criteria, *json, preferences).await?;
        }

        Commands::Voice { action } => {
            commands::run_voice(action, preferences).await?;
        }

        Commands::Session { .. } => {
            commands::run_session(preferences).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, &preferences, &config_path)?;
        }

        Commands::Doctor => {
            commands::run_doctor(&preferences, &config_path)?;
        }
    }

    Ok(())
}
