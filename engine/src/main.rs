// AgriSage
// Main entry point for the agrisage binary

use agrisage_engine::cli::{Cli, Command};
use agrisage_engine::config::Config;
use agrisage_engine::handlers::{handle_ask, handle_check, handle_config, OutputFormat};
use agrisage_engine::telemetry::init_telemetry_with_level;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::default_config_path()?,
    };
    let config = if cli.config.is_some() {
        Config::load_from_path(&config_path)?
    } else {
        Config::load_or_create()?
    };

    // Priority: RUST_LOG > --log > config file
    init_telemetry_with_level(cli.log.as_deref().unwrap_or(&config.core.log_level));

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");

    tracing::info!("AgriSage v{} ({} - {})", version, commit, timestamp);

    match cli.command {
        Command::Check { text } => {
            tracing::info!("Running guardrail check");
            handle_check(&text, format)
        }

        Command::Ask { query, user, farm } => {
            tracing::info!("Answering query for user {}", user);
            handle_ask(query, user, farm.into(), &config, format).await
        }

        Command::Config => handle_config(&config, &config_path, format),
    }
}
