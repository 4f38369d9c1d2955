use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use garmin_sheets_sync::cli::{Cli, run_command};
use garmin_sheets_sync::prompt::StdinPrompter;
use garmin_sheets_sync::{Profiles, Settings};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let dotenv = dotenvy::dotenv();

    // Configure logging from env var `GARMIN_SYNC_LOG_LEVEL` (or fallback to `RUST_LOG`, default `info`).
    let log_env = std::env::var("GARMIN_SYNC_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());

    // Keep HTTP internals quiet by default
    let combined_filter = format!("{},hyper=warn,reqwest=warn", log_env);
    let env_filter = tracing_subscriber::EnvFilter::try_new(combined_filter)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,hyper=warn,reqwest=warn"));
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(env_filter)
        .init();
    tracing::debug!("garmin_sheets_sync: log filter: {}", log_env);

    if let Err(e) = dotenv {
        tracing::warn!("no .env file loaded ({e}); using the process environment only");
    }

    let cli = Cli::parse();

    tokio::select! {
        result = run(cli) => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!("{e:#}");
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            println!("\nOperation cancelled by user.");
            // A prompt may still be blocked reading stdin; do not wait for it.
            std::process::exit(0);
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::from_env().context("loading configuration")?;
    let profiles = Profiles::from_env();
    tracing::debug!("garmin_sheets_sync: {} profile(s) configured", profiles.len());

    let mut prompter = StdinPrompter;
    run_command(cli.command, &settings, &profiles, &mut prompter).await?;
    Ok(())
}
