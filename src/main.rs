//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `cheaterbuster` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use cheaterbuster::initialization::init_logger_with;
use cheaterbuster::{run_check, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // The search API key lives in .env (CHEATERSEARCH_API_KEY), never in source.
    // Try the current directory first, then next to the executable
    if dotenvy::dotenv().is_err() {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let env_path = exe_dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                }
            }
        }
    }

    let config = Config::parse();

    let log_level = config.log_level.clone();
    let log_format = config.log_format.clone();
    let check = config.check;
    init_logger_with(log_level.into(), log_format, check)
        .context("Failed to initialize logger")?;

    match run_check(config).await {
        Ok(report) => {
            let title = check.result_title();
            match &report.outcome.error {
                Some(message) => eprintln!("❌ {title}: {message}"),
                None => eprintln!("✅ {title} in {:.1}s", report.elapsed_seconds),
            }
            let json = serde_json::to_string_pretty(&report)
                .context("Failed to serialize report")?;
            println!("{json}");
            if !report.outcome.is_success() {
                process::exit(2);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("cheaterbuster error: {:#}", e);
            process::exit(1);
        }
    }
}
