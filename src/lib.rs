//! cheaterbuster library: photo analysis against remote task backends
//!
//! This library submits a photo to one of three remote analyses (reverse-image
//! profile search, conversation risk analysis, location inference), polls the
//! server-side task to completion, normalizes loosely structured multi-engine
//! responses, and keeps only the matches whose image and page actually load.
//!
//! # Example
//!
//! ```no_run
//! use cheaterbuster::{run_check, CheckKind, Config};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config {
//!     file: std::path::PathBuf::from("screenshot.png"),
//!     check: CheckKind::Conversation,
//!     mock: true,
//!     ..Default::default()
//! };
//!
//! let report = run_check(config).await?;
//! match report.outcome.error {
//!     Some(message) => println!("Failed: {message}"),
//!     None => println!("Done in {:.1}s", report.elapsed_seconds),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

pub mod analysis;
mod app;
pub mod config;
pub mod error_handling;
pub mod initialization;
pub mod models;
pub mod normalize;
pub mod progress;
pub mod task;
pub mod validate;

// Re-export public API
pub use analysis::{AnalysisBackend, AnalysisOutcome, Analyzer, FixtureBackend, LiveBackend};
pub use app::{favicon_url, normalized_web_url};
pub use config::{CheckKind, Config, LogFormat, LogLevel};
pub use error_handling::{AnalysisError, ErrorType};
pub use models::AnalysisResult;
pub use run::{run_check, CheckReport};

// Internal run module (wires one analysis end to end)
mod run {
    use std::sync::Arc;

    use anyhow::{Context, Result};
    use log::info;
    use serde::Serialize;
    use tokio::signal;

    use crate::analysis::{
        AnalysisBackend, AnalysisOutcome, Analyzer, FixtureBackend, LiveBackend,
        MemoryCredentialStore,
    };
    use crate::app::log_progress;
    use crate::config::Config;
    use crate::initialization::*;
    use crate::models::MemoryResultSink;
    use crate::task::ImageUpload;
    use crate::validate::{MatchValidator, MemoryImageCache, ValidationWindows};

    /// Result of one analysis run.
    #[derive(Debug, Clone, Serialize)]
    pub struct CheckReport {
        /// The domain result, or the message shown in its place
        pub outcome: AnalysisOutcome,
        /// Whether fixtures were served instead of the network
        pub mock: bool,
        /// Elapsed time in seconds
        pub elapsed_seconds: f64,
    }

    /// Runs one analysis with the provided configuration.
    ///
    /// Reads the image file, builds the backend (live services or fixtures),
    /// runs the selected flow with progress logging, and returns the outcome.
    /// Ctrl-C cancels the flow.
    ///
    /// # Errors
    ///
    /// Only setup failures are returned as errors (unreadable image, HTTP
    /// client construction). Analysis failures are reported inside
    /// [`CheckReport::outcome`].
    pub async fn run_check(config: Config) -> Result<CheckReport> {
        let bytes = tokio::fs::read(&config.file)
            .await
            .with_context(|| format!("Failed to read image {}", config.file.display()))?;
        let image = ImageUpload::from_bytes(bytes);
        info!(
            "Loaded {} ({} bytes, {})",
            config.file.display(),
            image.len(),
            image.mime_type
        );

        let client = init_client(&config).context("Failed to initialize HTTP client")?;
        let probe_client =
            init_probe_client(&config).context("Failed to initialize probe client")?;

        let backend: Arc<dyn AnalysisBackend> = if config.mock {
            info!("Mock mode: serving fixtures from {}", config.fixtures_dir.display());
            Arc::new(FixtureBackend::from_config(&config))
        } else {
            Arc::new(LiveBackend::from_config(
                &config,
                client,
                Arc::new(MemoryCredentialStore::new()),
            ))
        };
        let validator = MatchValidator::new(
            probe_client,
            Arc::new(MemoryImageCache::new()),
            ValidationWindows::from(&config),
        );
        let analyzer =
            Analyzer::new(backend, validator).with_sink(Arc::new(MemoryResultSink::new()));

        let cancel = init_cancellation();
        let ctrl_c_cancel = cancel.clone();
        let ctrl_c = tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                info!("Interrupted, cancelling analysis");
                ctrl_c_cancel.cancel();
            }
        });

        let kind = config.check;
        let label = kind.to_string();
        let hints = kind.analyze_hints();
        let start_time = std::time::Instant::now();
        let outcome = analyzer
            .analyze(kind, &image, &cancel, |state| {
                log_progress(&label, state, hints)
            })
            .await;
        ctrl_c.abort();

        Ok(CheckReport {
            outcome,
            mock: config.mock,
            elapsed_seconds: start_time.elapsed().as_secs_f64(),
        })
    }
}
