//! Logger initialization.
//!
//! Every line is tagged with the analysis the process runs, so interleaved
//! output from the task client, the validator and the progress reporter can
//! be attributed to one check.

use std::io::Write;

use crate::config::{CheckKind, LogFormat};
use crate::error_handling::InitializationError;
use colored::*;
use log::{Level, LevelFilter};
use serde_json::json;

const CRATE_PREFIX: &str = "cheaterbuster::";

/// Initializes the logger for one check.
///
/// `level` overrides `RUST_LOG`; HTTP stack crates stay at info so raw task
/// payloads (debug level) are not drowned out. JSON lines carry `ts`,
/// `level`, `check`, `component` and `msg` fields.
///
/// # Errors
///
/// Returns `InitializationError::LoggerError` if a logger is already set.
///
/// # Examples
///
/// ```bash
/// # Raw task payloads are logged at debug level by the task client
/// cheaterbuster shot.png --check conversation --log-level debug
///
/// # One JSON object per line, tagged with "check":"location"
/// cheaterbuster photo.jpg --check location --log-format json
/// ```
pub fn init_logger_with(
    level: LevelFilter,
    format: LogFormat,
    check: CheckKind,
) -> Result<(), InitializationError> {
    colored::control::set_override(true);

    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(level);
    for noisy in ["reqwest", "hyper", "hyper_util"] {
        builder.filter_module(noisy, LevelFilter::Info);
    }
    builder.filter_module("cheaterbuster", level);

    match format {
        LogFormat::Json => {
            builder.format(move |buf, record| {
                let line = json_line(
                    chrono::Utc::now().timestamp_millis(),
                    check,
                    record.level(),
                    record.target(),
                    &record.args().to_string(),
                );
                writeln!(buf, "{line}")
            });
        }
        LogFormat::Plain => {
            builder.format(move |buf, record| {
                writeln!(
                    buf,
                    "{} {} {} [{}] {}",
                    level_emoji(record.level()),
                    format!("[{check}]").as_str().bold(),
                    component(record.target()).cyan(),
                    colored_level(record.level()),
                    record.args()
                )
            });
        }
    }

    builder.try_init().map_err(InitializationError::from)?;
    Ok(())
}

/// Module path without the crate prefix, e.g. `task::client`.
fn component(target: &str) -> &str {
    target.strip_prefix(CRATE_PREFIX).unwrap_or(target)
}

fn json_line(ts_millis: i64, check: CheckKind, level: Level, target: &str, message: &str) -> String {
    json!({
        "ts": ts_millis,
        "level": level.as_str(),
        "check": check,
        "component": component(target),
        "msg": message,
    })
    .to_string()
}

fn colored_level(level: Level) -> ColoredString {
    let text = level.as_str();
    match level {
        Level::Error => text.red(),
        Level::Warn => text.yellow(),
        Level::Info => text.green(),
        Level::Debug => text.blue(),
        Level::Trace => text.purple(),
    }
}

fn level_emoji(level: Level) -> &'static str {
    match level {
        Level::Error => "❌",
        Level::Warn => "⚠️",
        Level::Info => "✔️",
        Level::Debug => "🔍",
        Level::Trace => "🔬",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_component_strips_crate_prefix() {
        assert_eq!(component("cheaterbuster::task::client"), "task::client");
        assert_eq!(component("reqwest::connect"), "reqwest::connect");
    }

    #[test]
    fn test_json_line_carries_check_and_component() {
        let line = json_line(
            1_700_000_000_000,
            CheckKind::Location,
            Level::Warn,
            "cheaterbuster::analysis::auth",
            "Authentication failed: \"503\"",
        );
        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["ts"], 1_700_000_000_000_i64);
        assert_eq!(value["level"], "WARN");
        assert_eq!(value["check"], "location");
        assert_eq!(value["component"], "analysis::auth");
        assert_eq!(value["msg"], "Authentication failed: \"503\"");
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_init_logger_twice_returns_error() {
        let _ = init_logger_with(LevelFilter::Debug, LogFormat::Json, CheckKind::Profile);
        let second = init_logger_with(LevelFilter::Debug, LogFormat::Json, CheckKind::Profile);
        assert!(matches!(second, Err(InitializationError::LoggerError(_))));
    }
}
