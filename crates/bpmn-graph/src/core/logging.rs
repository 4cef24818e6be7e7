//! Logging infrastructure for the element graph
//!
//! Structured logging uses the `tracing` crate. The engines emit spans and
//! events; this module installs a `tracing-subscriber` registry that decides
//! where they go.
//!
//! # Usage
//!
//! ```rust
//! use bpmn_graph::core::logging::init_logging;
//!
//! // Defaults: info level, compact format
//! let _ = init_logging(None, None);
//!
//! // Custom level and format
//! let _ = init_logging(Some("debug"), Some("pretty"));
//! ```
//!
//! # Log Formats
//!
//! - `compact`: single line per event
//! - `pretty`: multi-line with source locations, for development
//! - `json`: one JSON object per event, for log aggregation
//!
//! # Environment Variables
//!
//! - `BPMN_GRAPH_LOG_LEVEL`: log level (trace|debug|info|warn|error|off)
//! - `BPMN_GRAPH_LOG_FORMAT`: log format (compact|pretty|json)
//! - `RUST_LOG`: standard `EnvFilter` directives, takes precedence over the level
//!
//! # Filtering Logs
//!
//! ```bash
//! # Only traversal steps
//! RUST_LOG="bpmn_graph::engine::traversal=trace" bpmn-graph fronts -i diagram.json --id Task_2
//!
//! # Everything at info, merges at debug
//! RUST_LOG="info,bpmn_graph::engine::merge=debug" bpmn-graph update -i diagram.json --id Task_1 --patch patch.json
//! ```

use std::fmt;
use std::str::FromStr;

use tracing_subscriber::{
    fmt::{self as subscriber_fmt, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

/// Environment variable holding the log level
pub const LOG_LEVEL_ENV: &str = "BPMN_GRAPH_LOG_LEVEL";

/// Environment variable holding the log format
pub const LOG_FORMAT_ENV: &str = "BPMN_GRAPH_LOG_FORMAT";

/// Log format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Compact single-line format
    #[default]
    Compact,
    /// Pretty multi-line format with colors
    Pretty,
    /// JSON format for log aggregation
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Compact => write!(f, "compact"),
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

impl LogFormat {
    /// Get all valid format names
    pub fn variants() -> &'static [&'static str] {
        &["compact", "pretty", "json"]
    }
}

fn build_filter(level: &str) -> EnvFilter {
    if level == "off" {
        return EnvFilter::new("off");
    }
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize the global tracing subscriber
///
/// * `level` - trace|debug|info|warn|error|off. Falls back to
///   `BPMN_GRAPH_LOG_LEVEL`, then `RUST_LOG`, then `info`.
/// * `format` - compact|pretty|json. Falls back to `BPMN_GRAPH_LOG_FORMAT`,
///   then `compact`.
///
/// Fails when the format is unknown or a global subscriber is already set.
pub fn init_logging(
    level: Option<&str>,
    format: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = level
        .map(|s| s.to_string())
        .or_else(|| std::env::var(LOG_LEVEL_ENV).ok())
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "info".to_string());

    let log_format = format
        .map(|s| s.to_string())
        .or_else(|| std::env::var(LOG_FORMAT_ENV).ok())
        .unwrap_or_else(|| LogFormat::default().to_string());

    let format =
        LogFormat::from_str(&log_format).map_err(|e| format!("Invalid log format: {}", e))?;
    let filter = build_filter(&log_level);

    match format {
        LogFormat::Compact => {
            Registry::default()
                .with(filter)
                .with(
                    subscriber_fmt::Layer::default()
                        .with_target(false)
                        .with_level(true)
                        .with_span_events(FmtSpan::NONE)
                        .with_writer(std::io::stderr),
                )
                .try_init()?;
        }
        LogFormat::Pretty => {
            Registry::default()
                .with(filter)
                .with(
                    subscriber_fmt::Layer::default()
                        .with_target(true)
                        .with_file(true)
                        .with_line_number(true)
                        .with_span_events(FmtSpan::ACTIVE)
                        .with_writer(std::io::stderr)
                        .pretty(),
                )
                .try_init()?;
        }
        LogFormat::Json => {
            Registry::default()
                .with(filter)
                .with(
                    subscriber_fmt::Layer::default()
                        .with_target(true)
                        .with_file(true)
                        .with_line_number(true)
                        .with_span_events(FmtSpan::ACTIVE)
                        .with_writer(std::io::stderr)
                        .json(),
                )
                .try_init()?;
        }
    }

    Ok(())
}

/// Initialize logging with default settings (info level, compact format)
pub fn init_default_logging() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(None, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!(LogFormat::from_str("compact").unwrap(), LogFormat::Compact);
        assert_eq!(LogFormat::from_str("pretty").unwrap(), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str("JSON").unwrap(), LogFormat::Json);
        assert!(LogFormat::from_str("xml").is_err());
    }

    #[test]
    fn test_log_format_display_round_trips() {
        for name in LogFormat::variants() {
            let format = LogFormat::from_str(name).unwrap();
            assert_eq!(format.to_string(), *name);
        }
    }
}
