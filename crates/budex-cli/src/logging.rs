//! Logging setup for the `budex` binary
//!
//! Console output goes to stderr so that `--format json` stays machine-readable
//! on stdout. Optional JSON logs are written to a daily rolling file for bug
//! reports. `RUST_LOG` takes precedence over the built-in filter.

use std::path::PathBuf;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const QUIET_FILTER: &str = "warn,budex_data=warn,budex_drivers=warn,budex_core=warn";
const VERBOSE_FILTER: &str = "info,budex_data=debug,budex_drivers=debug,budex_core=debug";
const TRACE_FILTER: &str = "debug,budex_data=trace,budex_drivers=trace,budex_core=trace";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory where JSON log files are written
    pub log_dir: PathBuf,

    /// Whether to write JSON logs to `log_dir`
    pub enable_json_logs: bool,

    /// Whether to log to stderr
    pub enable_console_logs: bool,

    /// Whether to include file/line information in console logs
    pub include_location: bool,

    /// Whether to log span open/close events
    pub enable_spans: bool,

    /// Filter used when `RUST_LOG` is not set
    pub default_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: log_directory(),
            enable_json_logs: false,
            enable_console_logs: true,
            include_location: false,
            enable_spans: false,
            default_filter: QUIET_FILTER.to_string(),
        }
    }
}

impl LoggingConfig {
    /// Configuration for a `-v` count and the `--json-logs` flag
    pub fn for_cli(verbosity: u8, json_logs: bool) -> Self {
        let default_filter = match verbosity {
            0 => QUIET_FILTER,
            1 => VERBOSE_FILTER,
            _ => TRACE_FILTER,
        };
        Self {
            enable_json_logs: json_logs,
            include_location: verbosity > 1,
            enable_spans: verbosity > 1,
            default_filter: default_filter.to_string(),
            ..Self::default()
        }
    }
}

/// Initialize the global subscriber
pub fn init(config: LoggingConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let span_events = if config.enable_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let mut layers = Vec::new();

    if config.enable_console_logs {
        let console_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_span_events(span_events.clone())
            .compact()
            .with_filter(env_filter.clone())
            .boxed();

        layers.push(console_layer);
    }

    if config.enable_json_logs {
        std::fs::create_dir_all(&config.log_dir)?;

        let file_appender = tracing_appender::rolling::daily(&config.log_dir, "budex.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        // The writer must outlive every log call; the process exits right after main
        std::mem::forget(guard);

        let json_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_span_events(span_events)
            .with_ansi(false)
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(non_blocking)
            .with_filter(env_filter)
            .boxed();

        layers.push(json_layer);
    }

    tracing_subscriber::registry().with(layers).try_init()?;

    tracing::debug!(
        log_dir = %config.log_dir.display(),
        json_enabled = config.enable_json_logs,
        filter = %config.default_filter,
        "logging initialized"
    );

    Ok(())
}

/// `<local data dir>/budex/logs`
pub fn log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("budex")
        .join("logs")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_selects_the_filter() {
        assert_eq!(LoggingConfig::for_cli(0, false).default_filter, QUIET_FILTER);
        assert_eq!(LoggingConfig::for_cli(1, false).default_filter, VERBOSE_FILTER);
        let trace = LoggingConfig::for_cli(3, true);
        assert_eq!(trace.default_filter, TRACE_FILTER);
        assert!(trace.enable_spans && trace.enable_json_logs);
    }

    #[test]
    fn logs_live_under_budex() {
        assert!(log_directory().ends_with("budex/logs"));
    }
}
