//! Logging setup for the tunino daemon
//!
//! Everything goes to stdout so the service manager's journal picks it up
//! next to the daemon's own output.

use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoggingMode {
    /// One line per event, no source locations
    #[default]
    Compact,
    /// Thread names, file and line on every event
    Verbose,
}

/// Logging configuration error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),

    #[error("Invalid log filter {0:?}")]
    InvalidFilter(String),
}

/// Install the global subscriber
///
/// `configured_level` comes from the `log_level` setting and is the lowest
/// priority source.
///
/// # Environment Variables
///
/// - `TUNINO_LOG_LEVEL`: Override log level (error, warn, info, debug, trace)
/// - `RUST_LOG`: Standard filter directives, used when the above is unset
pub fn init_logging(mode: LoggingMode, configured_level: &str) -> Result<(), LoggingError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let filter = create_env_filter(configured_level)?;

    match mode {
        LoggingMode::Compact => Registry::default()
            .with(
                fmt::layer()
                    .with_writer(std::io::stdout)
                    .with_target(false)
                    .with_thread_names(false)
                    .compact(),
            )
            .with(filter)
            .try_init(),
        LoggingMode::Verbose => Registry::default()
            .with(
                fmt::layer()
                    .with_writer(std::io::stdout)
                    .with_thread_names(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .with(filter)
            .try_init(),
    }
    .map_err(|e| LoggingError::TracingInit(e.to_string()))
}

fn create_env_filter(configured_level: &str) -> Result<EnvFilter, LoggingError> {
    let directive = filter_directive(
        std::env::var("TUNINO_LOG_LEVEL").ok(),
        std::env::var("RUST_LOG").ok(),
        configured_level,
    );
    EnvFilter::try_new(&directive).map_err(|_| LoggingError::InvalidFilter(directive))
}

/// First of `TUNINO_LOG_LEVEL`, `RUST_LOG`, configured level that is set
fn filter_directive(env_level: Option<String>, rust_log: Option<String>, configured: &str) -> String {
    env_level
        .filter(|level| !level.trim().is_empty())
        .map(|level| normalize_level(&level))
        .or(rust_log.filter(|directives| !directives.trim().is_empty()))
        .unwrap_or_else(|| normalize_level(configured))
}

/// Map level names from older configs onto tracing's levels
pub fn normalize_level(level: &str) -> String {
    let level = level.trim().to_ascii_lowercase();
    match level.as_str() {
        "" => "info".to_string(),
        "warning" => "warn".to_string(),
        "critical" | "fatal" => "error".to_string(),
        "success" => "info".to_string(),
        _ => level,
    }
}
