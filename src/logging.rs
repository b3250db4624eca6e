use clap::ValueEnum;
use std::io::{self, IsTerminal};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "UPPER")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    /// Only critical failures. tracing has no level above ERROR, so this
    /// filters like ERROR.
    Critical,
}
impl LogLevel {
    pub fn directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}

/// Process-wide log settings, applied once by [`init`].
#[derive(Clone, Debug)]
pub struct LogConfig {
    pub level: LogLevel,
    /// chrono format string for the timestamp column
    pub time_format: String,
}
impl LogConfig {
    pub fn new(level: LogLevel) -> LogConfig {
        LogConfig {
            level,
            ..LogConfig::default()
        }
    }
}
impl Default for LogConfig {
    fn default() -> LogConfig {
        LogConfig {
            level: LogLevel::default(),
            time_format: "%Y-%m-%d %H:%M:%S".into(),
        }
    }
}

/// Installs a `timestamp LEVEL message` subscriber on stderr. `RUST_LOG`
/// takes precedence over the configured level.
pub fn init(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_timer(ChronoLocal::new(config.time_format.clone()))
        .with_target(false)
        .init();
}
