use std::io::IsTerminal;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Structured JSON lines.
    Json,
    /// Plain text.
    Text,
    /// Text with terminal colors.
    Color,
}

/// Logging arguments shared by all binaries.
#[derive(Debug, Clone, clap::Args)]
pub struct LogArgs {
    /// The log verbosity. `RUST_LOG` directives take precedence.
    #[clap(
        long = "log.level",
        env = "LOG_LEVEL",
        value_enum,
        default_value = "info",
        global = true
    )]
    pub level: LogLevel,
    /// The format of logs written to stderr.
    /// Defaults to `color` when stderr is a terminal, and `json` otherwise.
    #[clap(long = "log.format", env = "LOG_FORMAT", value_enum, global = true)]
    pub format: Option<LogFormat>,
}

impl Default for LogArgs {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: None,
        }
    }
}

/// Install a global tracing subscriber which writes to stderr.
pub fn init_logging(args: &LogArgs) {
    let format = args.format.unwrap_or_else(|| {
        if std::io::stderr().is_terminal() {
            LogFormat::Color
        } else {
            LogFormat::Json
        }
    });
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from(args.level).into())
        .from_env_lossy();

    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter);

    let result = match format {
        LogFormat::Json => builder
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .try_init(),
        LogFormat::Text => builder.with_ansi(false).try_init(),
        LogFormat::Color => builder.with_ansi(true).try_init(),
    };
    if let Err(err) = result {
        // A subscriber was already installed, as happens within tests.
        tracing::debug!(%err, "tracing subscriber was already initialized");
    }
}
