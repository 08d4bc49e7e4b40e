//! Structured logging for the JobQL server
//!
//! - JSON output for production, pretty or compact for development
//! - Daily rolling log files
//! - Per-request spans carrying a request id and query fingerprint

use thiserror::Error;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

const LOG_FILE_PREFIX: &str = "jobql-server.log";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("Failed to create log directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Logging already initialized: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format for development
    Pretty,
    /// JSON format for production (structured logging)
    Json,
    /// Compact format for testing
    Compact,
}

impl LogFormat {
    /// Unknown values fall back to pretty
    pub fn parse(value: &str) -> Self {
        match value {
            "json" => LogFormat::Json,
            "compact" => LogFormat::Compact,
            _ => LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    File,
    Both,
}

impl LogOutput {
    /// Unknown values fall back to stdout
    pub fn parse(value: &str) -> Self {
        match value {
            "file" => LogOutput::File,
            "both" => LogOutput::Both,
            _ => LogOutput::Stdout,
        }
    }
}

fn build_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    Ok(EnvFilter::try_new(level)?
        // Filter out noisy third-party crates
        .add_directive("hyper=warn".parse()?)
        .add_directive("tokio=warn".parse()?)
        .add_directive("runtime=warn".parse()?)
        .add_directive("tower=warn".parse()?)
        .add_directive("h2=warn".parse()?))
}

fn stdout_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    match format {
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_thread_ids(true)
            .with_target(true)
            .boxed(),
        LogFormat::Json => fmt::layer().json().with_current_span(true).boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    }
}

fn file_appender(directory: &str) -> Result<RollingFileAppender, LoggingError> {
    std::fs::create_dir_all(directory)?;
    Ok(RollingFileAppender::new(Rotation::DAILY, directory, LOG_FILE_PREFIX))
}

/// Install the global subscriber described by `config`.
///
/// ```bash
/// # Development: pretty console output at debug level
/// RUST_LOG=debug LOG_FORMAT=pretty cargo run -p jobql-server
///
/// # Production: JSON to file
/// RUST_LOG=info LOG_FORMAT=json LOG_OUTPUT=file LOG_DIR=/var/log/jobql cargo run -p jobql-server
/// ```
pub fn init(config: &LoggingConfig) -> Result<(), LoggingError> {
    let format = LogFormat::parse(&config.format);
    let output = LogOutput::parse(&config.output);
    let filter = build_filter(&config.level)?;

    match output {
        LogOutput::Stdout => tracing_subscriber::registry()
            .with(filter)
            .with(stdout_layer(format))
            .try_init()?,
        LogOutput::File => {
            let file_layer = fmt::layer()
                .with_writer(file_appender(&config.directory)?)
                .with_ansi(false);
            tracing_subscriber::registry()
                .with(filter)
                .with(file_layer)
                .try_init()?
        }
        LogOutput::Both => {
            let file_layer = fmt::layer()
                .with_writer(file_appender(&config.directory)?)
                .with_ansi(false)
                .boxed();
            tracing_subscriber::registry()
                .with(filter)
                .with(stdout_layer(format))
                .with(file_layer)
                .try_init()?
        }
    }

    tracing::info!(
        format = ?format,
        output = ?output,
        level = %config.level,
        "Logging system initialized"
    );
    if output != LogOutput::Stdout {
        tracing::debug!(directory = %config.directory, "Writing log files");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("compact"), LogFormat::Compact);
        assert_eq!(LogFormat::parse("fancy"), LogFormat::Pretty);
    }

    #[test]
    fn test_log_output_parse() {
        assert_eq!(LogOutput::parse("file"), LogOutput::File);
        assert_eq!(LogOutput::parse("both"), LogOutput::Both);
        assert_eq!(LogOutput::parse("stdout"), LogOutput::Stdout);
        assert_eq!(LogOutput::parse(""), LogOutput::Stdout);
    }

    #[test]
    fn test_filter_accepts_module_directives() {
        assert!(build_filter("info,jobql_server=debug").is_ok());
        assert!(build_filter("jobql_server=notalevel").is_err());
    }
}
