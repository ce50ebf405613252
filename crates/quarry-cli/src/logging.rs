//! Structured logging for the quarry CLI
//!
//! Logs never go to stdout, which carries the compiled SQL.

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

/// Log format configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format for development
    Pretty,
    /// JSON format (structured logging)
    Json,
    /// Single-line format
    Compact,
}

impl LogFormat {
    pub fn parse(value: &str) -> Self {
        match value {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Compact,
        }
    }
}

/// Log output configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Stderr,
    /// Daily rolling file under the log directory
    File,
    Both,
}

impl LogOutput {
    pub fn parse(value: &str) -> Self {
        match value {
            "file" => LogOutput::File,
            "both" => LogOutput::Both,
            _ => LogOutput::Stderr,
        }
    }
}

fn console_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    let layer = fmt::layer().with_writer(std::io::stderr);
    match format {
        LogFormat::Pretty => layer.pretty().with_target(true).boxed(),
        LogFormat::Json => layer.json().with_current_span(true).boxed(),
        LogFormat::Compact => layer.compact().boxed(),
    }
}

fn file_layer<S>(directory: &str) -> std::io::Result<Box<dyn Layer<S> + Send + Sync>>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    std::fs::create_dir_all(directory)?;
    let appender = RollingFileAppender::new(Rotation::DAILY, directory, "quarry.log");
    Ok(fmt::layer()
        .with_writer(appender)
        .with_ansi(false)
        .boxed())
}

/// Initialize the global subscriber from the logging section.
///
/// `level` is an `EnvFilter` directive such as `debug` or `quarry_sql=trace,warn`.
pub fn init(config: &LoggingConfig) -> anyhow::Result<()> {
    let format = LogFormat::parse(&config.format);
    let output = LogOutput::parse(&config.output);

    let env_filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("warn"));

    let layers = match output {
        LogOutput::Stderr => vec![console_layer(format)],
        LogOutput::File => vec![file_layer(&config.directory)?],
        LogOutput::Both => vec![console_layer(format), file_layer(&config.directory)?],
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()?;

    tracing::debug!(
        format = ?format,
        output = ?output,
        level = %config.level,
        "Logging initialized"
    );
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
        assert_eq!(LogFormat::parse("fancy"), LogFormat::Compact);
    }

    #[test]
    fn test_log_output_parse() {
        assert_eq!(LogOutput::parse("file"), LogOutput::File);
        assert_eq!(LogOutput::parse("both"), LogOutput::Both);
        assert_eq!(LogOutput::parse("stderr"), LogOutput::Stderr);
        assert_eq!(LogOutput::parse("stdout"), LogOutput::Stderr);
    }
}
