//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Console output in pretty or JSON format
//! - Separate JSON error log (WARN and above) to stderr, stdout or a file
//!
//! # Design Decisions
//! - `RUST_LOG` overrides the configured level
//! - The error log is always JSON so it can be shipped as-is

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::{LogFormat, ObservabilityConfig};

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("cannot open error log {path}: {source}")]
    ErrorLog {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("logging already initialized: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Where the JSON error log goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorLogDestination {
    Stderr,
    Stdout,
    File(String),
}

impl ErrorLogDestination {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "STDERR" => ErrorLogDestination::Stderr,
            "STDOUT" => ErrorLogDestination::Stdout,
            path => ErrorLogDestination::File(path.to_string()),
        }
    }

    fn make_writer(&self) -> Result<BoxMakeWriter, LoggingError> {
        Ok(match self {
            ErrorLogDestination::Stderr => BoxMakeWriter::new(std::io::stderr),
            ErrorLogDestination::Stdout => BoxMakeWriter::new(std::io::stdout),
            ErrorLogDestination::File(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|source| LoggingError::ErrorLog {
                        path: path.clone(),
                        source,
                    })?;
                BoxMakeWriter::new(Mutex::new(file))
            }
        })
    }
}

/// Install the global subscriber.
pub fn init_logging(config: &ObservabilityConfig) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("content_router={0},tower_http={0}", config.log_level)));

    let (pretty, json) = match config.log_format {
        LogFormat::Pretty => (Some(tracing_subscriber::fmt::layer()), None),
        LogFormat::Json => (None, Some(tracing_subscriber::fmt::layer().json())),
    };

    let error_log = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(ErrorLogDestination::parse(&config.error_log).make_writer()?)
        .with_filter(LevelFilter::WARN);

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json)
        .with(error_log)
        .try_init()?;

    Ok(())
}
