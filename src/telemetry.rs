//! Logging setup
//!
//! Installs a `tracing` subscriber with:
//! - an `EnvFilter` (`RUST_LOG` wins, otherwise `info` or `debug`)
//! - JSON structured output, or pretty output in development mode
//! - stderr as the sink unless a log file is configured

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Errors that can occur during logging initialization
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The log file could not be opened
    #[error("failed to open log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A global subscriber is already installed
    #[error("failed to initialize tracing subscriber: {0}")]
    SubscriberInit(String),
}

/// Logging configuration
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TelemetryConfig {
    /// Log at debug level when `RUST_LOG` is not set
    pub debug: bool,
    /// Pretty output instead of JSON
    pub development: bool,
    /// Append to this file instead of writing to stderr
    pub log_path: Option<PathBuf>,
}

impl TelemetryConfig {
    /// Filter directives used when `RUST_LOG` is not set
    pub fn default_directives(&self) -> &'static str {
        if self.debug {
            "debug,hyper=info,reqwest=info,rustls=info"
        } else {
            "info"
        }
    }
}

/// Install the global subscriber
///
/// Fails if one is already installed; callers that configure the provider
/// more than once may ignore that error.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directives()));

    let fmt_layer = match &config.log_path {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| TelemetryError::LogFile {
                    path: path.clone(),
                    source,
                })?;
            fmt_layer(Mutex::new(file), config.development)
        }
        None => fmt_layer(std::io::stderr, config.development),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .try_init()
        .map_err(|e: tracing_subscriber::util::TryInitError| {
            TelemetryError::SubscriberInit(e.to_string())
        })
}

fn fmt_layer<W>(writer: W, development: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    if development {
        tracing_subscriber::fmt::layer()
            .pretty()
            .with_writer(writer)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .with_file(false)
            .with_line_number(false)
            .with_writer(writer)
            .boxed()
    }
}
