//! Tracing setup shared by `strata-build` and `strata-app-build`.
//!
//! Buildpack output owns stdout, so lifecycle events go to stderr as a single
//! filtered `fmt` layer on the registry. The delegated app stage receives the
//! parent's filter and format through its environment and installs the same
//! layer, so one build produces one consistent log stream.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use strata_config::{LogFormat, LoggingConfig};
use thiserror::Error;
use tracing_subscriber::fmt::{self, time::UtcTime};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer, Registry};

type StderrLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Format of the subscriber this process installed.
static INSTALLED: OnceCell<LogFormat> = OnceCell::new();

/// Evidence that lifecycle telemetry is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryHandle {
    format: LogFormat,
}

impl TelemetryHandle {
    /// Format of the installed subscriber, which is the one requested by the
    /// first successful call.
    #[must_use]
    pub const fn format(&self) -> LogFormat {
        self.format
    }
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The configured filter is not a valid directive list.
    #[error("invalid log filter '{filter}': {reason}")]
    Filter {
        /// Filter text as configured.
        filter: String,
        /// Parser diagnostic.
        reason: String,
    },
    /// Another global subscriber already owns the process.
    #[error("failed to install telemetry subscriber: {0}")]
    Install(#[from] TryInitError),
}

/// Installs the stderr subscriber on first use.
///
/// Later calls leave the global subscriber untouched and report the format
/// that is actually in effect.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] for an unparseable filter and
/// [`TelemetryError::Install`] when a foreign subscriber is already set.
///
/// # Examples
///
/// ```rust
/// use strata_config::{LogFormat, LoggingConfig};
/// use strata_lifecycle::telemetry;
///
/// # fn main() -> Result<(), strata_lifecycle::telemetry::TelemetryError> {
/// let first = telemetry::initialise(&LoggingConfig::default())?;
/// let second = telemetry::initialise(&LoggingConfig::new("debug", LogFormat::Json))?;
/// assert_eq!(second.format(), first.format());
/// # Ok(())
/// # }
/// ```
pub fn initialise(logging: &LoggingConfig) -> Result<TelemetryHandle, TelemetryError> {
    INSTALLED
        .get_or_try_init(|| install(logging))
        .map(|format| TelemetryHandle { format: *format })
}

fn install(logging: &LoggingConfig) -> Result<LogFormat, TelemetryError> {
    tracing_subscriber::registry()
        .with(stderr_layer(logging)?)
        .try_init()?;
    Ok(logging.format())
}

fn stderr_layer(logging: &LoggingConfig) -> Result<StderrLayer, TelemetryError> {
    let filter = EnvFilter::try_new(logging.filter()).map_err(|error| TelemetryError::Filter {
        filter: logging.filter().to_owned(),
        reason: error.to_string(),
    })?;
    let base = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_timer(UtcTime::rfc_3339())
        .with_target(true)
        .with_thread_names(false);
    Ok(match logging.format() {
        LogFormat::Json => base.json().flatten_event(true).with_filter(filter).boxed(),
        LogFormat::Compact => base.compact().with_filter(filter).boxed(),
    })
}
