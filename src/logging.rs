//! Logging setup for binaries and tests.
//!
//! Library code only emits `tracing` events. Hosts that want console output
//! call [`init_logging`] once at startup; `RUST_LOG` overrides the default
//! directive.

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub enum LoggingError {
    /// A global subscriber was installed earlier in this process
    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized,
}

/// Install a stdout subscriber filtered by `RUST_LOG`, or `default_directive` when unset.
///
/// # Errors
///
/// Returns [`LoggingError::AlreadyInitialized`] on every call after the first.
pub fn init_logging(default_directive: &str) -> Result<(), LoggingError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialized)
}

/// Default directive for the demo binary
pub fn default_directive() -> &'static str {
    "info"
}
