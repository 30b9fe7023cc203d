// pm-provisioning-config/src/logging.rs
// ============================================================================
// Module: Tracing Initialization
// Description: Installs the process-wide tracing subscriber.
// Purpose: Turn the [logging] section into a formatted, filtered subscriber.
// Dependencies: tracing-subscriber, thiserror
// ============================================================================

//! ## Overview
//! [`init_tracing`] installs a `tracing-subscriber` fmt subscriber writing to
//! stderr, filtered by the configured `EnvFilter` directive, in plain text or
//! JSON. The global subscriber can be set once per process; later calls
//! return [`LoggingError::AlreadyInitialized`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::LogFormat;
use crate::config::LoggingConfig;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while installing the tracing subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// Filter directive could not be parsed.
    #[error("invalid logging filter: {0}")]
    Filter(String),
    /// A global subscriber is already installed.
    #[error("tracing subscriber already initialized: {0}")]
    AlreadyInitialized(String),
}

// ============================================================================
// SECTION: Initialization
// ============================================================================

/// Installs the global tracing subscriber described by `config`.
///
/// # Errors
///
/// Returns [`LoggingError::Filter`] when the filter directive is invalid and
/// [`LoggingError::AlreadyInitialized`] when a subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter =
        EnvFilter::try_new(&config.filter).map_err(|err| LoggingError::Filter(err.to_string()))?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    let installed = match config.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|err| LoggingError::AlreadyInitialized(err.to_string()))
}
