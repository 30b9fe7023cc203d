//! Logging config tests for pm-provisioning-config.
// pm-provisioning-config/tests/logging_init.rs
// =============================================================================
// Module: Logging Config Tests
// Description: Validate logging settings and subscriber installation.
// Purpose: Ensure tracing setup fails closed and never panics on reuse.
// =============================================================================

use pm_provisioning_config::LogFormat;
use pm_provisioning_config::LoggingConfig;
use pm_provisioning_config::LoggingError;
use pm_provisioning_config::init_tracing;

mod common;

use crate::common::TestResult;
use crate::common::assert_invalid;

#[test]
fn logging_filter_must_be_non_empty() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.logging.filter = " ".to_string();
    assert_invalid(config.validate(), "logging.filter must be non-empty")
}

#[test]
fn logging_filter_must_parse() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.logging.filter = "pm_provisioning=loud".to_string();
    assert_invalid(config.validate(), "logging.filter is invalid")
}

#[test]
fn init_tracing_installs_once() -> TestResult {
    let config = LoggingConfig {
        filter: "pm_provisioning=debug".to_string(),
        format: LogFormat::Json,
    };
    init_tracing(&config).map_err(|err| err.to_string())?;
    tracing::info!(target: "pm_provisioning_config", "subscriber installed");
    match init_tracing(&config) {
        Err(LoggingError::AlreadyInitialized(_)) => Ok(()),
        Err(err) => Err(format!("unexpected error {err}")),
        Ok(()) => Err("second initialization should fail".to_string()),
    }
}

#[test]
fn init_tracing_rejects_bad_filter_before_installing() -> TestResult {
    let config = LoggingConfig {
        filter: "pm_provisioning=loud".to_string(),
        format: LogFormat::Text,
    };
    match init_tracing(&config) {
        Err(LoggingError::Filter(_)) => Ok(()),
        Err(err) => Err(format!("unexpected error {err}")),
        Ok(()) => Err("invalid filter should be rejected".to_string()),
    }
}
