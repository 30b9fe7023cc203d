//! Storage config validation tests for pm-provisioning-config.
// pm-provisioning-config/tests/storage_validation.rs
// =============================================================================
// Module: Storage Config Validation Tests
// Description: Validate provisioning state store selection and construction.
// Purpose: Ensure storage configuration remains strict and builds the right store.
// =============================================================================

use std::path::PathBuf;

use pm_provisioning_config::ProvisioningStateStoreType;
use pm_provisioning_core::ProvisioningStateMachine;
use pm_provisioning_core::ProvisioningStateStore;
use pm_provisioning_core::ProvisioningStatus;
use pm_provisioning_core::Timestamp;

mod common;

use crate::common::TestResult;
use crate::common::assert_invalid;

#[test]
fn provisioning_state_store_memory_rejects_path() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.provisioning_state_store.store_type = ProvisioningStateStoreType::Memory;
    config.provisioning_state_store.path = Some(PathBuf::from("state.db"));
    assert_invalid(config.validate(), "memory provisioning_state_store must not set path")
}

#[test]
fn provisioning_state_store_sqlite_requires_path() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.provisioning_state_store.store_type = ProvisioningStateStoreType::Sqlite;
    config.provisioning_state_store.path = None;
    assert_invalid(config.validate(), "sqlite provisioning_state_store requires path")
}

#[test]
fn provisioning_state_store_sqlite_rejects_long_component() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.provisioning_state_store.store_type = ProvisioningStateStoreType::Sqlite;
    config.provisioning_state_store.path = Some(PathBuf::from("a".repeat(300)));
    assert_invalid(config.validate(), "provisioning_state_store path component too long")
}

#[test]
fn provisioning_state_store_rejects_busy_timeout_above_maximum() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.provisioning_state_store.store_type = ProvisioningStateStoreType::Sqlite;
    config.provisioning_state_store.path = Some(PathBuf::from("state.db"));
    config.provisioning_state_store.busy_timeout_ms = 60_001;
    assert_invalid(
        config.validate(),
        "provisioning_state_store.busy_timeout_ms must be between 0 and 60000 milliseconds",
    )
}

#[test]
fn build_memory_store_starts_empty() -> TestResult {
    let config = common::minimal_config().map_err(|err| err.to_string())?;
    let store = config.build_provisioning_state_store().map_err(|err| err.to_string())?;
    let latest = store.find_latest().map_err(|err| err.to_string())?;
    if latest.is_some() {
        return Err("fresh memory store should be empty".to_string());
    }
    Ok(())
}

#[test]
fn build_sqlite_store_persists_across_builds() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.provisioning_state_store.store_type = ProvisioningStateStoreType::Sqlite;
    config.provisioning_state_store.path = Some(dir.path().join("state").join("prov.sqlite"));

    let machine = ProvisioningStateMachine::new(
        config.build_provisioning_state_store().map_err(|err| err.to_string())?,
    );
    machine
        .save(ProvisioningStatus::Started, Timestamp::from_unix_millis(1))
        .map_err(|err| err.to_string())?;
    machine
        .save(ProvisioningStatus::Completed, Timestamp::from_unix_millis(2))
        .map_err(|err| err.to_string())?;

    let rebuilt = config.build_provisioning_state_store().map_err(|err| err.to_string())?;
    let latest = rebuilt.find_latest().map_err(|err| err.to_string())?;
    match latest {
        Some(row) if row.state == ProvisioningStatus::Completed && row.id == 1 => Ok(()),
        _ => Err("sqlite store did not persist the completed attempt".to_string()),
    }
}

#[test]
fn build_sqlite_store_reports_directory_path() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.provisioning_state_store.store_type = ProvisioningStateStoreType::Sqlite;
    config.provisioning_state_store.path = Some(dir.path().to_path_buf());
    assert_invalid(config.build_provisioning_state_store(), "config io error")
}
