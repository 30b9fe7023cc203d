// pm-provisioning-store-sqlite/src/lib.rs
// ============================================================================
// Module: PM Provisioning SQLite Store
// Description: SQLite-backed provisioning state persistence.
// Purpose: Provide a durable ProvisioningStateStore for PM provisioning.
// Dependencies: pm-provisioning-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a durable [`pm_provisioning_core::ProvisioningStateStore`]
//! implementation backed by `SQLite`. Rows survive restarts, so a crashed
//! attempt is still visible as `STARTED` on the next boot.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteProvisioningStateStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
