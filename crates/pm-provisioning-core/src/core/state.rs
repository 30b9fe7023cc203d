// pm-provisioning-core/src/core/state.rs
// ============================================================================
// Module: Provisioning State
// Description: Provisioning attempt lifecycle states and transition table.
// Purpose: Reject illegal lifecycle transitions before anything is persisted.
// Dependencies: crate::core::time, serde, thiserror
// ============================================================================

//! ## Overview
//! Each provisioning attempt is one row in the provisioning state store. The
//! latest row (highest id) is the authoritative state. Legal transitions:
//!
//! | From        | To                     |
//! |-------------|------------------------|
//! | `INITIAL`   | `STARTED`              |
//! | `STARTED`   | `COMPLETED`, `ERROR`   |
//! | `COMPLETED` | `STARTED`              |
//! | `ERROR`     | `STARTED`              |
//!
//! Every other transition is illegal, including `STARTED` -> `STARTED`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Provisioning Status
// ============================================================================

/// Lifecycle status of a provisioning attempt.
///
/// # Invariants
/// - Variants are stable for serialization and storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProvisioningStatus {
    /// No provisioning has run yet.
    Initial,
    /// Provisioning is in progress.
    Started,
    /// Provisioning finished successfully.
    Completed,
    /// Provisioning failed.
    Error,
}

impl ProvisioningStatus {
    /// Returns the stable storage label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "INITIAL",
            Self::Started => "STARTED",
            Self::Completed => "COMPLETED",
            Self::Error => "ERROR",
        }
    }

    /// Parses a storage label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "INITIAL" => Some(Self::Initial),
            "STARTED" => Some(Self::Started),
            "COMPLETED" => Some(Self::Completed),
            "ERROR" => Some(Self::Error),
            _ => None,
        }
    }

    /// Returns true when `next` may follow this status.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Initial | Self::Completed | Self::Error, Self::Started)
                | (Self::Started, Self::Completed | Self::Error)
        )
    }
}

impl fmt::Display for ProvisioningStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Provisioning State
// ============================================================================

/// Illegal provisioning lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("illegal provisioning state transition from {from} to {to}")]
pub struct TransitionError {
    /// Current status.
    pub from: ProvisioningStatus,
    /// Requested status.
    pub to: ProvisioningStatus,
}

/// One provisioning attempt row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningState {
    /// Row identifier; the highest id is the latest state.
    pub id: u64,
    /// Lifecycle status.
    pub state: ProvisioningStatus,
    /// When the attempt started.
    pub provisioning_start_time: Option<Timestamp>,
    /// When the attempt finished.
    pub provisioning_end_time: Option<Timestamp>,
}

impl ProvisioningState {
    /// Returns the synthesized state used when the store has no rows.
    #[must_use]
    pub const fn initial() -> Self {
        Self {
            id: 1,
            state: ProvisioningStatus::Initial,
            provisioning_start_time: None,
            provisioning_end_time: None,
        }
    }

    /// Checks that `next` is a legal successor of this state.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] when the transition is not in the table.
    pub const fn check_transition(&self, next: ProvisioningStatus) -> Result<(), TransitionError> {
        if self.state.can_transition_to(next) {
            Ok(())
        } else {
            Err(TransitionError {
                from: self.state,
                to: next,
            })
        }
    }
}
