// pm-provisioning-core/src/runtime/provisioning.rs
// ============================================================================
// Module: Provisioning State Machine
// Description: Lifecycle tracking of provisioning attempts.
// Purpose: Enforce legal transitions and the one-latest-row rule on save.
// Dependencies: crate::{core, interfaces}, thiserror, tracing
// ============================================================================

//! ## Overview
//! A save always checks the requested status against the latest row. When
//! the latest row is `STARTED` the save closes that row out (state and end
//! time are updated in place); otherwise it inserts a new row, starting a
//! new attempt. An empty store behaves as if it held an `INITIAL` row with
//! id 1.
//!
//! Since `STARTED` -> `STARTED` is illegal, the state machine doubles as the
//! admission gate that keeps two provisioning runs from overlapping.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;
use tracing::info;

use crate::core::ProvisioningState;
use crate::core::ProvisioningStatus;
use crate::core::Timestamp;
use crate::core::TransitionError;
use crate::interfaces::ProvisioningStateStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by the provisioning state machine.
#[derive(Debug, Error)]
pub enum ProvisioningError {
    /// Requested transition is illegal.
    #[error(transparent)]
    Transition(#[from] TransitionError),
    /// State store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// SECTION: State Machine
// ============================================================================

/// Provisioning lifecycle over a state store.
#[derive(Debug, Clone)]
pub struct ProvisioningStateMachine<S> {
    /// Backing state store.
    store: S,
}

impl<S: ProvisioningStateStore> ProvisioningStateMachine<S> {
    /// Creates a state machine over `store`.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self {
            store,
        }
    }

    /// Returns the backing store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Returns the latest state, or the synthesized `INITIAL` row.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningError::Store`] when loading fails.
    pub fn latest(&self) -> Result<ProvisioningState, ProvisioningError> {
        Ok(self.store.find_latest()?.unwrap_or_else(ProvisioningState::initial))
    }

    /// Records `next` as the newest lifecycle status.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningError::Transition`] for illegal transitions and
    /// [`ProvisioningError::Store`] when persisting fails.
    pub fn save(
        &self,
        next: ProvisioningStatus,
        at: Timestamp,
    ) -> Result<ProvisioningState, ProvisioningError> {
        let latest = self.latest()?;
        latest.check_transition(next)?;
        let saved = if latest.state == ProvisioningStatus::Started {
            let closed = ProvisioningState {
                state: next,
                provisioning_end_time: Some(at),
                ..latest
            };
            self.store.update(&closed)?;
            closed
        } else {
            self.store.insert(next, at)?
        };
        info!(id = saved.id, from = %latest.state, to = %saved.state, "provisioning state saved");
        Ok(saved)
    }
}
