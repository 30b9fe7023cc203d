// pm-provisioning-core/src/core/time.rs
// ============================================================================
// Module: Provisioning Time Model
// Description: Caller-supplied timestamps for provisioning state records.
// Purpose: Keep provisioning runs replayable by never reading the wall clock.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Provisioning start and end times come from an injected
//! [`crate::interfaces::Clock`]. The engine never reads wall-clock time
//! itself, so tests can assert exact state rows.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Unix epoch milliseconds attached to provisioning state rows.
///
/// # Invariants
/// - Values are explicitly provided by callers; monotonicity is not enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as unix epoch milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}
