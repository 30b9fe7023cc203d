// pm-provisioning-core/src/runtime/naming.rs
// ============================================================================
// Module: Runtime Naming
// Description: Name generators, reference fingerprints, and clocks.
// Purpose: Provide production and deterministic implementations of the naming seams.
// Dependencies: crate::{core, interfaces}, uuid
// ============================================================================

//! ## Overview
//! [`UuidNameGenerator`] mints `<prefix>_<uuid>` names for production runs;
//! [`SequentialNameGenerator`] mints `<prefix>_<n>` so tests can assert
//! generated SQL byte-for-byte. [`CanonicalFingerprinter`] hashes the JCS
//! canonical form of a KPI reference, so references that only differ in
//! JSON key order share a fingerprint.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use uuid::Uuid;

use crate::core::DEFAULT_HASH_ALGORITHM;
use crate::core::HashAlgorithm;
use crate::core::HashDigest;
use crate::core::HashError;
use crate::core::KpiReference;
use crate::core::Timestamp;
use crate::core::hashing::hash_canonical_json;
use crate::interfaces::Clock;
use crate::interfaces::NameGenerator;
use crate::interfaces::ReferenceFingerprinter;

/// Default prefix of generated runtime names.
pub const DEFAULT_NAME_PREFIX: &str = "kpi";

// ============================================================================
// SECTION: Name Generators
// ============================================================================

/// Generates `<prefix>_<uuid v4>` runtime names.
#[derive(Debug, Clone)]
pub struct UuidNameGenerator {
    /// Name prefix.
    prefix: String,
}

impl UuidNameGenerator {
    /// Creates a generator with the given prefix.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for UuidNameGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_NAME_PREFIX)
    }
}

impl NameGenerator for UuidNameGenerator {
    fn generate(&self) -> String {
        format!("{}_{}", self.prefix, Uuid::new_v4().simple())
    }
}

/// Generates `<prefix>_<n>` runtime names from a counter starting at 1.
#[derive(Debug)]
pub struct SequentialNameGenerator {
    /// Name prefix.
    prefix: String,
    /// Next counter value.
    next: AtomicU64,
}

impl SequentialNameGenerator {
    /// Creates a generator with the given prefix.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }

    /// Returns how many names have been generated.
    #[must_use]
    pub fn issued(&self) -> u64 {
        self.next.load(Ordering::SeqCst) - 1
    }
}

impl NameGenerator for SequentialNameGenerator {
    fn generate(&self) -> String {
        let value = self.next.fetch_add(1, Ordering::SeqCst);
        format!("{}_{value}", self.prefix)
    }
}

// ============================================================================
// SECTION: Fingerprints
// ============================================================================

/// Fingerprints KPI references over their canonical JSON form.
#[derive(Debug, Clone, Copy)]
pub struct CanonicalFingerprinter {
    /// Digest algorithm.
    algorithm: HashAlgorithm,
}

impl CanonicalFingerprinter {
    /// Creates a fingerprinter using `algorithm`.
    #[must_use]
    pub const fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
        }
    }
}

impl Default for CanonicalFingerprinter {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_ALGORITHM)
    }
}

impl ReferenceFingerprinter for CanonicalFingerprinter {
    fn fingerprint(&self, reference: &KpiReference) -> Result<HashDigest, HashError> {
        hash_canonical_json(self.algorithm, reference)
    }
}

// ============================================================================
// SECTION: Clocks
// ============================================================================

/// Wall clock reading the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX));
        Timestamp::from_unix_millis(millis)
    }
}
