// pm-provisioning-core/src/runtime/cache.rs
// ============================================================================
// Module: Resolved KPI Cache
// Description: Run-scoped memo table of resolved runtime KPIs.
// Purpose: Guarantee each runtime KPI key is resolved at most once per run.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! The cache lives for exactly one provisioning run and is owned by the
//! caller, which passes it mutably into the resolver. It is never shared
//! across runs; after a failed persistence the caller drops it instead of
//! retrying with its contents.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use crate::core::ResolvedRuntimeKpi;
use crate::core::RuntimeKpiKey;

// ============================================================================
// SECTION: Cache
// ============================================================================

/// Memo table mapping runtime KPI keys to resolved KPIs.
#[derive(Debug, Clone, Default)]
pub struct ResolvedKpiCache {
    /// Resolved KPIs keyed by structural identity.
    entries: BTreeMap<RuntimeKpiKey, ResolvedRuntimeKpi>,
}

impl ResolvedKpiCache {
    /// Creates an empty cache.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Returns the resolved KPI stored for `key`.
    #[must_use]
    pub fn get(&self, key: &RuntimeKpiKey) -> Option<&ResolvedRuntimeKpi> {
        self.entries.get(key)
    }

    /// Returns true when `key` has been resolved.
    #[must_use]
    pub fn contains(&self, key: &RuntimeKpiKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Stores a resolved KPI, replacing any previous value for `key`.
    pub fn put(&mut self, key: RuntimeKpiKey, kpi: ResolvedRuntimeKpi) {
        self.entries.insert(key, kpi);
    }

    /// Returns the number of cached keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when nothing has been cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
