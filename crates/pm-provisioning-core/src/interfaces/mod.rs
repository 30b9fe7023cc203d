// pm-provisioning-core/src/interfaces/mod.rs
// ============================================================================
// Module: Provisioning Interfaces
// Description: Storage-agnostic collaborator contracts used by the engine.
// Purpose: Define dictionary, deployed, state, and naming seams.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! The engine only ever talks to collaborators through these traits. Every
//! store has an in-memory implementation in [`crate::runtime::store`]; the
//! provisioning state store also has a SQLite implementation in a separate
//! crate. Reads are synchronous and retry-free; a failure surfaces as a
//! [`StoreError`] and aborts the provisioning attempt.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use thiserror::Error;

use crate::core::AugmentationDefinition;
use crate::core::HashDigest;
use crate::core::HashError;
use crate::core::KpiDefinition;
use crate::core::KpiReference;
use crate::core::PmDefinition;
use crate::core::PmSchemaDefinition;
use crate::core::ProfileDefinition;
use crate::core::ProvisioningState;
use crate::core::ProvisioningStatus;
use crate::core::ResolvedKpiInstance;
use crate::core::ResolvedRuntimeKpi;
use crate::core::ResourceSubmission;
use crate::core::RuntimeKpiKey;
use crate::core::Timestamp;

// ============================================================================
// SECTION: Store Errors
// ============================================================================

/// Store errors shared by every store contract.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("store io error: {0}")]
    Io(String),
    /// Store data is corrupted.
    #[error("store corruption: {0}")]
    Corrupt(String),
    /// Store schema version is incompatible.
    #[error("store version mismatch: {0}")]
    VersionMismatch(String),
    /// Store data is invalid.
    #[error("store invalid data: {0}")]
    Invalid(String),
    /// Store reported an error.
    #[error("store error: {0}")]
    Store(String),
}

// ============================================================================
// SECTION: Dictionary Store
// ============================================================================

/// Catalog of every declared resource, keyed by resource name.
pub trait DictionaryStore {
    /// Finds a PM definition by name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn find_pm_definition(&self, name: &str) -> Result<Option<PmDefinition>, StoreError>;

    /// Finds a PM schema by schema name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn find_pm_schema(&self, name: &str) -> Result<Option<PmSchemaDefinition>, StoreError>;

    /// Finds the schema a PM definition's `source` refers to.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn find_schema_by_pm_def_name(
        &self,
        pm_name: &str,
    ) -> Result<Option<PmSchemaDefinition>, StoreError>;

    /// Finds a KPI definition by name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn find_kpi_definition(&self, name: &str) -> Result<Option<KpiDefinition>, StoreError>;

    /// Returns every KPI definition.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn find_all_kpi_definitions(&self) -> Result<Vec<KpiDefinition>, StoreError>;

    /// Returns every augmentation definition.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn find_all_augmentations(&self) -> Result<Vec<AugmentationDefinition>, StoreError>;

    /// Finds a profile by name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn find_profile(&self, name: &str) -> Result<Option<ProfileDefinition>, StoreError>;

    /// Returns every profile definition.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn find_all_profiles(&self) -> Result<Vec<ProfileDefinition>, StoreError>;

    /// Upserts every resource of a submission.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when persisting fails.
    fn save_submission(&self, submission: &ResourceSubmission) -> Result<(), StoreError>;

    /// Returns true when the stored PM definition equals `pm`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn is_pm_matched(&self, pm: &PmDefinition) -> Result<bool, StoreError> {
        Ok(self.find_pm_definition(&pm.name)?.as_ref() == Some(pm))
    }

    /// Returns true when the stored PM schema equals `schema`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn is_pm_schema_matched(&self, schema: &PmSchemaDefinition) -> Result<bool, StoreError> {
        Ok(self.find_pm_schema(&schema.name)?.as_ref() == Some(schema))
    }

    /// Returns true when the stored KPI definition equals `kpi`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn is_kpi_matched(&self, kpi: &KpiDefinition) -> Result<bool, StoreError> {
        Ok(self.find_kpi_definition(&kpi.name)?.as_ref() == Some(kpi))
    }

    /// Returns true when the stored profile equals `profile`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn is_profile_matched(&self, profile: &ProfileDefinition) -> Result<bool, StoreError> {
        Ok(self.find_profile(&profile.name)?.as_ref() == Some(profile))
    }
}

// ============================================================================
// SECTION: Deployed Store
// ============================================================================

/// Catalog of resources and KPI instances actually deployed at runtime.
pub trait DeployedStore {
    /// Finds a deployed KPI instance with the same structural identity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn get_deployed_kpi_by_aggregation(
        &self,
        key: &RuntimeKpiKey,
    ) -> Result<Option<ResolvedRuntimeKpi>, StoreError>;

    /// Returns the deployed KPI instances recorded for a profile.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn get_deployed_kpis_by_profile(
        &self,
        profile_name: &str,
    ) -> Result<Vec<ResolvedKpiInstance>, StoreError>;

    /// Returns deployed profiles that reference any of the named KPI definitions.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn get_affected_profiles(
        &self,
        kpi_names: &BTreeSet<String>,
    ) -> Result<Vec<ProfileDefinition>, StoreError>;

    /// Returns every effective augmentation (URLs already resolved).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn find_all_effective_augmentations(&self) -> Result<Vec<AugmentationDefinition>, StoreError>;

    /// Returns the names of deployed profiles bound to an augmentation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn find_all_profile_names(&self, augmentation_name: &str) -> Result<Vec<String>, StoreError>;

    /// Upserts deployed profiles by name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when persisting fails.
    fn save_profiles(&self, profiles: &[ProfileDefinition]) -> Result<(), StoreError>;

    /// Upserts effective augmentations by name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when persisting fails.
    fn save_effective_augmentations(
        &self,
        augmentations: &[AugmentationDefinition],
    ) -> Result<(), StoreError>;

    /// Upserts KPI instances by runtime key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when persisting fails.
    fn save_kpi_instances(&self, instances: &[ResolvedKpiInstance]) -> Result<(), StoreError>;
}

// ============================================================================
// SECTION: Provisioning State Store
// ============================================================================

/// Persistence for provisioning attempt rows.
pub trait ProvisioningStateStore {
    /// Returns the row with the highest id, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn find_latest(&self) -> Result<Option<ProvisioningState>, StoreError>;

    /// Inserts a new row and returns it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when persisting fails.
    fn insert(
        &self,
        state: ProvisioningStatus,
        started_at: Timestamp,
    ) -> Result<ProvisioningState, StoreError>;

    /// Overwrites the state and end time of an existing row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the row is missing or persisting fails.
    fn update(&self, state: &ProvisioningState) -> Result<(), StoreError>;
}

// ============================================================================
// SECTION: Augmentation URL Resolution
// ============================================================================

/// Errors raised when an augmentation URL cannot be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AugmentationError {
    /// URL references a placeholder with no configured value.
    #[error("unresolved augmentation url placeholder {placeholder} in {url}")]
    UnresolvedPlaceholder {
        /// Placeholder name.
        placeholder: String,
        /// Raw URL.
        url: String,
    },
    /// URL contains a `${` with no closing brace.
    #[error("malformed augmentation url placeholder in {0}")]
    MalformedPlaceholder(String),
}

/// Resolves placeholders inside augmentation URLs.
pub trait AugmentationUrlResolver {
    /// Returns the URL with every placeholder substituted.
    ///
    /// # Errors
    ///
    /// Returns [`AugmentationError`] when a placeholder cannot be resolved.
    fn resolve_url(&self, raw_url: &str) -> Result<String, AugmentationError>;
}

// ============================================================================
// SECTION: Naming and Fingerprints
// ============================================================================

/// Source of opaque runtime KPI names.
pub trait NameGenerator {
    /// Returns a fresh runtime name.
    fn generate(&self) -> String;
}

/// Computes the override fingerprint of a complex KPI reference.
pub trait ReferenceFingerprinter {
    /// Returns a digest that is equal for structurally equal references.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when the reference cannot be canonicalized.
    fn fingerprint(&self, reference: &KpiReference) -> Result<HashDigest, HashError>;
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Source of provisioning start and end times.
pub trait Clock {
    /// Returns the current time.
    fn now(&self) -> Timestamp;
}

impl<F> Clock for F
where
    F: Fn() -> Timestamp,
{
    fn now(&self) -> Timestamp {
        self()
    }
}
