// pm-provisioning-core/src/runtime/store.rs
// ============================================================================
// Module: In-Memory Stores
// Description: In-memory dictionary, deployed, and provisioning state stores.
// Purpose: Provide deterministic store implementations without external deps.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! These stores back tests and single-process deployments. Each store is a
//! cheap clonable handle over `Arc<Mutex<..>>` state, so clones observe each
//! other's writes. All maps are ordered, which keeps lookups that return
//! several records deterministic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::core::AugmentationDefinition;
use crate::core::KpiDefinition;
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
use crate::interfaces::DeployedStore;
use crate::interfaces::DictionaryStore;
use crate::interfaces::ProvisioningStateStore;
use crate::interfaces::StoreError;

/// Locks a store mutex, mapping poisoning to [`StoreError::Store`].
fn lock<'a, T>(mutex: &'a Mutex<T>, store: &str) -> Result<MutexGuard<'a, T>, StoreError> {
    mutex.lock().map_err(|_| StoreError::Store(format!("{store} mutex poisoned")))
}

// ============================================================================
// SECTION: Dictionary Store
// ============================================================================

/// Dictionary tables keyed by resource name.
#[derive(Debug, Default)]
struct DictionaryTables {
    /// PM schemas.
    pm_schemas: BTreeMap<String, PmSchemaDefinition>,
    /// PM definitions.
    pm_defs: BTreeMap<String, PmDefinition>,
    /// KPI definitions.
    kpi_defs: BTreeMap<String, KpiDefinition>,
    /// Augmentations.
    augmentations: BTreeMap<String, AugmentationDefinition>,
    /// Profiles.
    profiles: BTreeMap<String, ProfileDefinition>,
}

/// In-memory dictionary store.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDictionaryStore {
    /// Dictionary tables protected by a mutex.
    tables: Arc<Mutex<DictionaryTables>>,
}

impl InMemoryDictionaryStore {
    /// Creates an empty dictionary store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a dictionary store seeded with a submission.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when seeding fails.
    pub fn with_submission(submission: &ResourceSubmission) -> Result<Self, StoreError> {
        let store = Self::new();
        store.save_submission(submission)?;
        Ok(store)
    }
}

impl DictionaryStore for InMemoryDictionaryStore {
    fn find_pm_definition(&self, name: &str) -> Result<Option<PmDefinition>, StoreError> {
        Ok(lock(&self.tables, "dictionary store")?.pm_defs.get(name).cloned())
    }

    fn find_pm_schema(&self, name: &str) -> Result<Option<PmSchemaDefinition>, StoreError> {
        Ok(lock(&self.tables, "dictionary store")?.pm_schemas.get(name).cloned())
    }

    fn find_schema_by_pm_def_name(
        &self,
        pm_name: &str,
    ) -> Result<Option<PmSchemaDefinition>, StoreError> {
        let tables = lock(&self.tables, "dictionary store")?;
        let Some(pm) = tables.pm_defs.get(pm_name) else {
            return Ok(None);
        };
        let reference =
            pm.schema_reference().map_err(|err| StoreError::Invalid(err.to_string()))?;
        let schema = tables.pm_schemas.get(&reference.schema_name).cloned().unwrap_or_else(|| {
            PmSchemaDefinition {
                name: reference.schema_name,
                data_space: reference.data_space,
                data_category: reference.data_category,
            }
        });
        drop(tables);
        Ok(Some(schema))
    }

    fn find_kpi_definition(&self, name: &str) -> Result<Option<KpiDefinition>, StoreError> {
        Ok(lock(&self.tables, "dictionary store")?.kpi_defs.get(name).cloned())
    }

    fn find_all_kpi_definitions(&self) -> Result<Vec<KpiDefinition>, StoreError> {
        Ok(lock(&self.tables, "dictionary store")?.kpi_defs.values().cloned().collect())
    }

    fn find_all_augmentations(&self) -> Result<Vec<AugmentationDefinition>, StoreError> {
        Ok(lock(&self.tables, "dictionary store")?.augmentations.values().cloned().collect())
    }

    fn find_profile(&self, name: &str) -> Result<Option<ProfileDefinition>, StoreError> {
        Ok(lock(&self.tables, "dictionary store")?.profiles.get(name).cloned())
    }

    fn find_all_profiles(&self) -> Result<Vec<ProfileDefinition>, StoreError> {
        Ok(lock(&self.tables, "dictionary store")?.profiles.values().cloned().collect())
    }

    fn save_submission(&self, submission: &ResourceSubmission) -> Result<(), StoreError> {
        let mut tables = lock(&self.tables, "dictionary store")?;
        for schema in &submission.pm_schemas {
            tables.pm_schemas.insert(schema.name.clone(), schema.clone());
        }
        for pm in &submission.pm_defs {
            tables.pm_defs.insert(pm.name.clone(), pm.clone());
        }
        for kpi in &submission.kpi_defs {
            tables.kpi_defs.insert(kpi.name.clone(), kpi.clone());
        }
        for augmentation in &submission.augmentations {
            tables.augmentations.insert(augmentation.name.clone(), augmentation.clone());
        }
        for profile in &submission.profiles {
            tables.profiles.insert(profile.name.clone(), profile.clone());
        }
        drop(tables);
        Ok(())
    }
}

// ============================================================================
// SECTION: Deployed Store
// ============================================================================

/// Deployed tables.
#[derive(Debug, Default)]
struct DeployedTables {
    /// Deployed profiles keyed by name.
    profiles: BTreeMap<String, ProfileDefinition>,
    /// Effective augmentations keyed by name.
    augmentations: BTreeMap<String, AugmentationDefinition>,
    /// KPI instances keyed by runtime key.
    instances: BTreeMap<RuntimeKpiKey, ResolvedKpiInstance>,
}

/// In-memory deployed store.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDeployedStore {
    /// Deployed tables protected by a mutex.
    tables: Arc<Mutex<DeployedTables>>,
}

impl InMemoryDeployedStore {
    /// Creates an empty deployed store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every deployed KPI instance in key order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    pub fn all_kpi_instances(&self) -> Result<Vec<ResolvedKpiInstance>, StoreError> {
        Ok(lock(&self.tables, "deployed store")?.instances.values().cloned().collect())
    }
}

impl DeployedStore for InMemoryDeployedStore {
    fn get_deployed_kpi_by_aggregation(
        &self,
        key: &RuntimeKpiKey,
    ) -> Result<Option<ResolvedRuntimeKpi>, StoreError> {
        Ok(lock(&self.tables, "deployed store")?
            .instances
            .get(key)
            .map(|instance| instance.kpi.clone()))
    }

    fn get_deployed_kpis_by_profile(
        &self,
        profile_name: &str,
    ) -> Result<Vec<ResolvedKpiInstance>, StoreError> {
        Ok(lock(&self.tables, "deployed store")?
            .instances
            .values()
            .filter(|instance| instance.profile_name == profile_name)
            .cloned()
            .collect())
    }

    fn get_affected_profiles(
        &self,
        kpi_names: &BTreeSet<String>,
    ) -> Result<Vec<ProfileDefinition>, StoreError> {
        Ok(lock(&self.tables, "deployed store")?
            .profiles
            .values()
            .filter(|profile| profile.references_any_kpi(kpi_names))
            .cloned()
            .collect())
    }

    fn find_all_effective_augmentations(&self) -> Result<Vec<AugmentationDefinition>, StoreError> {
        Ok(lock(&self.tables, "deployed store")?.augmentations.values().cloned().collect())
    }

    fn find_all_profile_names(&self, augmentation_name: &str) -> Result<Vec<String>, StoreError> {
        Ok(lock(&self.tables, "deployed store")?
            .profiles
            .values()
            .filter(|profile| profile.augmentation.as_deref() == Some(augmentation_name))
            .map(|profile| profile.name.clone())
            .collect())
    }

    fn save_profiles(&self, profiles: &[ProfileDefinition]) -> Result<(), StoreError> {
        let mut tables = lock(&self.tables, "deployed store")?;
        for profile in profiles {
            tables.profiles.insert(profile.name.clone(), profile.clone());
        }
        drop(tables);
        Ok(())
    }

    fn save_effective_augmentations(
        &self,
        augmentations: &[AugmentationDefinition],
    ) -> Result<(), StoreError> {
        let mut tables = lock(&self.tables, "deployed store")?;
        for augmentation in augmentations {
            tables.augmentations.insert(augmentation.name.clone(), augmentation.clone());
        }
        drop(tables);
        Ok(())
    }

    fn save_kpi_instances(&self, instances: &[ResolvedKpiInstance]) -> Result<(), StoreError> {
        let mut tables = lock(&self.tables, "deployed store")?;
        for instance in instances {
            tables.instances.insert(instance.key.clone(), instance.clone());
        }
        drop(tables);
        Ok(())
    }
}

// ============================================================================
// SECTION: Provisioning State Store
// ============================================================================

/// In-memory provisioning state store.
#[derive(Debug, Default, Clone)]
pub struct InMemoryProvisioningStateStore {
    /// Rows keyed by id.
    rows: Arc<Mutex<BTreeMap<u64, ProvisioningState>>>,
}

impl InMemoryProvisioningStateStore {
    /// Creates an empty provisioning state store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every row in id order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    pub fn rows(&self) -> Result<Vec<ProvisioningState>, StoreError> {
        Ok(lock(&self.rows, "provisioning state store")?.values().cloned().collect())
    }
}

impl ProvisioningStateStore for InMemoryProvisioningStateStore {
    fn find_latest(&self) -> Result<Option<ProvisioningState>, StoreError> {
        Ok(lock(&self.rows, "provisioning state store")?
            .last_key_value()
            .map(|(_, state)| state.clone()))
    }

    fn insert(
        &self,
        state: ProvisioningStatus,
        started_at: Timestamp,
    ) -> Result<ProvisioningState, StoreError> {
        let mut rows = lock(&self.rows, "provisioning state store")?;
        let id = rows.last_key_value().map_or(1, |(id, _)| id + 1);
        let row = ProvisioningState {
            id,
            state,
            provisioning_start_time: Some(started_at),
            provisioning_end_time: None,
        };
        rows.insert(id, row.clone());
        drop(rows);
        Ok(row)
    }

    fn update(&self, state: &ProvisioningState) -> Result<(), StoreError> {
        let mut rows = lock(&self.rows, "provisioning state store")?;
        let Some(row) = rows.get_mut(&state.id) else {
            return Err(StoreError::Invalid(format!("provisioning state {} not found", state.id)));
        };
        *row = state.clone();
        drop(rows);
        Ok(())
    }
}

// ============================================================================
// SECTION: Shared Store Wrapper
// ============================================================================

/// Shared provisioning state store backed by an `Arc` trait object.
#[derive(Clone)]
pub struct SharedProvisioningStateStore {
    /// Inner store implementation.
    inner: Arc<dyn ProvisioningStateStore + Send + Sync>,
}

impl SharedProvisioningStateStore {
    /// Wraps a provisioning state store in a shared, clonable wrapper.
    #[must_use]
    pub fn from_store(store: impl ProvisioningStateStore + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// Wraps an existing shared store.
    #[must_use]
    pub const fn new(store: Arc<dyn ProvisioningStateStore + Send + Sync>) -> Self {
        Self {
            inner: store,
        }
    }
}

impl ProvisioningStateStore for SharedProvisioningStateStore {
    fn find_latest(&self) -> Result<Option<ProvisioningState>, StoreError> {
        self.inner.find_latest()
    }

    fn insert(
        &self,
        state: ProvisioningStatus,
        started_at: Timestamp,
    ) -> Result<ProvisioningState, StoreError> {
        self.inner.insert(state, started_at)
    }

    fn update(&self, state: &ProvisioningState) -> Result<(), StoreError> {
        self.inner.update(state)
    }
}
