// pm-provisioning-core/src/runtime/overlay.rs
// ============================================================================
// Module: Submission Overlay
// Description: Read-only dictionary view of a submission over a stored dictionary.
// Purpose: Resolve a submission before any of it is persisted.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! [`SubmissionOverlay`] answers dictionary lookups from the submission first
//! and falls back to the wrapped dictionary store. A failed attempt therefore
//! leaves the stored dictionary exactly as it was, and a retry sees the same
//! differences again.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use crate::core::AugmentationDefinition;
use crate::core::KpiDefinition;
use crate::core::PmDefinition;
use crate::core::PmSchemaDefinition;
use crate::core::ProfileDefinition;
use crate::core::ResourceSubmission;
use crate::interfaces::DictionaryStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Overlay
// ============================================================================

/// Dictionary view where submitted resources shadow stored ones.
pub struct SubmissionOverlay<'a, D: ?Sized> {
    /// Submitted resources.
    submission: &'a ResourceSubmission,
    /// Stored dictionary.
    dictionary: &'a D,
}

impl<'a, D: DictionaryStore + ?Sized> SubmissionOverlay<'a, D> {
    /// Creates an overlay of `submission` over `dictionary`.
    #[must_use]
    pub const fn new(submission: &'a ResourceSubmission, dictionary: &'a D) -> Self {
        Self {
            submission,
            dictionary,
        }
    }
}

/// Merges stored and submitted records by name; submitted records win.
fn merge_by_name<T: Clone>(
    stored: Vec<T>,
    submitted: &[T],
    name: impl Fn(&T) -> &str,
) -> Vec<T> {
    let mut merged: BTreeMap<String, T> =
        stored.into_iter().map(|record| (name(&record).to_string(), record)).collect();
    for record in submitted {
        merged.insert(name(record).to_string(), record.clone());
    }
    merged.into_values().collect()
}

impl<D: DictionaryStore + ?Sized> DictionaryStore for SubmissionOverlay<'_, D> {
    fn find_pm_definition(&self, name: &str) -> Result<Option<PmDefinition>, StoreError> {
        match self.submission.pm_defs.iter().find(|pm| pm.name == name) {
            Some(pm) => Ok(Some(pm.clone())),
            None => self.dictionary.find_pm_definition(name),
        }
    }

    fn find_pm_schema(&self, name: &str) -> Result<Option<PmSchemaDefinition>, StoreError> {
        match self.submission.pm_schemas.iter().find(|schema| schema.name == name) {
            Some(schema) => Ok(Some(schema.clone())),
            None => self.dictionary.find_pm_schema(name),
        }
    }

    fn find_schema_by_pm_def_name(
        &self,
        pm_name: &str,
    ) -> Result<Option<PmSchemaDefinition>, StoreError> {
        let Some(pm) = self.submission.pm_defs.iter().find(|pm| pm.name == pm_name) else {
            return self.dictionary.find_schema_by_pm_def_name(pm_name);
        };
        let reference =
            pm.schema_reference().map_err(|err| StoreError::Invalid(err.to_string()))?;
        let schema = self.find_pm_schema(&reference.schema_name)?.unwrap_or_else(|| {
            PmSchemaDefinition {
                name: reference.schema_name,
                data_space: reference.data_space,
                data_category: reference.data_category,
            }
        });
        Ok(Some(schema))
    }

    fn find_kpi_definition(&self, name: &str) -> Result<Option<KpiDefinition>, StoreError> {
        match self.submission.kpi_defs.iter().find(|kpi| kpi.name == name) {
            Some(kpi) => Ok(Some(kpi.clone())),
            None => self.dictionary.find_kpi_definition(name),
        }
    }

    fn find_all_kpi_definitions(&self) -> Result<Vec<KpiDefinition>, StoreError> {
        Ok(merge_by_name(
            self.dictionary.find_all_kpi_definitions()?,
            &self.submission.kpi_defs,
            |kpi| kpi.name.as_str(),
        ))
    }

    fn find_all_augmentations(&self) -> Result<Vec<AugmentationDefinition>, StoreError> {
        Ok(merge_by_name(
            self.dictionary.find_all_augmentations()?,
            &self.submission.augmentations,
            |augmentation| augmentation.name.as_str(),
        ))
    }

    fn find_profile(&self, name: &str) -> Result<Option<ProfileDefinition>, StoreError> {
        match self.submission.profiles.iter().find(|profile| profile.name == name) {
            Some(profile) => Ok(Some(profile.clone())),
            None => self.dictionary.find_profile(name),
        }
    }

    fn find_all_profiles(&self) -> Result<Vec<ProfileDefinition>, StoreError> {
        Ok(merge_by_name(
            self.dictionary.find_all_profiles()?,
            &self.submission.profiles,
            |profile| profile.name.as_str(),
        ))
    }

    fn save_submission(&self, _submission: &ResourceSubmission) -> Result<(), StoreError> {
        Err(StoreError::Invalid("submission overlay is read-only".to_string()))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
