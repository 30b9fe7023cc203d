// pm-provisioning-core/src/runtime/diff.rs
// ============================================================================
// Module: Diff Calculator
// Description: Change detection between a submission and the stored catalogs.
// Purpose: Find the profiles whose runtime KPIs must be (re)computed.
// Dependencies: crate::{core, interfaces}, thiserror, tracing
// ============================================================================

//! ## Overview
//! The diff calculator is read-only against both stores. Change is
//! structural equality against the dictionary; augmentations are also
//! compared against their deployed (effective) form after URL resolution,
//! because effective augmentations store resolved URLs.
//!
//! Affected KPIs propagate transitively: a complex KPI is affected when any
//! KPI it consumes is affected. Affected profiles are de-duplicated by name,
//! and the submitted version of a profile always wins.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use thiserror::Error;
use tracing::debug;
use tracing::info;

use crate::core::AugmentationDefinition;
use crate::core::InputMetricType;
use crate::core::KpiDefinition;
use crate::core::ProfileDefinition;
use crate::core::ResourceSubmission;
use crate::interfaces::AugmentationError;
use crate::interfaces::AugmentationUrlResolver;
use crate::interfaces::DeployedStore;
use crate::interfaces::DictionaryStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while computing a diff.
#[derive(Debug, Error)]
pub enum DiffError {
    /// Collaborator store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Augmentation URL could not be resolved.
    #[error(transparent)]
    Augmentation(#[from] AugmentationError),
}

// ============================================================================
// SECTION: Diff Calculator
// ============================================================================

/// Computes changed resources and affected profiles for a submission.
pub struct DiffCalculator<'a, D: ?Sized, P: ?Sized, U: ?Sized> {
    /// Dictionary store.
    dictionary: &'a D,
    /// Deployed store.
    deployed: &'a P,
    /// Augmentation URL resolver.
    urls: &'a U,
}

impl<'a, D, P, U> DiffCalculator<'a, D, P, U>
where
    D: DictionaryStore + ?Sized,
    P: DeployedStore + ?Sized,
    U: AugmentationUrlResolver + ?Sized,
{
    /// Creates a diff calculator over the given collaborators.
    #[must_use]
    pub const fn new(dictionary: &'a D, deployed: &'a P, urls: &'a U) -> Self {
        Self {
            dictionary,
            deployed,
            urls,
        }
    }

    /// Returns true when any submitted resource differs from its stored form.
    ///
    /// Checks KPIs, PMs, PM schemas, augmentations, then profiles, and stops at
    /// the first difference.
    ///
    /// # Errors
    ///
    /// Returns [`DiffError`] when a store lookup or URL resolution fails.
    pub fn is_changed(&self, submission: &ResourceSubmission) -> Result<bool, DiffError> {
        for kpi in &submission.kpi_defs {
            if !self.dictionary.is_kpi_matched(kpi)? {
                debug!(kpi = %kpi.name, "kpi definition changed");
                return Ok(true);
            }
        }
        for pm in &submission.pm_defs {
            if !self.dictionary.is_pm_matched(pm)? {
                debug!(pm = %pm.name, "pm definition changed");
                return Ok(true);
            }
        }
        for schema in &submission.pm_schemas {
            if !self.dictionary.is_pm_schema_matched(schema)? {
                debug!(schema = %schema.name, "pm schema changed");
                return Ok(true);
            }
        }
        if !self.changed_augmentations(submission)?.is_empty() {
            return Ok(true);
        }
        for profile in &submission.profiles {
            if !self.dictionary.is_profile_matched(profile)? {
                debug!(profile = %profile.name, "profile changed");
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Returns every profile affected by the submission, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns [`DiffError`] when a store lookup or URL resolution fails.
    pub fn get_affected_profiles(
        &self,
        submission: &ResourceSubmission,
    ) -> Result<Vec<ProfileDefinition>, DiffError> {
        let changed_pms = self.changed_pm_names(submission)?;
        let affected_kpis = self.affected_kpi_names(submission, &changed_pms)?;
        let changed_augmentations = self.changed_augmentations(submission)?;

        let mut profiles: BTreeMap<String, ProfileDefinition> = BTreeMap::new();
        if !affected_kpis.is_empty() {
            for profile in self.deployed.get_affected_profiles(&affected_kpis)? {
                profiles.entry(profile.name.clone()).or_insert(profile);
            }
        }
        for augmentation in &changed_augmentations {
            for name in self.deployed.find_all_profile_names(augmentation)? {
                if let Some(profile) = self.dictionary.find_profile(&name)? {
                    profiles.entry(name).or_insert(profile);
                }
            }
        }
        for profile in &submission.profiles {
            let bound_to_changed_augmentation = profile
                .augmentation
                .as_ref()
                .is_some_and(|name| changed_augmentations.contains(name));
            let affected = bound_to_changed_augmentation
                || profiles.contains_key(&profile.name)
                || !self.dictionary.is_profile_matched(profile)?;
            if affected {
                profiles.insert(profile.name.clone(), profile.clone());
            }
        }

        info!(
            changed_pms = changed_pms.len(),
            affected_kpis = affected_kpis.len(),
            changed_augmentations = changed_augmentations.len(),
            affected_profiles = profiles.len(),
            "computed affected profiles"
        );
        Ok(profiles.into_values().collect())
    }

    /// Returns names of submitted PM definitions that differ from the dictionary.
    fn changed_pm_names(
        &self,
        submission: &ResourceSubmission,
    ) -> Result<BTreeSet<String>, DiffError> {
        let mut changed = BTreeSet::new();
        for pm in &submission.pm_defs {
            if !self.dictionary.is_pm_matched(pm)? {
                changed.insert(pm.name.clone());
            }
        }
        Ok(changed)
    }

    /// Returns names of KPIs affected by changed PMs or changed KPI definitions.
    fn affected_kpi_names(
        &self,
        submission: &ResourceSubmission,
        changed_pms: &BTreeSet<String>,
    ) -> Result<BTreeSet<String>, DiffError> {
        let mut catalog: BTreeMap<String, KpiDefinition> = self
            .dictionary
            .find_all_kpi_definitions()?
            .into_iter()
            .map(|kpi| (kpi.name.clone(), kpi))
            .collect();

        let mut affected = BTreeSet::new();
        for kpi in catalog.values() {
            if kpi.references_any(InputMetricType::PmData, changed_pms) {
                affected.insert(kpi.name.clone());
            }
        }
        for kpi in &submission.kpi_defs {
            if kpi.references_any(InputMetricType::PmData, changed_pms)
                || !self.dictionary.is_kpi_matched(kpi)?
            {
                affected.insert(kpi.name.clone());
            }
            catalog.insert(kpi.name.clone(), kpi.clone());
        }

        loop {
            let consumers: Vec<String> = catalog
                .values()
                .filter(|kpi| !affected.contains(&kpi.name))
                .filter(|kpi| kpi.references_any(InputMetricType::Kpi, &affected))
                .map(|kpi| kpi.name.clone())
                .collect();
            if consumers.is_empty() {
                break;
            }
            affected.extend(consumers);
        }
        Ok(affected)
    }

    /// Returns names of submitted augmentations that differ from their stored forms.
    fn changed_augmentations(
        &self,
        submission: &ResourceSubmission,
    ) -> Result<BTreeSet<String>, DiffError> {
        let mut changed = BTreeSet::new();
        if submission.augmentations.is_empty() {
            return Ok(changed);
        }
        let dictionary = by_name(self.dictionary.find_all_augmentations()?);
        let effective = by_name(self.deployed.find_all_effective_augmentations()?);
        for augmentation in &submission.augmentations {
            let in_dictionary = dictionary.get(&augmentation.name) == Some(augmentation);
            let is_changed = if in_dictionary {
                let resolved = augmentation.with_url(self.urls.resolve_url(&augmentation.url)?);
                effective.get(&augmentation.name) != Some(&resolved)
            } else {
                true
            };
            if is_changed {
                debug!(augmentation = %augmentation.name, "augmentation changed");
                changed.insert(augmentation.name.clone());
            }
        }
        Ok(changed)
    }
}

/// Indexes augmentations by name.
fn by_name(
    augmentations: Vec<AugmentationDefinition>,
) -> BTreeMap<String, AugmentationDefinition> {
    augmentations
        .into_iter()
        .map(|augmentation| (augmentation.name.clone(), augmentation))
        .collect()
}
