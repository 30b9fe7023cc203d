// pm-provisioning-core/src/runtime/provisioner.rs
// ============================================================================
// Module: Provisioner
// Description: End-to-end provisioning of one resource submission.
// Purpose: Run diff, resolution, and persistence under the state machine.
// Dependencies: crate::{core, interfaces, runtime}, thiserror, tracing
// ============================================================================

//! ## Overview
//! [`Provisioner::provision`] is the single caller-side flow:
//!
//! 1. Save `STARTED` (rejected while another attempt is running).
//! 2. Return early when nothing in the submission changed.
//! 3. Validate the submission and compute the affected profiles.
//! 4. Resolve runtime KPIs against the submission layered over the
//!    dictionary, with a fresh run-scoped cache.
//! 5. Persist KPI instances, effective augmentations, and profiles into the
//!    deployed store, then the submission into the dictionary.
//! 6. Save `COMPLETED`.
//!
//! Any failure after step 1 saves `ERROR` and returns the failure. Nothing is
//! persisted before resolution succeeds, and the dictionary is written last:
//! it is what [`DiffCalculator::is_changed`] compares against, so until it
//! lands a retry sees the same differences and redoes the deployed writes.
//! Those writes are upserts keyed by runtime key or name, and deployed
//! instances keep their names, so repeating them is harmless.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;
use tracing::info;
use tracing::warn;

use crate::core::AugmentationDefinition;
use crate::core::DefinitionError;
use crate::core::ProfileDefinition;
use crate::core::ProvisioningState;
use crate::core::ProvisioningStatus;
use crate::core::ResolvedKpiInstance;
use crate::core::ResourceSubmission;
use crate::interfaces::AugmentationError;
use crate::interfaces::AugmentationUrlResolver;
use crate::interfaces::Clock;
use crate::interfaces::DeployedStore;
use crate::interfaces::DictionaryStore;
use crate::interfaces::NameGenerator;
use crate::interfaces::ProvisioningStateStore;
use crate::interfaces::ReferenceFingerprinter;
use crate::interfaces::StoreError;
use crate::runtime::cache::ResolvedKpiCache;
use crate::runtime::diff::DiffCalculator;
use crate::runtime::diff::DiffError;
use crate::runtime::output::KpiOutputPayload;
use crate::runtime::output::build_output_tables;
use crate::runtime::overlay::SubmissionOverlay;
use crate::runtime::provisioning::ProvisioningError;
use crate::runtime::provisioning::ProvisioningStateMachine;
use crate::runtime::resolver::KpiResolver;
use crate::runtime::resolver::ResolutionError;
use crate::runtime::resolver::ResolverConfig;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by a provisioning attempt.
#[derive(Debug, Error)]
pub enum ProvisionerError {
    /// Submission failed validation.
    #[error("invalid submission: {0}")]
    InvalidSubmission(#[from] DefinitionError),
    /// Diff calculation failed.
    #[error(transparent)]
    Diff(#[from] DiffError),
    /// KPI resolution failed.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    /// State machine rejected a transition or failed to persist it.
    #[error(transparent)]
    Provisioning(#[from] ProvisioningError),
    /// Augmentation URL could not be resolved.
    #[error(transparent)]
    Augmentation(#[from] AugmentationError),
    /// Collaborator store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// Result of a successful provisioning attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningOutcome {
    /// Final state row of the attempt.
    pub state: ProvisioningState,
    /// Whether the submission differed from the stored resources.
    pub changed: bool,
    /// Names of the profiles that were re-resolved, sorted.
    pub affected_profiles: Vec<String>,
    /// Instances resolved and persisted by this attempt.
    pub instances: Vec<ResolvedKpiInstance>,
    /// Previously deployed instances of affected profiles that no longer resolve.
    pub superseded: Vec<ResolvedKpiInstance>,
}

impl ProvisioningOutcome {
    /// Returns the output table payload for the resolved instances.
    #[must_use]
    pub fn output_tables(&self) -> KpiOutputPayload {
        build_output_tables(&self.instances)
    }
}

/// Work done by one attempt before its state is closed out.
#[derive(Debug, Default)]
struct RunReport {
    /// Whether the submission changed anything.
    changed: bool,
    /// Names of re-resolved profiles.
    affected_profiles: Vec<String>,
    /// Persisted instances.
    instances: Vec<ResolvedKpiInstance>,
    /// Superseded instances.
    superseded: Vec<ResolvedKpiInstance>,
}

// ============================================================================
// SECTION: Provisioner
// ============================================================================

/// Stores used by a provisioner.
#[derive(Debug, Clone)]
pub struct ProvisionerStores<D, P, S> {
    /// Dictionary store.
    pub dictionary: D,
    /// Deployed store.
    pub deployed: P,
    /// Provisioning state store.
    pub state: S,
}

/// Provisions resource submissions end to end.
pub struct Provisioner<D, P, S, U, N, F, C> {
    /// Dictionary store.
    dictionary: D,
    /// Deployed store.
    deployed: P,
    /// Provisioning lifecycle.
    states: ProvisioningStateMachine<S>,
    /// Augmentation URL resolver.
    urls: U,
    /// Runtime name source.
    names: N,
    /// Complex reference fingerprinter.
    fingerprinter: F,
    /// Source of state timestamps.
    clock: C,
    /// Resolver settings.
    config: ResolverConfig,
}

impl<D, P, S, U, N, F, C> Provisioner<D, P, S, U, N, F, C>
where
    D: DictionaryStore,
    P: DeployedStore,
    S: ProvisioningStateStore,
    U: AugmentationUrlResolver,
    N: NameGenerator,
    F: ReferenceFingerprinter,
    C: Clock,
{
    /// Creates a provisioner.
    #[must_use]
    pub fn new(
        stores: ProvisionerStores<D, P, S>,
        urls: U,
        names: N,
        fingerprinter: F,
        clock: C,
        config: ResolverConfig,
    ) -> Self {
        let ProvisionerStores {
            dictionary,
            deployed,
            state,
        } = stores;
        Self {
            dictionary,
            deployed,
            states: ProvisioningStateMachine::new(state),
            urls,
            names,
            fingerprinter,
            clock,
            config,
        }
    }

    /// Returns the dictionary store.
    #[must_use]
    pub const fn dictionary(&self) -> &D {
        &self.dictionary
    }

    /// Returns the deployed store.
    #[must_use]
    pub const fn deployed(&self) -> &P {
        &self.deployed
    }

    /// Returns the provisioning state machine.
    #[must_use]
    pub const fn states(&self) -> &ProvisioningStateMachine<S> {
        &self.states
    }

    /// Provisions one submission.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionerError`] when the attempt cannot start or fails;
    /// a failed attempt is recorded as `ERROR`.
    pub fn provision(
        &self,
        submission: &ResourceSubmission,
    ) -> Result<ProvisioningOutcome, ProvisionerError> {
        let started = self.states.save(ProvisioningStatus::Started, self.clock.now())?;
        info!(id = started.id, "provisioning started");

        match self.run(submission) {
            Ok(report) => {
                let state = self.states.save(ProvisioningStatus::Completed, self.clock.now())?;
                info!(
                    id = state.id,
                    changed = report.changed,
                    profiles = report.affected_profiles.len(),
                    instances = report.instances.len(),
                    superseded = report.superseded.len(),
                    "provisioning completed"
                );
                Ok(ProvisioningOutcome {
                    state,
                    changed: report.changed,
                    affected_profiles: report.affected_profiles,
                    instances: report.instances,
                    superseded: report.superseded,
                })
            }
            Err(err) => {
                warn!(id = started.id, error = %err, "provisioning failed");
                if let Err(save_err) = self.states.save(ProvisioningStatus::Error, self.clock.now())
                {
                    warn!(
                        id = started.id,
                        error = %save_err,
                        "failed to record provisioning error"
                    );
                }
                Err(err)
            }
        }
    }

    /// Runs diff, resolution, and persistence for one attempt.
    fn run(&self, submission: &ResourceSubmission) -> Result<RunReport, ProvisionerError> {
        let diff = DiffCalculator::new(&self.dictionary, &self.deployed, &self.urls);
        if !diff.is_changed(submission)? {
            info!("submission matches stored resources; nothing to provision");
            return Ok(RunReport::default());
        }
        submission.validate()?;
        let profiles = diff.get_affected_profiles(submission)?;
        let effective = self.effective_augmentations(&submission.augmentations)?;

        let overlay = SubmissionOverlay::new(submission, &self.dictionary);
        let resolver = KpiResolver::new(
            &overlay,
            &self.deployed,
            &self.names,
            &self.fingerprinter,
            &self.config,
        )?;
        let mut cache = ResolvedKpiCache::new();
        let instances = resolver.calculate_affected_kpis(&profiles, &mut cache)?;
        let superseded = self.superseded_instances(&profiles, &cache)?;

        self.deployed.save_kpi_instances(&instances)?;
        self.deployed.save_effective_augmentations(&effective)?;
        self.deployed.save_profiles(&profiles)?;
        self.dictionary.save_submission(submission)?;

        Ok(RunReport {
            changed: true,
            affected_profiles: profiles.into_iter().map(|profile| profile.name).collect(),
            instances,
            superseded,
        })
    }

    /// Resolves the URLs of submitted augmentations.
    fn effective_augmentations(
        &self,
        augmentations: &[AugmentationDefinition],
    ) -> Result<Vec<AugmentationDefinition>, AugmentationError> {
        augmentations
            .iter()
            .map(|augmentation| {
                Ok(augmentation.with_url(self.urls.resolve_url(&augmentation.url)?))
            })
            .collect()
    }

    /// Returns deployed instances of `profiles` that this run no longer produces.
    fn superseded_instances(
        &self,
        profiles: &[ProfileDefinition],
        cache: &ResolvedKpiCache,
    ) -> Result<Vec<ResolvedKpiInstance>, StoreError> {
        let mut superseded = Vec::new();
        for profile in profiles {
            superseded.extend(
                self.deployed
                    .get_deployed_kpis_by_profile(&profile.name)?
                    .into_iter()
                    .filter(|instance| !cache.contains(&instance.key)),
            );
        }
        Ok(superseded)
    }
}
