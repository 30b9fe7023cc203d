// pm-provisioning-core/src/lib.rs
// ============================================================================
// Module: PM Provisioning Core Library
// Description: Public API surface for the PM/KPI provisioning engine.
// Purpose: Expose core types, collaborator interfaces, and the runtime engine.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! PM provisioning core decides which declarative PM, KPI, profile, and
//! augmentation resources changed, resolves affected profiles into concrete
//! runtime KPI definitions (qualified expressions, joins, fact tables), and
//! tracks each provisioning attempt through a small state machine. It is
//! storage-agnostic and integrates through explicit interfaces.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use interfaces::AugmentationError;
pub use interfaces::AugmentationUrlResolver;
pub use interfaces::Clock;
pub use interfaces::DeployedStore;
pub use interfaces::DictionaryStore;
pub use interfaces::NameGenerator;
pub use interfaces::ProvisioningStateStore;
pub use interfaces::ReferenceFingerprinter;
pub use interfaces::StoreError;
pub use runtime::AliasError;
pub use runtime::AliasPolicy;
pub use runtime::CanonicalFingerprinter;
pub use runtime::DiffCalculator;
pub use runtime::DiffError;
pub use runtime::ExpressionError;
pub use runtime::InMemoryDeployedStore;
pub use runtime::InMemoryDictionaryStore;
pub use runtime::InMemoryProvisioningStateStore;
pub use runtime::KpiOutputPayload;
pub use runtime::KpiOutputTable;
pub use runtime::KpiResolver;
pub use runtime::Provisioner;
pub use runtime::ProvisionerError;
pub use runtime::ProvisionerStores;
pub use runtime::ProvisioningError;
pub use runtime::ProvisioningOutcome;
pub use runtime::ProvisioningStateMachine;
pub use runtime::ResolutionError;
pub use runtime::ResolvedKpiCache;
pub use runtime::ResolverConfig;
pub use runtime::SequentialNameGenerator;
pub use runtime::SharedProvisioningStateStore;
pub use runtime::SubmissionOverlay;
pub use runtime::SystemClock;
pub use runtime::UuidNameGenerator;
pub use runtime::build_output_tables;
