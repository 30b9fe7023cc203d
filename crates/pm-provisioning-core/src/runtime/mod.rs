// pm-provisioning-core/src/runtime/mod.rs
// ============================================================================
// Module: Provisioning Runtime
// Description: Diff calculator, KPI resolver, SQL builder, and state machine.
// Purpose: Decide what must be (re)computed and what runtime KPIs look like.
// Dependencies: crate::{core, interfaces}, regex, uuid, tracing
// ============================================================================

//! ## Overview
//! Runtime modules implement the reconciliation engine. The diff calculator
//! and resolver are read-only against their stores; only the provisioner
//! persists results, and only after the whole batch resolved.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod alias;
pub mod cache;
pub mod diff;
pub mod expression;
pub mod naming;
pub mod output;
pub mod overlay;
pub mod provisioner;
pub mod provisioning;
pub mod resolver;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use alias::AliasError;
pub use alias::AliasPolicy;
pub use alias::DEFAULT_MAX_ALIAS_LENGTH;
pub use alias::MAX_ALIAS_LENGTH;
pub use alias::MIN_ALIAS_LENGTH;
pub use cache::ResolvedKpiCache;
pub use diff::DiffCalculator;
pub use diff::DiffError;
pub use expression::ExpressionError;
pub use expression::FactTableContexts;
pub use naming::CanonicalFingerprinter;
pub use naming::DEFAULT_NAME_PREFIX;
pub use naming::SequentialNameGenerator;
pub use naming::SystemClock;
pub use naming::UuidNameGenerator;
pub use output::KpiOutputPayload;
pub use output::KpiOutputTable;
pub use output::build_output_tables;
pub use overlay::SubmissionOverlay;
pub use provisioner::Provisioner;
pub use provisioner::ProvisionerError;
pub use provisioner::ProvisionerStores;
pub use provisioner::ProvisioningOutcome;
pub use provisioning::ProvisioningError;
pub use provisioning::ProvisioningStateMachine;
pub use resolver::DEFAULT_COMPLEX_EXECUTION_GROUP;
pub use resolver::KpiResolver;
pub use resolver::ResolutionError;
pub use resolver::ResolverConfig;
pub use store::InMemoryDeployedStore;
pub use store::InMemoryDictionaryStore;
pub use store::InMemoryProvisioningStateStore;
pub use store::SharedProvisioningStateStore;
