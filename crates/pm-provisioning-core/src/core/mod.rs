// pm-provisioning-core/src/core/mod.rs
// ============================================================================
// Module: Provisioning Core Types
// Description: Declarative resources, runtime KPI model, and provisioning state.
// Purpose: Provide stable, serializable types for submissions and resolution output.
// Dependencies: serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! Core types define what operators submit (PM, KPI, profile, and
//! augmentation definitions), what the resolver produces (runtime KPI
//! instances), and the provisioning lifecycle. These types are the canonical
//! source of truth for every store implementation.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod definitions;
pub mod hashing;
pub mod runtime_kpi;
pub mod state;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use definitions::AggregationPeriod;
pub use definitions::AugmentationDefinition;
pub use definitions::AugmentationField;
pub use definitions::AugmentationRule;
pub use definitions::DefinitionError;
pub use definitions::InputMetric;
pub use definitions::InputMetricOverride;
pub use definitions::InputMetricType;
pub use definitions::KpiDefinition;
pub use definitions::KpiKind;
pub use definitions::KpiReference;
pub use definitions::PmDefinition;
pub use definitions::PmSchemaDefinition;
pub use definitions::ProfileDefinition;
pub use definitions::ResourceSubmission;
pub use definitions::SchemaReference;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use runtime_kpi::KpiAlias;
pub use runtime_kpi::KpiDefinitionDto;
pub use runtime_kpi::KpiSource;
pub use runtime_kpi::ResolvedKpiInstance;
pub use runtime_kpi::ResolvedRuntimeKpi;
pub use runtime_kpi::RuntimeKpiKey;
pub use state::ProvisioningState;
pub use state::ProvisioningStatus;
pub use state::TransitionError;
pub use time::Timestamp;
