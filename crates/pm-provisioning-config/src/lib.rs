// pm-provisioning-config/src/lib.rs
// ============================================================================
// Module: PM Provisioning Config Library
// Description: Canonical config model, validation, and collaborator wiring.
// Purpose: Single source of truth for pm-provisioning.toml semantics.
// Dependencies: pm-provisioning-core, pm-provisioning-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `pm-provisioning-config` defines the canonical configuration model for the
//! PM provisioning control plane. It provides strict, fail-closed validation
//! and builds the runtime collaborators the configuration selects: resolver
//! settings, the provisioning state store, the augmentation URL resolver, and
//! the tracing subscriber.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod augmentation;
pub mod config;
pub mod logging;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use augmentation::PlaceholderUrlResolver;
pub use config::*;
pub use logging::LoggingError;
pub use logging::init_tracing;
