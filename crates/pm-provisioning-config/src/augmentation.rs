// pm-provisioning-config/src/augmentation.rs
// ============================================================================
// Module: Augmentation URL Placeholders
// Description: Config-backed AugmentationUrlResolver.
// Purpose: Substitute `${NAME}` placeholders in augmentation URLs.
// Dependencies: pm-provisioning-core
// ============================================================================

//! ## Overview
//! Augmentation URLs are stored raw, with `${NAME}` placeholders standing in
//! for deployment-specific hosts and ports. [`PlaceholderUrlResolver`]
//! substitutes configured values in a single pass; substituted values are not
//! rescanned. Unknown names and unterminated placeholders fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use pm_provisioning_core::AugmentationError;
use pm_provisioning_core::AugmentationUrlResolver;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Opening marker of a placeholder.
const PLACEHOLDER_OPEN: &str = "${";
/// Closing marker of a placeholder.
const PLACEHOLDER_CLOSE: char = '}';

// ============================================================================
// SECTION: Resolver
// ============================================================================

/// Resolves `${NAME}` placeholders from a fixed value table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderUrlResolver {
    /// Placeholder values keyed by name.
    values: BTreeMap<String, String>,
}

impl PlaceholderUrlResolver {
    /// Creates a resolver over the given placeholder values.
    #[must_use]
    pub const fn new(values: BTreeMap<String, String>) -> Self {
        Self {
            values,
        }
    }

    /// Returns the configured placeholder values.
    #[must_use]
    pub const fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }
}

impl AugmentationUrlResolver for PlaceholderUrlResolver {
    fn resolve_url(&self, raw_url: &str) -> Result<String, AugmentationError> {
        let mut resolved = String::with_capacity(raw_url.len());
        let mut rest = raw_url;
        while let Some(start) = rest.find(PLACEHOLDER_OPEN) {
            let (literal, marked) = rest.split_at(start);
            resolved.push_str(literal);
            let body = &marked[PLACEHOLDER_OPEN.len() ..];
            let Some((name, tail)) = body.split_once(PLACEHOLDER_CLOSE) else {
                return Err(AugmentationError::MalformedPlaceholder(raw_url.to_string()));
            };
            let value =
                self.values.get(name).ok_or_else(|| AugmentationError::UnresolvedPlaceholder {
                    placeholder: name.to_string(),
                    url: raw_url.to_string(),
                })?;
            resolved.push_str(value);
            rest = tail;
        }
        resolved.push_str(rest);
        Ok(resolved)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
