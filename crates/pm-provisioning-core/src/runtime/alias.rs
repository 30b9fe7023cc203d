// pm-provisioning-core/src/runtime/alias.rs
// ============================================================================
// Module: Fact Table Alias Policy
// Description: Deterministic alias derivation and alias pattern enforcement.
// Purpose: Give every runtime KPI a fact table alias that downstream tables accept.
// Dependencies: crate::core, regex, thiserror
// ============================================================================

//! ## Overview
//! An alias is derived from the KPI kind, an owner name (the PM schema for
//! simple KPIs, the KPI definition for complex ones), and the unqualified
//! aggregation fields. Derivation is deterministic, so every KPI sharing
//! those three inputs lands in the same fact table.
//!
//! The readable form `<kind>_<owner>_<field>...` is used only when every
//! segment is plain ASCII alphanumeric (compared case-insensitively, since
//! fact tables are SQL identifiers). Any other segment, or a readable form
//! longer than the configured maximum, yields `<kind>__<digest prefix>` over
//! the canonical `[kind, owner, fields]`. Readable aliases never contain
//! `__`, so distinct field lists never share a fact table. Every alias is checked against
//! `^[a-z][a-z0-9_]{0,N}$` before it leaves this module; a failure is a
//! defect, never a user error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use regex::Regex;
use thiserror::Error;

use crate::core::HashAlgorithm;
use crate::core::HashError;
use crate::core::KpiAlias;
use crate::core::KpiKind;
use crate::core::hashing::hash_canonical_json;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Smallest accepted maximum alias length.
pub const MIN_ALIAS_LENGTH: usize = 24;
/// Largest accepted maximum alias length.
pub const MAX_ALIAS_LENGTH: usize = 54;
/// Default maximum alias length.
pub const DEFAULT_MAX_ALIAS_LENGTH: usize = 32;
/// Hex characters of the digest kept in a compressed alias; `complex__` plus
/// the digest fits the smallest accepted maximum length.
const COMPRESSED_DIGEST_LEN: usize = 15;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by alias derivation.
#[derive(Debug, Error)]
pub enum AliasError {
    /// Configured maximum alias length is outside the accepted range.
    #[error("max alias length {0} must be between 24 and 54")]
    InvalidMaxLength(usize),
    /// Alias pattern failed to compile.
    #[error("alias pattern failed to compile: {0}")]
    Pattern(String),
    /// A generated alias does not match the alias pattern.
    #[error("generated alias {alias} does not match {pattern}")]
    Invalid {
        /// Offending alias.
        alias: String,
        /// Alias pattern source.
        pattern: String,
    },
    /// Digest computation failed while compressing an alias.
    #[error(transparent)]
    Hash(#[from] HashError),
}

// ============================================================================
// SECTION: Alias Policy
// ============================================================================

/// Derives and validates fact table aliases.
#[derive(Debug, Clone)]
pub struct AliasPolicy {
    /// Maximum alias length in characters.
    max_length: usize,
    /// Compiled alias pattern.
    pattern: Regex,
    /// Digest algorithm used for compression.
    hash_algorithm: HashAlgorithm,
}

impl AliasPolicy {
    /// Creates an alias policy for the given maximum length.
    ///
    /// # Errors
    ///
    /// Returns [`AliasError::InvalidMaxLength`] when `max_length` is out of
    /// range.
    pub fn new(max_length: usize, hash_algorithm: HashAlgorithm) -> Result<Self, AliasError> {
        if !(MIN_ALIAS_LENGTH ..= MAX_ALIAS_LENGTH).contains(&max_length) {
            return Err(AliasError::InvalidMaxLength(max_length));
        }
        let source = format!("^[a-z][a-z0-9_]{{0,{}}}$", max_length - 1);
        let pattern = Regex::new(&source).map_err(|err| AliasError::Pattern(err.to_string()))?;
        Ok(Self {
            max_length,
            pattern,
            hash_algorithm,
        })
    }

    /// Returns the maximum alias length.
    #[must_use]
    pub const fn max_length(&self) -> usize {
        self.max_length
    }

    /// Returns the alias pattern source.
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Returns true when `candidate` matches the alias pattern.
    #[must_use]
    pub fn is_valid(&self, candidate: &str) -> bool {
        self.pattern.is_match(candidate)
    }

    /// Derives the alias for a kind, owner, and unqualified field list.
    ///
    /// # Errors
    ///
    /// Returns [`AliasError::Invalid`] when the derived alias fails the
    /// pattern and [`AliasError::Hash`] when compression fails.
    pub fn derive(
        &self,
        kind: KpiKind,
        owner: &str,
        fields: &[String],
    ) -> Result<KpiAlias, AliasError> {
        let segments = || std::iter::once(owner).chain(fields.iter().map(String::as_str));
        let mut alias = String::from(kind.label());
        let plain = segments().all(is_plain_segment);
        if plain {
            for segment in segments() {
                alias.push('_');
                alias.push_str(&segment.to_ascii_lowercase());
            }
        }
        if !plain || alias.len() > self.max_length {
            let digest =
                hash_canonical_json(self.hash_algorithm, &(kind.label(), owner, fields))?;
            alias = format!("{}__{}", kind.label(), digest.prefix(COMPRESSED_DIGEST_LEN));
        }
        self.validate(alias)
    }

    /// Wraps `candidate` as an alias when it matches the pattern.
    ///
    /// # Errors
    ///
    /// Returns [`AliasError::Invalid`] when the pattern does not match.
    pub fn validate(&self, candidate: String) -> Result<KpiAlias, AliasError> {
        if self.is_valid(&candidate) {
            Ok(KpiAlias::from_validated(candidate))
        } else {
            Err(AliasError::Invalid {
                alias: candidate,
                pattern: self.pattern.as_str().to_string(),
            })
        }
    }
}

/// Returns true when `segment` can be spelled out in an alias unchanged.
///
/// Plain segments are non-empty ASCII alphanumerics, so `_` only ever
/// separates segments and the readable form maps back to one field list.
fn is_plain_segment(segment: &str) -> bool {
    !segment.is_empty() && segment.chars().all(|c| c.is_ascii_alphanumeric())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use super::*;
    use crate::core::DEFAULT_HASH_ALGORITHM;

    /// Builds an owned field list.
    fn fields(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| (*value).to_string()).collect()
    }

    /// Verifies plain segments are spelled out in lowercase.
    #[test]
    fn plain_segments_stay_readable() {
        let policy = AliasPolicy::new(DEFAULT_MAX_ALIAS_LENGTH, DEFAULT_HASH_ALGORITHM).unwrap();
        let alias =
            policy.derive(KpiKind::Simple, "schemaNameB", &fields(&["agg1", "cellId"])).unwrap();
        assert_eq!(alias.as_str(), "simple_schemanameb_agg1_cellid");
    }

    /// Verifies segments that would blur field boundaries use the digest form.
    #[test]
    fn separator_like_characters_force_digest_form() {
        let policy = AliasPolicy::new(MAX_ALIAS_LENGTH, DEFAULT_HASH_ALGORITHM).unwrap();
        let split = policy.derive(KpiKind::Simple, "schemaNameB", &fields(&["agg1", "agg2"]));
        let joined = policy.derive(KpiKind::Simple, "schemaNameB", &fields(&["agg1_agg2"]));
        let dashed = policy.derive(KpiKind::Simple, "schemaNameB", &fields(&["agg1-agg2"]));
        let (split, joined, dashed) = (split.unwrap(), joined.unwrap(), dashed.unwrap());

        assert_eq!(split.as_str(), "simple_schemanameb_agg1_agg2");
        assert!(joined.as_str().starts_with("simple__"));
        assert!(dashed.as_str().starts_with("simple__"));
        assert_ne!(split, joined);
        assert_ne!(split, dashed);
        assert_ne!(joined, dashed);
    }

    /// Verifies an owner containing `_` cannot absorb a field segment.
    #[test]
    fn owner_underscore_does_not_alias_an_extra_field() {
        let policy = AliasPolicy::new(MAX_ALIAS_LENGTH, DEFAULT_HASH_ALGORITHM).unwrap();
        let nested = policy.derive(KpiKind::Complex, "complex_ab", &fields(&["agg1"])).unwrap();
        let flat = policy.derive(KpiKind::Complex, "complex", &fields(&["ab", "agg1"])).unwrap();
        assert_eq!(flat.as_str(), "complex_complex_ab_agg1");
        assert_eq!(nested.as_str(), "complex__d5a6b1784306c29");
    }

    /// Verifies readable aliases over the maximum length are compressed.
    #[test]
    fn long_alias_is_compressed_to_digest_prefix() {
        let policy = AliasPolicy::new(MIN_ALIAS_LENGTH, DEFAULT_HASH_ALGORITHM).unwrap();
        let fields = fields(&["managedElement", "nodeFunction"]);
        let alias = policy.derive(KpiKind::Complex, "cellAvailability", &fields).unwrap();
        assert!(alias.as_str().starts_with("complex__"));
        assert_eq!(alias.as_str().len(), "complex__".len() + COMPRESSED_DIGEST_LEN);
        let again = policy.derive(KpiKind::Complex, "cellAvailability", &fields).unwrap();
        assert_eq!(alias, again);
    }

    /// Verifies maximum lengths outside 24..=54 are rejected.
    #[test]
    fn max_length_outside_range_is_rejected() {
        assert!(AliasPolicy::new(MIN_ALIAS_LENGTH - 1, DEFAULT_HASH_ALGORITHM).is_err());
        assert!(AliasPolicy::new(MAX_ALIAS_LENGTH + 1, DEFAULT_HASH_ALGORITHM).is_err());
    }
}
