// pm-provisioning-core/src/core/definitions.rs
// ============================================================================
// Module: Declarative Resource Definitions
// Description: PM, PM schema, KPI, profile, and augmentation resources.
// Purpose: Provide the canonical, serializable model operators submit.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Operators submit declarative resources in a [`ResourceSubmission`]. These
//! types are the canonical source of truth for the dictionary store and for
//! every diff and resolution decision. Equality is structural: two resources
//! with the same name but different content are considered changed.
//!
//! Validation happens at the submission boundary via
//! [`ResourceSubmission::validate`]; aggregation periods are validated when
//! they are constructed or deserialized.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when a declarative resource is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    /// A resource name is empty.
    #[error("{kind} name must be non-empty")]
    EmptyName {
        /// Resource kind label.
        kind: &'static str,
    },
    /// Two resources of the same kind share a name.
    #[error("duplicate {kind} name: {name}")]
    DuplicateName {
        /// Resource kind label.
        kind: &'static str,
        /// Duplicated name.
        name: String,
    },
    /// Aggregation period outside the permitted set.
    #[error("invalid aggregation period {0}: permitted values are 15, 60, 1440")]
    InvalidAggregationPeriod(u32),
    /// PM schema reference is not `<data_space>|<data_category>|<schema_name>`.
    #[error("invalid schema reference: {0}")]
    InvalidSchemaReference(String),
    /// KPI input metric has an empty identifier.
    #[error("kpi {kpi} has an input metric with an empty id")]
    EmptyInputMetricId {
        /// KPI definition name.
        kpi: String,
    },
    /// Profile context is empty or contains an empty field.
    #[error("profile {profile} has an empty aggregation context field")]
    EmptyContextField {
        /// Profile name.
        profile: String,
    },
}

// ============================================================================
// SECTION: Aggregation Period
// ============================================================================

/// Aggregation period in minutes.
///
/// # Invariants
/// - Always one of [`AggregationPeriod::PERMITTED`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct AggregationPeriod(u32);

impl AggregationPeriod {
    /// Permitted aggregation periods in minutes.
    pub const PERMITTED: [u32; 3] = [15, 60, 1440];
    /// Fifteen-minute period.
    pub const QUARTER_HOUR: Self = Self(15);
    /// One-hour period.
    pub const HOUR: Self = Self(60);
    /// One-day period.
    pub const DAY: Self = Self(1440);

    /// Creates a validated aggregation period.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::InvalidAggregationPeriod`] when the value is
    /// not permitted.
    pub fn new(minutes: u32) -> Result<Self, DefinitionError> {
        if Self::PERMITTED.contains(&minutes) {
            Ok(Self(minutes))
        } else {
            Err(DefinitionError::InvalidAggregationPeriod(minutes))
        }
    }

    /// Returns the period in minutes.
    #[must_use]
    pub const fn minutes(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for AggregationPeriod {
    type Error = DefinitionError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AggregationPeriod> for u32 {
    fn from(value: AggregationPeriod) -> Self {
        value.0
    }
}

impl fmt::Display for AggregationPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: PM Schemas and Definitions
// ============================================================================

/// Parsed `<data_space>|<data_category>|<schema_name>` reference.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchemaReference {
    /// Data space the schema lives in.
    pub data_space: String,
    /// Data category (for example `PM_COUNTERS`).
    pub data_category: String,
    /// Schema name.
    pub schema_name: String,
}

impl SchemaReference {
    /// Parses a schema reference string.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::InvalidSchemaReference`] when the string does
    /// not have exactly three non-empty `|`-separated parts.
    pub fn parse(value: &str) -> Result<Self, DefinitionError> {
        let parts: Vec<&str> = value.split('|').map(str::trim).collect();
        match parts.as_slice() {
            [space, category, schema]
                if !space.is_empty() && !category.is_empty() && !schema.is_empty() =>
            {
                Ok(Self {
                    data_space: (*space).to_string(),
                    data_category: (*category).to_string(),
                    schema_name: (*schema).to_string(),
                })
            }
            _ => Err(DefinitionError::InvalidSchemaReference(value.to_string())),
        }
    }
}

impl fmt::Display for SchemaReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.data_space, self.data_category, self.schema_name)
    }
}

/// PM schema registered in the data catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PmSchemaDefinition {
    /// Schema name; qualifies PM counters in simple KPI expressions.
    pub name: String,
    /// Data space the schema lives in.
    pub data_space: String,
    /// Data category of the schema.
    pub data_category: String,
}

impl PmSchemaDefinition {
    /// Returns the reference string PM definitions use as their `source`.
    #[must_use]
    pub fn reference(&self) -> SchemaReference {
        SchemaReference {
            data_space: self.data_space.clone(),
            data_category: self.data_category.clone(),
            schema_name: self.name.clone(),
        }
    }
}

/// Performance-management counter definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PmDefinition {
    /// Unique PM definition name.
    pub name: String,
    /// Schema reference (`<data_space>|<data_category>|<schema_name>`).
    pub source: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PmDefinition {
    /// Parses the PM definition's schema reference.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::InvalidSchemaReference`] when `source` is malformed.
    pub fn schema_reference(&self) -> Result<SchemaReference, DefinitionError> {
        SchemaReference::parse(&self.source)
    }
}

// ============================================================================
// SECTION: KPI Definitions
// ============================================================================

/// Input metric kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InputMetricType {
    /// References a [`PmDefinition`].
    PmData,
    /// References another [`KpiDefinition`].
    Kpi,
}

/// Input metric of a KPI definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputMetric {
    /// Name of the referenced PM or KPI definition.
    pub id: String,
    /// Alias used for the metric inside the KPI expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Metric kind.
    #[serde(rename = "type")]
    pub metric_type: InputMetricType,
}

impl InputMetric {
    /// Returns the alias when present and non-empty.
    #[must_use]
    pub fn effective_alias(&self) -> Option<&str> {
        self.alias.as_deref().filter(|alias| !alias.is_empty())
    }
}

/// Structural KPI kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KpiKind {
    /// All inputs are PM counters.
    Simple,
    /// At least one input is another KPI.
    Complex,
}

impl KpiKind {
    /// Returns the lowercase label used in aliases and logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Complex => "complex",
        }
    }
}

/// Declarative KPI definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiDefinition {
    /// Unique KPI definition name.
    pub name: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Expression template referencing input metrics by alias.
    pub expression: String,
    /// Object type of the KPI result (for example `FLOAT`).
    pub object_type: String,
    /// Aggregation type (for example `SUM`, `AVG`).
    pub aggregation_type: String,
    /// Whether the KPI is exposed to end users.
    #[serde(default = "default_visible")]
    pub is_visible: bool,
    /// Input metrics referenced by the expression.
    pub input_metrics: Vec<InputMetric>,
}

/// Returns the default KPI visibility.
const fn default_visible() -> bool {
    true
}

impl KpiDefinition {
    /// Returns whether this KPI is simple or complex.
    #[must_use]
    pub fn kind(&self) -> KpiKind {
        if self.input_metrics.iter().any(|metric| metric.metric_type == InputMetricType::Kpi) {
            KpiKind::Complex
        } else {
            KpiKind::Simple
        }
    }

    /// Returns true when any input metric references one of `names` with the given type.
    #[must_use]
    pub fn references_any(&self, metric_type: InputMetricType, names: &BTreeSet<String>) -> bool {
        self.input_metrics
            .iter()
            .any(|metric| metric.metric_type == metric_type && names.contains(&metric.id))
    }
}

// ============================================================================
// SECTION: Profiles
// ============================================================================

/// Per-input-metric context override on a complex KPI reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputMetricOverride {
    /// Input metric identifier the override applies to.
    pub id: String,
    /// Replacement aggregation context; absent means the profile context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Vec<String>>,
}

/// Reference from a profile to a KPI definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiReference {
    /// Referenced KPI definition name.
    #[serde(rename = "ref")]
    pub reference: String,
    /// Aggregation period override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation_period: Option<AggregationPeriod>,
    /// Per-input-metric context overrides.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input_metric_overrides: Vec<InputMetricOverride>,
}

impl KpiReference {
    /// Returns the aggregation context for an input metric of the referenced KPI.
    #[must_use]
    pub fn context_for<'a>(
        &'a self,
        metric_id: &str,
        profile_context: &'a [String],
    ) -> &'a [String] {
        self.input_metric_overrides
            .iter()
            .find(|entry| entry.id == metric_id)
            .and_then(|entry| entry.context.as_deref())
            .unwrap_or(profile_context)
    }
}

/// Aggregation profile binding KPI references to a context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDefinition {
    /// Unique profile name.
    pub name: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Ordered aggregation field names.
    pub context: Vec<String>,
    /// KPI references instantiated under this profile.
    pub kpis: Vec<KpiReference>,
    /// Name of the augmentation applied to this profile's PM data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub augmentation: Option<String>,
}

impl ProfileDefinition {
    /// Returns true when the profile references any of the named KPI definitions.
    #[must_use]
    pub fn references_any_kpi(&self, names: &BTreeSet<String>) -> bool {
        self.kpis.iter().any(|kpi| names.contains(&kpi.reference))
    }
}

// ============================================================================
// SECTION: Augmentations
// ============================================================================

/// Output field produced by an augmentation rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AugmentationField {
    /// Output field name.
    pub output: String,
    /// Input fields consumed to compute the output.
    #[serde(default)]
    pub input: Vec<String>,
}

/// Rule describing the enrichment of one output schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AugmentationRule {
    /// Augmented output schema name.
    pub output_schema: String,
    /// Fields added to the output schema.
    #[serde(default)]
    pub fields: Vec<AugmentationField>,
}

/// Data augmentation definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AugmentationDefinition {
    /// Unique augmentation name.
    pub name: String,
    /// Augmentation service URL; may contain `${PLACEHOLDER}` segments.
    pub url: String,
    /// Augmentation type label.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub augmentation_type: Option<String>,
    /// Enrichment rules.
    #[serde(default)]
    pub augmentation_rules: Vec<AugmentationRule>,
}

impl AugmentationDefinition {
    /// Returns a copy of the augmentation with its URL replaced.
    #[must_use]
    pub fn with_url(&self, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..self.clone()
        }
    }
}

// ============================================================================
// SECTION: Resource Submission
// ============================================================================

/// Declarative resources submitted in one provisioning request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSubmission {
    /// PM schemas.
    #[serde(default)]
    pub pm_schemas: Vec<PmSchemaDefinition>,
    /// PM definitions.
    #[serde(default)]
    pub pm_defs: Vec<PmDefinition>,
    /// KPI definitions.
    #[serde(default)]
    pub kpi_defs: Vec<KpiDefinition>,
    /// Augmentation definitions.
    #[serde(default)]
    pub augmentations: Vec<AugmentationDefinition>,
    /// Profile definitions.
    #[serde(default)]
    pub profiles: Vec<ProfileDefinition>,
}

impl ResourceSubmission {
    /// Validates names, references, and contexts in the submission.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError`] on the first malformed resource.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        ensure_unique_names(
            "pm schema",
            self.pm_schemas.iter().map(|schema| schema.name.as_str()),
        )?;
        ensure_unique_names("pm definition", self.pm_defs.iter().map(|pm| pm.name.as_str()))?;
        ensure_unique_names("kpi definition", self.kpi_defs.iter().map(|kpi| kpi.name.as_str()))?;
        ensure_unique_names(
            "augmentation",
            self.augmentations.iter().map(|augmentation| augmentation.name.as_str()),
        )?;
        ensure_unique_names("profile", self.profiles.iter().map(|profile| profile.name.as_str()))?;

        for pm in &self.pm_defs {
            pm.schema_reference()?;
        }
        for kpi in &self.kpi_defs {
            if kpi.input_metrics.iter().any(|metric| metric.id.trim().is_empty()) {
                return Err(DefinitionError::EmptyInputMetricId {
                    kpi: kpi.name.clone(),
                });
            }
        }
        for profile in &self.profiles {
            let overrides = profile
                .kpis
                .iter()
                .flat_map(|kpi| kpi.input_metric_overrides.iter())
                .filter_map(|entry| entry.context.as_ref());
            let empty_field = profile.context.is_empty()
                || profile.context.iter().any(|field| field.trim().is_empty())
                || overrides.flatten().any(|field| field.trim().is_empty());
            if empty_field {
                return Err(DefinitionError::EmptyContextField {
                    profile: profile.name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Ensures names of one resource kind are non-empty and unique.
fn ensure_unique_names<'a>(
    kind: &'static str,
    names: impl Iterator<Item = &'a str>,
) -> Result<(), DefinitionError> {
    let mut seen = BTreeSet::new();
    for name in names {
        if name.trim().is_empty() {
            return Err(DefinitionError::EmptyName {
                kind,
            });
        }
        if !seen.insert(name) {
            return Err(DefinitionError::DuplicateName {
                kind,
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
