// pm-provisioning-core/src/core/runtime_kpi.rs
// ============================================================================
// Module: Runtime KPI Model
// Description: Runtime KPI keys, aliases, and resolved KPI definitions.
// Purpose: Describe concrete KPI instances handed to the stats calculator.
// Dependencies: crate::core::{definitions, hashing}, serde
// ============================================================================

//! ## Overview
//! A runtime KPI is one declarative KPI instantiated under one aggregation
//! context. Its structural identity is a [`RuntimeKpiKey`]; its wire form is a
//! [`KpiDefinitionDto`], serialized with snake_case keys and with absent
//! optional fields omitted.
//!
//! The simple/complex distinction is an explicit [`KpiSource`] tag set when
//! the DTO is built, never inferred from which optional fields are present.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::definitions::AggregationPeriod;
use crate::core::definitions::KpiKind;
use crate::core::hashing::HashDigest;

// ============================================================================
// SECTION: Runtime KPI Key
// ============================================================================

/// Structural identity of a runtime KPI instance.
///
/// # Invariants
/// - Equality is value-based; `aggregation_fields` order is significant.
/// - `reference_fingerprint` is present only for complex KPIs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RuntimeKpiKey {
    /// Declarative KPI definition name.
    pub kpi_definition_name: String,
    /// Unqualified aggregation field names.
    pub aggregation_fields: Vec<String>,
    /// Aggregation period, when one applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation_period: Option<AggregationPeriod>,
    /// Digest of the owning KPI reference (complex KPIs only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_fingerprint: Option<HashDigest>,
}

impl RuntimeKpiKey {
    /// Builds the key of a simple KPI instance.
    #[must_use]
    pub fn simple(
        kpi_definition_name: impl Into<String>,
        aggregation_fields: &[String],
        aggregation_period: Option<AggregationPeriod>,
    ) -> Self {
        Self {
            kpi_definition_name: kpi_definition_name.into(),
            aggregation_fields: aggregation_fields.to_vec(),
            aggregation_period,
            reference_fingerprint: None,
        }
    }

    /// Builds the key of a complex KPI instance.
    #[must_use]
    pub fn complex(
        kpi_definition_name: impl Into<String>,
        aggregation_fields: &[String],
        aggregation_period: Option<AggregationPeriod>,
        reference_fingerprint: HashDigest,
    ) -> Self {
        Self {
            kpi_definition_name: kpi_definition_name.into(),
            aggregation_fields: aggregation_fields.to_vec(),
            aggregation_period,
            reference_fingerprint: Some(reference_fingerprint),
        }
    }
}

impl fmt::Display for RuntimeKpiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.kpi_definition_name, self.aggregation_fields.join(","))?;
        if let Some(period) = self.aggregation_period {
            write!(f, "@{period}")?;
        }
        if let Some(fingerprint) = &self.reference_fingerprint {
            write!(f, "#{}", fingerprint.prefix(12))?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Alias and Fact Table
// ============================================================================

/// Fact table alias shared by KPIs of the same kind, owner, and fields.
///
/// # Invariants
/// - Matches `^[a-z][a-z0-9_]{0,N}$` for the configured maximum length; only
///   [`crate::runtime::AliasPolicy`] constructs new aliases.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KpiAlias(String);

impl KpiAlias {
    /// Wraps an alias that has already passed the alias pattern.
    pub(crate) const fn from_validated(value: String) -> Self {
        Self(value)
    }

    /// Returns the alias as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the fact table name `kpi_<alias>[_<period>]`.
    #[must_use]
    pub fn fact_table(&self, period: Option<AggregationPeriod>) -> String {
        period.map_or_else(
            || format!("kpi_{}", self.0),
            |period| format!("kpi_{}_{}", self.0, period.minutes()),
        )
    }
}

impl fmt::Display for KpiAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: KPI Definition DTO
// ============================================================================

/// Kind-specific source fields of a runtime KPI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KpiSource {
    /// Simple KPI computed directly from a PM schema.
    Simple {
        /// Input data category of the source schema.
        inp_data_category: String,
        /// Input data identifier (`<data_space>|<data_category>|<schema_name>`).
        inp_data_identifier: String,
    },
    /// Complex KPI computed from other runtime KPIs.
    Complex {
        /// Execution group the complex KPI is scheduled in.
        execution_group: String,
    },
}

/// Wire representation of a runtime KPI consumed by the stats calculator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiDefinitionDto {
    /// Generated, opaque runtime name.
    pub name: String,
    /// Fully qualified aggregation expression.
    pub expression: String,
    /// Result object type.
    pub object_type: String,
    /// Aggregation type.
    pub aggregation_type: String,
    /// Aggregation period, when one applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation_period: Option<AggregationPeriod>,
    /// Table-qualified aggregation fields.
    pub aggregation_elements: Vec<String>,
    /// Whether the KPI is exposed to end users.
    pub is_visible: bool,
    /// Kind-specific source fields.
    #[serde(flatten)]
    pub source: KpiSource,
}

impl KpiDefinitionDto {
    /// Returns the KPI kind recorded at construction.
    #[must_use]
    pub const fn kind(&self) -> KpiKind {
        match self.source {
            KpiSource::Simple {
                ..
            } => KpiKind::Simple,
            KpiSource::Complex {
                ..
            } => KpiKind::Complex,
        }
    }
}

// ============================================================================
// SECTION: Resolved Runtime KPI
// ============================================================================

/// Runtime KPI together with the alias that names its fact table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRuntimeKpi {
    /// Wire DTO.
    pub definition: KpiDefinitionDto,
    /// Fact table alias.
    pub alias: KpiAlias,
}

impl ResolvedRuntimeKpi {
    /// Returns the generated runtime name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Returns the fact table holding this KPI's output column.
    #[must_use]
    pub fn fact_table(&self) -> String {
        self.alias.fact_table(self.definition.aggregation_period)
    }

    /// Returns `<fact_table>.<name>`, the column reference used by complex KPIs.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.fact_table(), self.definition.name)
    }
}

/// Resolved KPI tied to the declarative KPI and profile it was produced for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedKpiInstance {
    /// Structural identity of the instance.
    pub key: RuntimeKpiKey,
    /// Resolved runtime KPI.
    pub kpi: ResolvedRuntimeKpi,
    /// Owning declarative KPI definition name.
    pub kpi_definition_name: String,
    /// Owning profile name.
    pub profile_name: String,
}
