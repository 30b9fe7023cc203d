// pm-provisioning-core/src/runtime/output.rs
// ============================================================================
// Module: Output Table Payload
// Description: Groups resolved KPIs into per-fact-table payload entries.
// Purpose: Produce the document a downstream stats calculator consumes.
// Dependencies: crate::core, serde
// ============================================================================

//! ## Overview
//! Each entry of `kpi_output_tables` describes one fact table: its alias,
//! aggregation period, and the KPI definitions that write columns into it.
//! Entries are ordered by fact table name and definitions by runtime name, so
//! serializing the same batch twice yields identical bytes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::AggregationPeriod;
use crate::core::KpiAlias;
use crate::core::KpiDefinitionDto;
use crate::core::ResolvedKpiInstance;

// ============================================================================
// SECTION: Payload Types
// ============================================================================

/// One fact table and the KPI definitions computed into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiOutputTable {
    /// Fact table alias.
    pub alias: KpiAlias,
    /// Aggregation period, when one applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation_period: Option<AggregationPeriod>,
    /// KPI definitions writing into the table.
    pub kpi_definitions: Vec<KpiDefinitionDto>,
}

/// Payload handed to the stats calculator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiOutputPayload {
    /// Output tables ordered by fact table name.
    pub kpi_output_tables: Vec<KpiOutputTable>,
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Output table under construction with its definitions keyed by runtime name.
type PendingTable = (KpiOutputTable, BTreeMap<String, KpiDefinitionDto>);

/// Groups resolved instances by fact table.
///
/// An instance shared by several profiles appears once.
#[must_use]
pub fn build_output_tables(instances: &[ResolvedKpiInstance]) -> KpiOutputPayload {
    let mut tables: BTreeMap<String, PendingTable> = BTreeMap::new();
    for instance in instances {
        let kpi = &instance.kpi;
        let (_, definitions) = tables.entry(kpi.fact_table()).or_insert_with(|| {
            let table = KpiOutputTable {
                alias: kpi.alias.clone(),
                aggregation_period: kpi.definition.aggregation_period,
                kpi_definitions: Vec::new(),
            };
            (table, BTreeMap::new())
        });
        definitions.entry(kpi.definition.name.clone()).or_insert_with(|| kpi.definition.clone());
    }
    let kpi_output_tables = tables
        .into_values()
        .map(|(mut table, definitions)| {
            table.kpi_definitions = definitions.into_values().collect();
            table
        })
        .collect();
    KpiOutputPayload {
        kpi_output_tables,
    }
}
