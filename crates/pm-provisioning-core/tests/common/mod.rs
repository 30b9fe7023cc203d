// pm-provisioning-core/tests/common/mod.rs
// =============================================================================
// Module: Core Test Fixtures
// Description: Shared resource builders and collaborators for engine tests.
// Purpose: Keep scenario submissions identical across integration suites.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use std::collections::BTreeMap;

use pm_provisioning_core::AggregationPeriod;
use pm_provisioning_core::AugmentationDefinition;
use pm_provisioning_core::AugmentationError;
use pm_provisioning_core::AugmentationUrlResolver;
use pm_provisioning_core::InputMetric;
use pm_provisioning_core::InputMetricOverride;
use pm_provisioning_core::InputMetricType;
use pm_provisioning_core::KpiDefinition;
use pm_provisioning_core::KpiReference;
use pm_provisioning_core::PmDefinition;
use pm_provisioning_core::PmSchemaDefinition;
use pm_provisioning_core::ProfileDefinition;
use pm_provisioning_core::ResourceSubmission;

/// Fact table of `simple_a` under `[agg1]` at 60 minutes.
pub const TABLE_A: &str = "kpi_simple_schemanamea_agg1_60";
/// Fact table of `simple_b` under `[agg1, agg2]` at 60 minutes.
pub const TABLE_B: &str = "kpi_simple_schemanameb_agg1_agg2_60";
/// Fact table of `complex_ab` under `[agg1]` at 60 minutes; its owner holds `_`.
pub const TABLE_COMPLEX: &str = "kpi_complex__d5a6b1784306c29_60";

/// Converts string slices into owned strings.
pub fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_string()).collect()
}

/// Builds a PM schema in the `5G` data space.
pub fn schema(name: &str) -> PmSchemaDefinition {
    PmSchemaDefinition {
        name: name.to_string(),
        data_space: "5G".to_string(),
        data_category: "PM_COUNTERS".to_string(),
    }
}

/// Builds a PM definition sourced from `schema_name`.
pub fn pm(name: &str, schema_name: &str) -> PmDefinition {
    PmDefinition {
        name: name.to_string(),
        source: format!("5G|PM_COUNTERS|{schema_name}"),
        description: None,
    }
}

/// Builds an input metric.
pub fn input(id: &str, alias: &str, metric_type: InputMetricType) -> InputMetric {
    InputMetric {
        id: id.to_string(),
        alias: Some(alias.to_string()),
        metric_type,
    }
}

/// Builds a KPI definition.
pub fn kpi(
    name: &str,
    expression: &str,
    aggregation_type: &str,
    inputs: Vec<InputMetric>,
) -> KpiDefinition {
    KpiDefinition {
        name: name.to_string(),
        description: None,
        expression: expression.to_string(),
        object_type: "FLOAT".to_string(),
        aggregation_type: aggregation_type.to_string(),
        is_visible: true,
        input_metrics: inputs,
    }
}

/// Builds a KPI reference with an explicit period.
pub fn reference(name: &str, minutes: u32) -> KpiReference {
    KpiReference {
        reference: name.to_string(),
        aggregation_period: AggregationPeriod::new(minutes).ok(),
        input_metric_overrides: Vec::new(),
    }
}

/// Builds an input metric override.
pub fn override_context(id: &str, context: &[&str]) -> InputMetricOverride {
    InputMetricOverride {
        id: id.to_string(),
        context: Some(strings(context)),
    }
}

/// Builds a profile.
pub fn profile(name: &str, context: &[&str], kpis: Vec<KpiReference>) -> ProfileDefinition {
    ProfileDefinition {
        name: name.to_string(),
        description: None,
        context: strings(context),
        kpis,
        augmentation: None,
    }
}

/// Returns `simple_a`: `SUM(pmCounters.PMa)` over `PM_ID_A` in `schemaNameA`.
pub fn simple_a() -> KpiDefinition {
    kpi(
        "simple_a",
        "SUM(pmCounters.PMa)",
        "SUM",
        vec![input("PM_ID_A", "pmCounters.PMa", InputMetricType::PmData)],
    )
}

/// Returns `simple_b`: `AVG(pmCounters.PMb)` over `PM_ID_B` in `schemaNameB`.
pub fn simple_b() -> KpiDefinition {
    kpi(
        "simple_b",
        "AVG(pmCounters.PMb)",
        "AVG",
        vec![input("PM_ID_B", "pmCounters.PMb", InputMetricType::PmData)],
    )
}

/// Returns `complex_ab`: `${kpiA} / ${kpiB}` over `simple_a` and `simple_b`.
pub fn complex_ab() -> KpiDefinition {
    kpi(
        "complex_ab",
        "${kpiA} / ${kpiB}",
        "SUM",
        vec![
            input("simple_a", "kpiA", InputMetricType::Kpi),
            input("simple_b", "kpiB", InputMetricType::Kpi),
        ],
    )
}

/// Returns `profile_b`: `simple_b` over `[agg1, agg2]` at 60 minutes.
pub fn profile_b() -> ProfileDefinition {
    profile("profile_b", &["agg1", "agg2"], vec![reference("simple_b", 60)])
}

/// Returns `profile_complex`: `complex_ab` over `[agg1]`, with `simple_b`
/// aggregated over `[agg1, agg2]`.
pub fn profile_complex() -> ProfileDefinition {
    let mut complex = reference("complex_ab", 60);
    complex.input_metric_overrides = vec![override_context("simple_b", &["agg1", "agg2"])];
    profile("profile_complex", &["agg1"], vec![complex])
}

/// Returns the full scenario submission.
pub fn scenario_submission() -> ResourceSubmission {
    ResourceSubmission {
        pm_schemas: vec![schema("schemaNameA"), schema("schemaNameB")],
        pm_defs: vec![pm("PM_ID_A", "schemaNameA"), pm("PM_ID_B", "schemaNameB")],
        kpi_defs: vec![simple_a(), simple_b(), complex_ab()],
        augmentations: Vec::new(),
        profiles: vec![profile_b(), profile_complex()],
    }
}

/// Builds an augmentation whose URL uses a placeholder.
pub fn augmentation(name: &str, url: &str) -> AugmentationDefinition {
    AugmentationDefinition {
        name: name.to_string(),
        url: url.to_string(),
        augmentation_type: Some("core".to_string()),
        augmentation_rules: Vec::new(),
    }
}

/// Augmentation URL resolver backed by a placeholder map.
#[derive(Debug, Clone, Default)]
pub struct MapUrls {
    /// Placeholder values.
    pub values: BTreeMap<String, String>,
}

impl MapUrls {
    /// Creates a resolver with one placeholder.
    pub fn with(name: &str, value: &str) -> Self {
        let mut values = BTreeMap::new();
        values.insert(name.to_string(), value.to_string());
        Self {
            values,
        }
    }
}

impl AugmentationUrlResolver for MapUrls {
    fn resolve_url(&self, raw_url: &str) -> Result<String, AugmentationError> {
        let mut resolved = raw_url.to_string();
        for (name, value) in &self.values {
            resolved = resolved.replace(&format!("${{{name}}}"), value);
        }
        if let Some(start) = resolved.find("${") {
            let placeholder = resolved[start..].trim_start_matches("${");
            let placeholder = placeholder.split('}').next().unwrap_or_default().to_string();
            return Err(AugmentationError::UnresolvedPlaceholder {
                placeholder,
                url: raw_url.to_string(),
            });
        }
        Ok(resolved)
    }
}
