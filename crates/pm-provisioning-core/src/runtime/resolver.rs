// pm-provisioning-core/src/runtime/resolver.rs
// ============================================================================
// Module: KPI Resolution Engine
// Description: Resolves profile KPI references into runtime KPI definitions.
// Purpose: Produce idempotently named, fully qualified runtime KPIs per profile.
// Dependencies: crate::{core, interfaces, runtime}, thiserror, tracing
// ============================================================================

//! ## Overview
//! For every `(profile, kpi reference)` pair the resolver derives a
//! [`RuntimeKpiKey`], skips keys already resolved in this run, and otherwise
//! synthesizes a [`KpiDefinitionDto`]:
//!
//! - Simple KPIs read directly from one PM schema; their expression is
//!   qualified with the schema name.
//! - Complex KPIs first resolve each KPI-typed input as a simple KPI under
//!   the input's own context (override or profile context), then read from
//!   the anchor fact table and join the others.
//!
//! Before a fresh name is minted the deployed store is asked for an instance
//! with the same key, so re-running an unchanged profile set reuses names.
//! The resolver performs no writes; it returns a batch for the caller to
//! persist.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;
use tracing::info;

use crate::core::AggregationPeriod;
use crate::core::DEFAULT_HASH_ALGORITHM;
use crate::core::HashAlgorithm;
use crate::core::HashError;
use crate::core::InputMetric;
use crate::core::InputMetricType;
use crate::core::KpiDefinition;
use crate::core::KpiDefinitionDto;
use crate::core::KpiKind;
use crate::core::KpiReference;
use crate::core::KpiSource;
use crate::core::PmSchemaDefinition;
use crate::core::ProfileDefinition;
use crate::core::ResolvedKpiInstance;
use crate::core::ResolvedRuntimeKpi;
use crate::core::RuntimeKpiKey;
use crate::interfaces::DeployedStore;
use crate::interfaces::DictionaryStore;
use crate::interfaces::NameGenerator;
use crate::interfaces::ReferenceFingerprinter;
use crate::interfaces::StoreError;
use crate::runtime::alias::AliasError;
use crate::runtime::alias::AliasPolicy;
use crate::runtime::alias::DEFAULT_MAX_ALIAS_LENGTH;
use crate::runtime::cache::ResolvedKpiCache;
use crate::runtime::expression::ExpressionError;
use crate::runtime::expression::build_complex_expression;
use crate::runtime::expression::get_input_metric_table_map;
use crate::runtime::expression::select_anchor_table;
use crate::runtime::expression::substitute_expression_parameters;
use crate::runtime::expression::unqualify;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default execution group stamped on complex KPIs.
pub const DEFAULT_COMPLEX_EXECUTION_GROUP: &str = "complex_kpis";

/// Resolver settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Maximum fact table alias length.
    pub max_alias_length: usize,
    /// Period applied when a KPI reference has no override.
    pub default_aggregation_period: Option<AggregationPeriod>,
    /// Execution group of complex KPIs.
    pub complex_execution_group: String,
    /// Digest algorithm used to compress long aliases.
    pub hash_algorithm: HashAlgorithm,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_alias_length: DEFAULT_MAX_ALIAS_LENGTH,
            default_aggregation_period: Some(AggregationPeriod::QUARTER_HOUR),
            complex_execution_group: DEFAULT_COMPLEX_EXECUTION_GROUP.to_string(),
            hash_algorithm: DEFAULT_HASH_ALGORITHM,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while resolving runtime KPIs.
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// A profile references a KPI definition the dictionary does not know.
    #[error("profile {profile} references unknown kpi definition {kpi}")]
    UnknownKpiDefinition {
        /// Referenced KPI definition name.
        kpi: String,
        /// Referencing profile.
        profile: String,
    },
    /// A simple KPI input has no resolvable PM schema.
    #[error("kpi {kpi} input {pm} has no resolvable pm schema")]
    MissingSchema {
        /// KPI definition name.
        kpi: String,
        /// PM definition name.
        pm: String,
    },
    /// A simple KPI declares no input metrics.
    #[error("simple kpi {kpi} declares no input metrics")]
    NoInputMetrics {
        /// KPI definition name.
        kpi: String,
    },
    /// A simple KPI reads from more than one PM schema.
    #[error("simple kpi {kpi} reads from several pm schemas: {schemas}")]
    MixedSchemaSources {
        /// KPI definition name.
        kpi: String,
        /// Comma-separated schema names.
        schemas: String,
    },
    /// A complex KPI input is not a simple KPI.
    #[error("complex kpi {kpi} input {metric} is invalid: {reason}")]
    InvalidComplexInput {
        /// Complex KPI definition name.
        kpi: String,
        /// Input metric identifier.
        metric: String,
        /// Why the input was rejected.
        reason: &'static str,
    },
    /// A complex KPI input resolves neither locally nor from the deployed store.
    #[error("complex kpi {kpi} in profile {profile} depends on unresolvable input {metric}")]
    MissingDependency {
        /// Complex KPI definition name.
        kpi: String,
        /// Missing input metric identifier.
        metric: String,
        /// Profile being resolved.
        profile: String,
    },
    /// Expression or join synthesis failed.
    #[error(transparent)]
    Expression(#[from] ExpressionError),
    /// Alias derivation failed.
    #[error(transparent)]
    Alias(#[from] AliasError),
    /// Reference fingerprinting failed.
    #[error(transparent)]
    Hash(#[from] HashError),
    /// Collaborator store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// SECTION: Resolver
// ============================================================================

/// Mutable state of one `calculate_affected_kpis` call.
struct ResolutionRun<'c> {
    /// Run-scoped memo table.
    cache: &'c mut ResolvedKpiCache,
    /// Freshly resolved instances, in resolution order.
    resolved: Vec<ResolvedKpiInstance>,
}

impl ResolutionRun<'_> {
    /// Caches a resolved KPI and records it as an output instance.
    fn record(
        &mut self,
        key: RuntimeKpiKey,
        kpi: ResolvedRuntimeKpi,
        kpi_definition_name: &str,
        profile_name: &str,
    ) {
        debug!(
            key = %key,
            name = %kpi.name(),
            fact_table = %kpi.fact_table(),
            profile = %profile_name,
            "resolved runtime kpi"
        );
        self.cache.put(key.clone(), kpi.clone());
        self.resolved.push(ResolvedKpiInstance {
            key,
            kpi,
            kpi_definition_name: kpi_definition_name.to_string(),
            profile_name: profile_name.to_string(),
        });
    }
}

/// Complex KPI reference being resolved within a profile.
struct ComplexScope<'s> {
    /// Complex KPI definition.
    kpi: &'s KpiDefinition,
    /// Owning KPI reference.
    reference: &'s KpiReference,
    /// Owning profile.
    profile: &'s ProfileDefinition,
    /// Aggregation period shared by the complex KPI and its inputs.
    period: Option<AggregationPeriod>,
}

/// Resolves affected profiles into runtime KPI instances.
pub struct KpiResolver<'a, D: ?Sized, P: ?Sized, N: ?Sized, F: ?Sized> {
    /// Dictionary store.
    dictionary: &'a D,
    /// Deployed store used for name reuse and missing inputs.
    deployed: &'a P,
    /// Runtime name source.
    names: &'a N,
    /// Complex reference fingerprinter.
    fingerprinter: &'a F,
    /// Alias derivation policy.
    aliases: AliasPolicy,
    /// Period applied when a reference has no override.
    default_period: Option<AggregationPeriod>,
    /// Execution group of complex KPIs.
    execution_group: String,
}

impl<'a, D, P, N, F> KpiResolver<'a, D, P, N, F>
where
    D: DictionaryStore + ?Sized,
    P: DeployedStore + ?Sized,
    N: NameGenerator + ?Sized,
    F: ReferenceFingerprinter + ?Sized,
{
    /// Creates a resolver over the given collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError::Alias`] when the alias policy is invalid.
    pub fn new(
        dictionary: &'a D,
        deployed: &'a P,
        names: &'a N,
        fingerprinter: &'a F,
        config: &ResolverConfig,
    ) -> Result<Self, ResolutionError> {
        let aliases = AliasPolicy::new(config.max_alias_length, config.hash_algorithm)?;
        Ok(Self {
            dictionary,
            deployed,
            names,
            fingerprinter,
            aliases,
            default_period: config.default_aggregation_period,
            execution_group: config.complex_execution_group.clone(),
        })
    }

    /// Resolves every KPI reference of every profile.
    ///
    /// Keys already present in `cache` are skipped. Returned instances are in
    /// resolution order: a complex KPI always follows the inputs it created.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError`] on the first reference that cannot be
    /// resolved; nothing resolved so far should be persisted.
    pub fn calculate_affected_kpis(
        &self,
        profiles: &[ProfileDefinition],
        cache: &mut ResolvedKpiCache,
    ) -> Result<Vec<ResolvedKpiInstance>, ResolutionError> {
        let mut run = ResolutionRun {
            cache,
            resolved: Vec::new(),
        };
        for profile in profiles {
            for reference in &profile.kpis {
                self.resolve_reference(&mut run, profile, reference)?;
            }
        }
        info!(
            profiles = profiles.len(),
            instances = run.resolved.len(),
            cached = run.cache.len(),
            "resolved affected kpis"
        );
        Ok(run.resolved)
    }

    /// Resolves one KPI reference of a profile.
    fn resolve_reference(
        &self,
        run: &mut ResolutionRun<'_>,
        profile: &ProfileDefinition,
        reference: &KpiReference,
    ) -> Result<(), ResolutionError> {
        let kpi = self.dictionary.find_kpi_definition(&reference.reference)?.ok_or_else(|| {
            ResolutionError::UnknownKpiDefinition {
                kpi: reference.reference.clone(),
                profile: profile.name.clone(),
            }
        })?;
        let period = reference.aggregation_period.or(self.default_period);
        let fields = unqualified_fields(&profile.context);

        let key = match kpi.kind() {
            KpiKind::Simple => RuntimeKpiKey::simple(&kpi.name, &fields, period),
            KpiKind::Complex => RuntimeKpiKey::complex(
                &kpi.name,
                &fields,
                period,
                self.fingerprinter.fingerprint(reference)?,
            ),
        };
        if run.cache.contains(&key) {
            debug!(key = %key, profile = %profile.name, "runtime kpi already resolved in this run");
            return Ok(());
        }

        let resolved = match kpi.kind() {
            KpiKind::Simple => self.synthesize_simple(&kpi, &fields, period, &key)?,
            KpiKind::Complex => {
                let scope = ComplexScope {
                    kpi: &kpi,
                    reference,
                    profile,
                    period,
                };
                let mut inputs = BTreeMap::new();
                for metric in &kpi.input_metrics {
                    let input = self.resolve_complex_input(run, &scope, metric)?;
                    inputs.insert(metric.id.clone(), input);
                }
                self.synthesize_complex(&kpi, &fields, period, &inputs, &key)?
            }
        };
        run.record(key, resolved, &kpi.name, &profile.name);
        Ok(())
    }

    /// Resolves one input of a complex KPI as a simple KPI.
    fn resolve_complex_input(
        &self,
        run: &mut ResolutionRun<'_>,
        scope: &ComplexScope<'_>,
        metric: &InputMetric,
    ) -> Result<ResolvedRuntimeKpi, ResolutionError> {
        if metric.metric_type != InputMetricType::Kpi {
            return Err(ResolutionError::InvalidComplexInput {
                kpi: scope.kpi.name.clone(),
                metric: metric.id.clone(),
                reason: "complex kpis may only reference other kpis",
            });
        }
        let context = scope.reference.context_for(&metric.id, &scope.profile.context);
        let fields = unqualified_fields(context);
        let key = RuntimeKpiKey::simple(&metric.id, &fields, scope.period);
        if let Some(cached) = run.cache.get(&key) {
            debug!(key = %key, parent = %scope.kpi.name, "complex kpi input served from run cache");
            return Ok(cached.clone());
        }

        match self.dictionary.find_kpi_definition(&metric.id)? {
            Some(input) if input.kind() == KpiKind::Complex => {
                Err(ResolutionError::InvalidComplexInput {
                    kpi: scope.kpi.name.clone(),
                    metric: metric.id.clone(),
                    reason: "complex kpis cannot be nested",
                })
            }
            Some(input) => {
                let resolved = self.synthesize_simple(&input, &fields, scope.period, &key)?;
                run.record(key, resolved.clone(), &input.name, &scope.profile.name);
                Ok(resolved)
            }
            None => {
                let deployed = self.deployed.get_deployed_kpi_by_aggregation(&key)?.ok_or_else(
                    || ResolutionError::MissingDependency {
                        kpi: scope.kpi.name.clone(),
                        metric: metric.id.clone(),
                        profile: scope.profile.name.clone(),
                    },
                )?;
                debug!(
                    key = %key,
                    name = %deployed.name(),
                    "complex kpi input served from deployed store"
                );
                run.cache.put(key, deployed.clone());
                Ok(deployed)
            }
        }
    }

    /// Builds the runtime form of a simple KPI.
    fn synthesize_simple(
        &self,
        kpi: &KpiDefinition,
        fields: &[String],
        period: Option<AggregationPeriod>,
        key: &RuntimeKpiKey,
    ) -> Result<ResolvedRuntimeKpi, ResolutionError> {
        let schema = self.source_schema(kpi)?;
        let alias = self.aliases.derive(KpiKind::Simple, &schema.name, fields)?;
        let definition = KpiDefinitionDto {
            name: self.runtime_name(key)?,
            expression: substitute_expression_parameters(
                &kpi.expression,
                &schema.name,
                &kpi.input_metrics,
            ),
            object_type: kpi.object_type.clone(),
            aggregation_type: kpi.aggregation_type.clone(),
            aggregation_period: period,
            aggregation_elements: qualify_fields(&schema.name, fields),
            is_visible: kpi.is_visible,
            source: KpiSource::Simple {
                inp_data_category: schema.data_category.clone(),
                inp_data_identifier: schema.reference().to_string(),
            },
        };
        Ok(ResolvedRuntimeKpi {
            definition,
            alias,
        })
    }

    /// Builds the runtime form of a complex KPI from its resolved inputs.
    fn synthesize_complex(
        &self,
        kpi: &KpiDefinition,
        fields: &[String],
        period: Option<AggregationPeriod>,
        inputs: &BTreeMap<String, ResolvedRuntimeKpi>,
        key: &RuntimeKpiKey,
    ) -> Result<ResolvedRuntimeKpi, ResolutionError> {
        let contexts = get_input_metric_table_map(inputs);
        let anchor = select_anchor_table(&kpi.name, fields, &contexts)?;
        let expression = build_complex_expression(kpi, &anchor, inputs, &contexts)?;
        let alias = self.aliases.derive(KpiKind::Complex, &kpi.name, fields)?;
        let definition = KpiDefinitionDto {
            name: self.runtime_name(key)?,
            expression,
            object_type: kpi.object_type.clone(),
            aggregation_type: kpi.aggregation_type.clone(),
            aggregation_period: period,
            aggregation_elements: qualify_fields(&anchor, fields),
            is_visible: kpi.is_visible,
            source: KpiSource::Complex {
                execution_group: self.execution_group.clone(),
            },
        };
        Ok(ResolvedRuntimeKpi {
            definition,
            alias,
        })
    }

    /// Returns the single PM schema every input of a simple KPI reads from.
    fn source_schema(&self, kpi: &KpiDefinition) -> Result<PmSchemaDefinition, ResolutionError> {
        let mut schemas = BTreeMap::new();
        for metric in &kpi.input_metrics {
            let schema = self.dictionary.find_schema_by_pm_def_name(&metric.id)?.ok_or_else(|| {
                ResolutionError::MissingSchema {
                    kpi: kpi.name.clone(),
                    pm: metric.id.clone(),
                }
            })?;
            schemas.entry(schema.name.clone()).or_insert(schema);
        }
        if schemas.len() > 1 {
            return Err(ResolutionError::MixedSchemaSources {
                kpi: kpi.name.clone(),
                schemas: schemas.keys().cloned().collect::<Vec<_>>().join(","),
            });
        }
        schemas.into_values().next().ok_or_else(|| ResolutionError::NoInputMetrics {
            kpi: kpi.name.clone(),
        })
    }

    /// Reuses the deployed name for `key` or mints a fresh one.
    fn runtime_name(&self, key: &RuntimeKpiKey) -> Result<String, StoreError> {
        if let Some(existing) = self.deployed.get_deployed_kpi_by_aggregation(key)? {
            debug!(key = %key, name = %existing.name(), "reusing deployed runtime name");
            return Ok(existing.definition.name);
        }
        Ok(self.names.generate())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Strips table qualifiers from context fields, preserving order.
fn unqualified_fields(context: &[String]) -> Vec<String> {
    context.iter().map(String::as_str).map(unqualify).collect()
}

/// Qualifies each field with `qualifier`.
fn qualify_fields(qualifier: &str, fields: &[String]) -> Vec<String> {
    fields.iter().map(|field| format!("{qualifier}.{field}")).collect()
}
