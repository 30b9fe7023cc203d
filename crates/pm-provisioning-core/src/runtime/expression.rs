// pm-provisioning-core/src/runtime/expression.rs
// ============================================================================
// Module: Expression and Join Builder
// Description: Identifier substitution and INNER JOIN synthesis for KPI SQL.
// Purpose: Turn declarative KPI expressions into fully qualified SQL strings.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! Pure functions with no shared state. Simple KPI expressions have their
//! metric aliases replaced by metric ids qualified with the source schema.
//! Complex KPI expressions reference the output columns of simple KPI fact
//! tables, read `FROM` an anchor table, and join every other fact table on the
//! context fields it shares with the anchor.
//!
//! Fact table contexts are kept in a [`BTreeMap`], so generated SQL is
//! byte-for-byte reproducible.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use thiserror::Error;

use crate::core::InputMetric;
use crate::core::KpiDefinition;
use crate::core::ResolvedRuntimeKpi;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Ordered, unqualified context fields per fact table.
pub type FactTableContexts = BTreeMap<String, Vec<String>>;

/// URI scheme prefixing every fact table in generated SQL.
const KPI_DB_SCHEME: &str = "kpi_db://";

/// Errors raised while synthesizing complex KPI SQL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpressionError {
    /// No input fact table covers the complex KPI's aggregation context.
    #[error("complex kpi {kpi} has no input fact table containing its context [{context}]")]
    NoAnchorTable {
        /// Complex KPI definition name.
        kpi: String,
        /// Comma-separated aggregation context.
        context: String,
    },
    /// A fact table shares no context field with the anchor.
    #[error(
        "complex kpi {kpi} has no valid join target for {table}: anchor context [{context}] \
         shares no field with it"
    )]
    NoJoinTarget {
        /// Complex KPI definition name.
        kpi: String,
        /// Fact table that could not be joined.
        table: String,
        /// Comma-separated anchor context.
        context: String,
    },
    /// Several fact tables participate but no join could be produced.
    #[error("complex kpi {kpi} cannot be instantiated: input contexts cannot be associated")]
    Uninstantiable {
        /// Complex KPI definition name.
        kpi: String,
    },
}

// ============================================================================
// SECTION: Substitution
// ============================================================================

/// Replaces metric aliases with metric ids, then qualifies ids with `qualifier`.
///
/// Returns the expression unchanged when `input_metrics` is empty.
#[must_use]
pub fn substitute_expression_parameters(
    expression: &str,
    qualifier: &str,
    input_metrics: &[InputMetric],
) -> String {
    if input_metrics.is_empty() {
        return expression.to_string();
    }
    let unaliased = replace_aliases(expression, input_metrics);
    let qualified: BTreeMap<String, String> = input_metrics
        .iter()
        .map(|metric| (metric.id.clone(), format!("{qualifier}.{}", metric.id)))
        .collect();
    replace_identifiers(&unaliased, &qualified)
}

/// Builds the full SQL expression of a complex KPI.
///
/// `resolved_inputs` maps each input metric id to its resolved simple KPI.
///
/// # Errors
///
/// Returns [`ExpressionError`] when the fact tables cannot be joined.
pub fn build_complex_expression(
    kpi: &KpiDefinition,
    anchor_table: &str,
    resolved_inputs: &BTreeMap<String, ResolvedRuntimeKpi>,
    contexts: &FactTableContexts,
) -> Result<String, ExpressionError> {
    let unaliased = replace_aliases(&kpi.expression, &kpi.input_metrics);
    let columns: BTreeMap<String, String> = resolved_inputs
        .iter()
        .map(|(metric_id, resolved)| (metric_id.clone(), resolved.qualified_name()))
        .collect();
    let expression = replace_identifiers(&unaliased, &columns);
    let join = get_join_clause(&kpi.name, anchor_table, contexts)?;
    Ok(format!("{expression} FROM {KPI_DB_SCHEME}{anchor_table}{join}"))
}

// ============================================================================
// SECTION: Joins
// ============================================================================

/// Builds the `INNER JOIN` clauses attaching every non-anchor fact table.
///
/// Returns an empty string when only one fact table participates.
///
/// # Errors
///
/// Returns [`ExpressionError::NoJoinTarget`] when a table shares no field with
/// the anchor and [`ExpressionError::Uninstantiable`] when no join results.
pub fn get_join_clause(
    kpi_name: &str,
    anchor_table: &str,
    contexts: &FactTableContexts,
) -> Result<String, ExpressionError> {
    if contexts.len() <= 1 {
        return Ok(String::new());
    }
    let mut remaining = contexts.clone();
    let anchor_fields = remaining.remove(anchor_table).unwrap_or_default();

    let mut clause = String::new();
    for (table, fields) in &remaining {
        let shared: Vec<&String> =
            anchor_fields.iter().filter(|field| fields.contains(field)).collect();
        if shared.is_empty() {
            return Err(ExpressionError::NoJoinTarget {
                kpi: kpi_name.to_string(),
                table: table.clone(),
                context: anchor_fields.join(","),
            });
        }
        let conditions: Vec<String> = shared
            .iter()
            .map(|field| format!("{anchor_table}.{field} = {table}.{field}"))
            .collect();
        clause.push_str(&format!(
            " INNER JOIN {KPI_DB_SCHEME}{table} ON {}",
            conditions.join(" AND ")
        ));
    }
    if clause.is_empty() {
        return Err(ExpressionError::Uninstantiable {
            kpi: kpi_name.to_string(),
        });
    }
    Ok(clause)
}

/// Collects the unqualified context fields of each resolved simple KPI's fact table.
///
/// The first KPI seen for a fact table wins; later ones are ignored.
#[must_use]
pub fn get_input_metric_table_map(
    resolved_inputs: &BTreeMap<String, ResolvedRuntimeKpi>,
) -> FactTableContexts {
    let mut contexts = FactTableContexts::new();
    for resolved in resolved_inputs.values() {
        contexts.entry(resolved.fact_table()).or_insert_with(|| {
            resolved
                .definition
                .aggregation_elements
                .iter()
                .map(String::as_str)
                .map(unqualify)
                .collect()
        });
    }
    contexts
}

/// Picks the first fact table whose fields contain every profile context field.
///
/// # Errors
///
/// Returns [`ExpressionError::NoAnchorTable`] when no table qualifies.
pub fn select_anchor_table(
    kpi_name: &str,
    profile_context: &[String],
    contexts: &FactTableContexts,
) -> Result<String, ExpressionError> {
    contexts
        .iter()
        .find(|(_, fields)| profile_context.iter().all(|field| fields.contains(field)))
        .map(|(table, _)| table.clone())
        .ok_or_else(|| ExpressionError::NoAnchorTable {
            kpi: kpi_name.to_string(),
            context: profile_context.join(","),
        })
}

/// Returns the substring after the last `.`, or the whole value.
#[must_use]
pub fn unqualify(element: &str) -> String {
    element.rsplit_once('.').map_or(element, |(_, field)| field).to_string()
}

// ============================================================================
// SECTION: Identifier Replacement
// ============================================================================

/// Replaces `alias` and `${alias}` occurrences with the metric id.
fn replace_aliases(expression: &str, input_metrics: &[InputMetric]) -> String {
    let mut replacements = BTreeMap::new();
    for metric in input_metrics {
        if let Some(alias) = metric.effective_alias() {
            replacements.insert(alias.to_string(), metric.id.clone());
            replacements.insert(format!("${{{alias}}}"), metric.id.clone());
        }
    }
    replace_identifiers(expression, &replacements)
}

/// Replaces whole-identifier occurrences in a single left-to-right pass.
///
/// Longer candidates win; a candidate only matches when neither neighbor is an
/// identifier character. Replaced text is never rescanned.
fn replace_identifiers(expression: &str, replacements: &BTreeMap<String, String>) -> String {
    let mut candidates: Vec<(&str, &str)> = replacements
        .iter()
        .filter(|(from, _)| !from.is_empty())
        .map(|(from, to)| (from.as_str(), to.as_str()))
        .collect();
    if candidates.is_empty() {
        return expression.to_string();
    }
    candidates.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));

    let mut output = String::with_capacity(expression.len());
    let mut index = 0;
    while index < expression.len() {
        let rest = &expression[index..];
        let open_before =
            expression[..index].chars().next_back().is_none_or(|c| !is_identifier_char(c));
        let matched = if open_before {
            candidates.iter().find(|(from, _)| {
                rest.starts_with(from)
                    && rest[from.len()..].chars().next().is_none_or(|c| !is_identifier_char(c))
            })
        } else {
            None
        };
        if let Some((from, to)) = matched {
            output.push_str(to);
            index += from.len();
        } else {
            let Some(next) = rest.chars().next() else {
                break;
            };
            output.push(next);
            index += next.len_utf8();
        }
    }
    output
}

/// Returns true for characters that continue an identifier.
const fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a replacement map from string pairs.
    fn replacements(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(from, to)| ((*from).to_string(), (*to).to_string())).collect()
    }

    /// Verifies replacement only matches whole identifiers.
    #[test]
    fn replacement_respects_identifier_boundaries() {
        let map = replacements(&[("PM_ID", "x"), ("PM_ID_B", "y")]);
        assert_eq!(replace_identifiers("PM_ID + PM_ID_B + PM_IDX", &map), "x + y + PM_IDX");
    }

    /// Verifies substituted text is not rescanned.
    #[test]
    fn replacement_never_rescans_output() {
        let map = replacements(&[("a", "t.a")]);
        assert_eq!(replace_identifiers("SUM(a) / COUNT(a)", &map), "SUM(t.a) / COUNT(t.a)");
    }

    /// Verifies unqualify keeps the segment after the last dot.
    #[test]
    fn unqualify_keeps_text_after_last_dot() {
        assert_eq!(unqualify("kpi_simple_60.agg1"), "agg1");
        assert_eq!(unqualify("agg1"), "agg1");
    }
}
