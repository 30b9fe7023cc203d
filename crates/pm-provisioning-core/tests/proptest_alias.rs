// pm-provisioning-core/tests/proptest_alias.rs
// ============================================================================
// Module: Alias and Naming Property-Based Tests
// Description: Property tests for alias validity and stable runtime naming.
// Purpose: Detect pattern violations and name churn across wide input ranges.
// ============================================================================

//! Property-based tests for alias and naming invariants.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use pm_provisioning_core::AliasPolicy;
use pm_provisioning_core::CanonicalFingerprinter;
use pm_provisioning_core::DEFAULT_HASH_ALGORITHM;
use pm_provisioning_core::DeployedStore;
use pm_provisioning_core::InMemoryDeployedStore;
use pm_provisioning_core::InMemoryDictionaryStore;
use pm_provisioning_core::KpiKind;
use pm_provisioning_core::KpiResolver;
use pm_provisioning_core::ResolvedKpiCache;
use pm_provisioning_core::ResolverConfig;
use pm_provisioning_core::SequentialNameGenerator;
use pm_provisioning_core::runtime::MAX_ALIAS_LENGTH;
use pm_provisioning_core::runtime::MIN_ALIAS_LENGTH;
use proptest::prelude::*;

use crate::common::profile;
use crate::common::reference;
use crate::common::scenario_submission;

/// Generates either KPI kind.
fn kind_strategy() -> impl Strategy<Value = KpiKind> {
    prop_oneof![Just(KpiKind::Simple), Just(KpiKind::Complex)]
}

/// Generates non-empty, order-preserving profile contexts.
fn context_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::sample::subsequence(vec!["agg1", "agg2", "agg3", "cell_id", "node.id"], 1 ..= 5)
        .prop_map(|fields| fields.into_iter().map(str::to_string).collect())
}

proptest! {
    #[test]
    fn derived_aliases_always_match_the_pattern(
        max_length in MIN_ALIAS_LENGTH ..= MAX_ALIAS_LENGTH,
        kind in kind_strategy(),
        owner in ".{0,40}",
        fields in prop::collection::vec("\\PC{0,20}", 0 .. 6),
    ) {
        let policy = AliasPolicy::new(max_length, DEFAULT_HASH_ALGORITHM).expect("policy");
        let alias = policy.derive(kind, &owner, &fields).expect("alias");
        prop_assert!(policy.is_valid(alias.as_str()));
        prop_assert!(alias.as_str().len() <= max_length);
        prop_assert!(alias.as_str().starts_with(kind.label()));
    }

    #[test]
    fn derived_aliases_are_deterministic(
        kind in kind_strategy(),
        owner in "[A-Za-z0-9_]{1,60}",
        fields in prop::collection::vec("[a-z0-9_.]{1,12}", 0 .. 6),
    ) {
        let policy = AliasPolicy::new(MIN_ALIAS_LENGTH, DEFAULT_HASH_ALGORITHM).expect("policy");
        let first = policy.derive(kind, &owner, &fields).expect("alias");
        let second = policy.derive(kind, &owner, &fields).expect("alias");
        prop_assert_eq!(first, second);
    }

    #[test]
    fn distinct_field_lists_get_distinct_aliases(
        kind in kind_strategy(),
        owner in "[A-Za-z][A-Za-z0-9_]{0,12}",
        left in prop::collection::vec("[a-z0-9_.-]{1,8}", 1 .. 4),
        right in prop::collection::vec("[a-z0-9_.-]{1,8}", 1 .. 4),
    ) {
        prop_assume!(left != right);
        let policy = AliasPolicy::new(MAX_ALIAS_LENGTH, DEFAULT_HASH_ALGORITHM).expect("policy");
        let left_alias = policy.derive(kind, &owner, &left).expect("alias");
        let right_alias = policy.derive(kind, &owner, &right).expect("alias");
        prop_assert_ne!(left_alias, right_alias);
    }

    #[test]
    fn out_of_range_max_lengths_are_rejected(max_length in 0usize .. 200) {
        let accepted = AliasPolicy::new(max_length, DEFAULT_HASH_ALGORITHM).is_ok();
        prop_assert_eq!(accepted, (MIN_ALIAS_LENGTH ..= MAX_ALIAS_LENGTH).contains(&max_length));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn persisted_instances_keep_their_names(
        context in context_strategy(),
        period in prop::sample::select(vec![15u32, 60, 1440]),
    ) {
        let dictionary =
            InMemoryDictionaryStore::with_submission(&scenario_submission()).expect("dictionary");
        let deployed = InMemoryDeployedStore::new();
        let fingerprinter = CanonicalFingerprinter::default();
        let config = ResolverConfig::default();
        let fields: Vec<&str> = context.iter().map(String::as_str).collect();
        let profiles = [profile("p", &fields, vec![reference("simple_a", period)])];

        let first_names = SequentialNameGenerator::new("kpi");
        let resolver =
            KpiResolver::new(&dictionary, &deployed, &first_names, &fingerprinter, &config)
                .expect("resolver");
        let first = resolver
            .calculate_affected_kpis(&profiles, &mut ResolvedKpiCache::new())
            .expect("first run");
        deployed.save_kpi_instances(&first).expect("persist");

        let second_names = SequentialNameGenerator::new("other");
        let resolver =
            KpiResolver::new(&dictionary, &deployed, &second_names, &fingerprinter, &config)
                .expect("resolver");
        let second = resolver
            .calculate_affected_kpis(&profiles, &mut ResolvedKpiCache::new())
            .expect("second run");

        prop_assert_eq!(second_names.issued(), 0);
        prop_assert_eq!(first, second);
    }
}
