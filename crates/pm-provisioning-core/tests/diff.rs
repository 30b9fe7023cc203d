// pm-provisioning-core/tests/diff.rs
// ============================================================================
// Module: Diff Calculator Tests
// Description: Change detection and affected profile computation.
// Purpose: Validate PM, KPI, augmentation, and profile propagation rules.
// Dependencies: pm-provisioning-core
// ============================================================================
//! ## Overview
//! Seeds the dictionary and deployed stores with the shared scenario, then
//! submits targeted changes and checks which profiles are reported.

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
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use pm_provisioning_core::AugmentationUrlResolver;
use pm_provisioning_core::DeployedStore;
use pm_provisioning_core::DiffCalculator;
use pm_provisioning_core::DiffError;
use pm_provisioning_core::InMemoryDeployedStore;
use pm_provisioning_core::InMemoryDictionaryStore;
use pm_provisioning_core::ProfileDefinition;
use pm_provisioning_core::ResourceSubmission;

use crate::common::MapUrls;
use crate::common::augmentation;
use crate::common::pm;
use crate::common::profile;
use crate::common::reference;
use crate::common::scenario_submission;

/// Dictionary and deployed stores seeded with a provisioned submission.
struct Seeded {
    /// Dictionary store.
    dictionary: InMemoryDictionaryStore,
    /// Deployed store.
    deployed: InMemoryDeployedStore,
}

/// Seeds both stores as if `submission` had been provisioned with `urls`.
fn seeded(submission: &ResourceSubmission, urls: &MapUrls) -> Seeded {
    let dictionary = InMemoryDictionaryStore::with_submission(submission).expect("dictionary");
    let deployed = InMemoryDeployedStore::new();
    deployed.save_profiles(&submission.profiles).expect("profiles");
    let effective: Vec<_> = submission
        .augmentations
        .iter()
        .map(|augmentation| {
            let resolved = urls.resolve_url(&augmentation.url).expect("url");
            augmentation.with_url(resolved)
        })
        .collect();
    deployed.save_effective_augmentations(&effective).expect("augmentations");
    Seeded {
        dictionary,
        deployed,
    }
}

/// Returns the names of `profiles`.
fn names(profiles: &[ProfileDefinition]) -> Vec<&str> {
    profiles.iter().map(|profile| profile.name.as_str()).collect()
}

/// Verifies a first submission is changed and every profile is affected.
#[test]
fn empty_stores_mark_everything_changed() {
    let dictionary = InMemoryDictionaryStore::new();
    let deployed = InMemoryDeployedStore::new();
    let urls = MapUrls::default();
    let diff = DiffCalculator::new(&dictionary, &deployed, &urls);
    let submission = scenario_submission();

    assert!(diff.is_changed(&submission).expect("is_changed"));
    let affected = diff.get_affected_profiles(&submission).expect("affected");
    assert_eq!(names(&affected), vec!["profile_b", "profile_complex"]);
}

/// Verifies resubmitting stored resources reports no change.
#[test]
fn identical_submission_is_unchanged() {
    let submission = scenario_submission();
    let urls = MapUrls::default();
    let stores = seeded(&submission, &urls);
    let diff = DiffCalculator::new(&stores.dictionary, &stores.deployed, &urls);

    assert!(!diff.is_changed(&submission).expect("is_changed"));
    assert!(diff.get_affected_profiles(&submission).expect("affected").is_empty());
    assert!(!diff.is_changed(&ResourceSubmission::default()).expect("empty"));
}

/// Verifies one changed PM reaches the profiles of every KPI that reads it.
#[test]
fn changed_pm_affects_profiles_of_consuming_kpis() {
    let urls = MapUrls::default();
    let stores = seeded(&scenario_submission(), &urls);
    let diff = DiffCalculator::new(&stores.dictionary, &stores.deployed, &urls);

    let submission = ResourceSubmission {
        pm_defs: vec![pm("PM_ID_B", "schemaNameB2")],
        ..ResourceSubmission::default()
    };
    assert!(diff.is_changed(&submission).expect("is_changed"));
    let affected = diff.get_affected_profiles(&submission).expect("affected");
    assert_eq!(names(&affected), vec!["profile_b", "profile_complex"]);
}

/// Verifies complex KPIs inherit changes of the KPIs they consume.
#[test]
fn changed_pm_propagates_through_complex_kpis() {
    let urls = MapUrls::default();
    let stores = seeded(&scenario_submission(), &urls);
    let diff = DiffCalculator::new(&stores.dictionary, &stores.deployed, &urls);

    let submission = ResourceSubmission {
        pm_defs: vec![pm("PM_ID_A", "schemaNameA2")],
        ..ResourceSubmission::default()
    };
    let affected = diff.get_affected_profiles(&submission).expect("affected");
    assert_eq!(names(&affected), vec!["profile_complex"]);
}

/// Verifies a changed KPI definition affects the profiles referencing it.
#[test]
fn changed_kpi_definition_affects_referencing_profiles() {
    let urls = MapUrls::default();
    let stores = seeded(&scenario_submission(), &urls);
    let diff = DiffCalculator::new(&stores.dictionary, &stores.deployed, &urls);

    let mut simple_b = common::simple_b();
    simple_b.expression = "MAX(pmCounters.PMb)".to_string();
    simple_b.aggregation_type = "MAX".to_string();
    let submission = ResourceSubmission {
        kpi_defs: vec![simple_b],
        ..ResourceSubmission::default()
    };
    assert!(diff.is_changed(&submission).expect("is_changed"));
    let affected = diff.get_affected_profiles(&submission).expect("affected");
    assert_eq!(names(&affected), vec!["profile_b", "profile_complex"]);
}

/// Verifies the submitted version of an affected profile replaces the deployed one.
#[test]
fn submitted_profile_wins_over_deployed_copy() {
    let urls = MapUrls::default();
    let stores = seeded(&scenario_submission(), &urls);
    let diff = DiffCalculator::new(&stores.dictionary, &stores.deployed, &urls);

    let mut updated = common::profile_b();
    updated.description = Some("reworded".to_string());
    let submission = ResourceSubmission {
        pm_defs: vec![pm("PM_ID_B", "schemaNameB2")],
        profiles: vec![updated.clone()],
        ..ResourceSubmission::default()
    };
    let affected = diff.get_affected_profiles(&submission).expect("affected");
    assert_eq!(names(&affected), vec!["profile_b", "profile_complex"]);
    assert_eq!(affected[0], updated);
}

/// Verifies new profiles are affected while matched, untouched ones are not.
#[test]
fn only_new_or_changed_submitted_profiles_are_affected() {
    let urls = MapUrls::default();
    let stores = seeded(&scenario_submission(), &urls);
    let diff = DiffCalculator::new(&stores.dictionary, &stores.deployed, &urls);

    let fresh = profile("profile_new", &["agg1"], vec![reference("simple_a", 15)]);
    let submission = ResourceSubmission {
        profiles: vec![common::profile_b(), fresh],
        ..ResourceSubmission::default()
    };
    assert!(diff.is_changed(&submission).expect("is_changed"));
    let affected = diff.get_affected_profiles(&submission).expect("affected");
    assert_eq!(names(&affected), vec!["profile_new"]);
}

/// Verifies augmentations compare against their resolved, effective form.
#[test]
fn augmentation_change_follows_resolved_url() {
    let mut seed = scenario_submission();
    seed.augmentations = vec![augmentation("cell_aug", "http://${host}/augment")];
    let mut bound = common::profile_b();
    bound.augmentation = Some("cell_aug".to_string());
    seed.profiles = vec![bound, common::profile_complex()];
    let stores = seeded(&seed, &MapUrls::with("host", "h1"));

    let submission = ResourceSubmission {
        augmentations: seed.augmentations.clone(),
        ..ResourceSubmission::default()
    };

    let same_host = MapUrls::with("host", "h1");
    let diff = DiffCalculator::new(&stores.dictionary, &stores.deployed, &same_host);
    assert!(!diff.is_changed(&submission).expect("is_changed"));

    let moved_host = MapUrls::with("host", "h2");
    let diff = DiffCalculator::new(&stores.dictionary, &stores.deployed, &moved_host);
    assert!(diff.is_changed(&submission).expect("is_changed"));
    let affected = diff.get_affected_profiles(&submission).expect("affected");
    assert_eq!(names(&affected), vec!["profile_b"]);
}

/// Verifies an unresolvable placeholder surfaces as an augmentation error.
#[test]
fn unresolved_augmentation_placeholder_is_an_error() {
    let mut seed = scenario_submission();
    seed.augmentations = vec![augmentation("cell_aug", "http://${host}/augment")];
    let stores = seeded(&seed, &MapUrls::with("host", "h1"));
    let urls = MapUrls::default();
    let diff = DiffCalculator::new(&stores.dictionary, &stores.deployed, &urls);
    let submission = ResourceSubmission {
        augmentations: seed.augmentations.clone(),
        ..ResourceSubmission::default()
    };
    let err = diff.is_changed(&submission).unwrap_err();
    assert!(matches!(err, DiffError::Augmentation(_)), "unexpected error: {err}");
}
