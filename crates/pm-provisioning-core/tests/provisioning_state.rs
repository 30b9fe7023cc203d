// pm-provisioning-core/tests/provisioning_state.rs
// ============================================================================
// Module: Provisioning State Machine Tests
// Description: Lifecycle transitions and row bookkeeping.
// Purpose: Validate legal transitions, row reuse, and the initial state.
// Dependencies: pm-provisioning-core
// ============================================================================
//! ## Overview
//! Drives the provisioning state machine over the in-memory state store and
//! checks both the returned rows and what the store retained.

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

use pm_provisioning_core::InMemoryProvisioningStateStore;
use pm_provisioning_core::ProvisioningError;
use pm_provisioning_core::ProvisioningState;
use pm_provisioning_core::ProvisioningStateMachine;
use pm_provisioning_core::ProvisioningStateStore;
use pm_provisioning_core::ProvisioningStatus;
use pm_provisioning_core::SharedProvisioningStateStore;
use pm_provisioning_core::Timestamp;
use pm_provisioning_core::TransitionError;

/// Returns a timestamp `millis` after the epoch.
const fn at(millis: i64) -> Timestamp {
    Timestamp::from_unix_millis(millis)
}

/// Verifies an empty store reports a synthesized `INITIAL` row.
#[test]
fn empty_store_starts_initial() {
    let machine = ProvisioningStateMachine::new(InMemoryProvisioningStateStore::new());
    let latest = machine.latest().expect("latest");
    assert_eq!(latest, ProvisioningState::initial());
    assert_eq!(latest.state, ProvisioningStatus::Initial);
    assert!(machine.store().rows().expect("rows").is_empty());
}

/// Verifies a start/complete pair closes a single row.
#[test]
fn completion_closes_the_started_row() {
    let store = InMemoryProvisioningStateStore::new();
    let machine = ProvisioningStateMachine::new(store.clone());

    let started = machine.save(ProvisioningStatus::Started, at(1_000)).expect("start");
    assert_eq!(started.id, 1);
    assert_eq!(started.provisioning_start_time, Some(at(1_000)));
    assert_eq!(started.provisioning_end_time, None);

    let completed = machine.save(ProvisioningStatus::Completed, at(2_500)).expect("complete");
    assert_eq!(completed.id, 1);
    assert_eq!(completed.state, ProvisioningStatus::Completed);
    assert_eq!(completed.provisioning_start_time, Some(at(1_000)));
    assert_eq!(completed.provisioning_end_time, Some(at(2_500)));
    assert_eq!(store.rows().expect("rows"), vec![completed]);
}

/// Verifies every new attempt appends a row with the next id.
#[test]
fn new_attempts_append_rows() {
    let store = InMemoryProvisioningStateStore::new();
    let machine = ProvisioningStateMachine::new(store.clone());
    machine.save(ProvisioningStatus::Started, at(1)).expect("start");
    machine.save(ProvisioningStatus::Error, at(2)).expect("error");
    let retry = machine.save(ProvisioningStatus::Started, at(3)).expect("restart");
    assert_eq!(retry.id, 2);
    machine.save(ProvisioningStatus::Completed, at(4)).expect("complete");

    let statuses: Vec<ProvisioningStatus> =
        store.rows().expect("rows").into_iter().map(|row| row.state).collect();
    assert_eq!(statuses, vec![ProvisioningStatus::Error, ProvisioningStatus::Completed]);
    assert_eq!(machine.latest().expect("latest").id, 2);
}

/// Verifies a second start is rejected while an attempt is running.
#[test]
fn concurrent_start_is_rejected() {
    let machine = ProvisioningStateMachine::new(InMemoryProvisioningStateStore::new());
    machine.save(ProvisioningStatus::Started, at(1)).expect("start");
    let err = machine.save(ProvisioningStatus::Started, at(2)).unwrap_err();
    match err {
        ProvisioningError::Transition(TransitionError {
            from,
            to,
        }) => {
            assert_eq!(from, ProvisioningStatus::Started);
            assert_eq!(to, ProvisioningStatus::Started);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(machine.latest().expect("latest").state, ProvisioningStatus::Started);
}

/// Verifies terminal states cannot be recorded without a running attempt.
#[test]
fn terminal_states_require_a_started_attempt() {
    let machine = ProvisioningStateMachine::new(InMemoryProvisioningStateStore::new());
    assert!(machine.save(ProvisioningStatus::Completed, at(1)).is_err());
    assert!(machine.save(ProvisioningStatus::Error, at(1)).is_err());
    assert!(machine.save(ProvisioningStatus::Initial, at(1)).is_err());
    assert!(machine.store().rows().expect("rows").is_empty());
}

/// Verifies the full transition table.
#[test]
fn transition_table_is_exhaustive() {
    use pm_provisioning_core::ProvisioningStatus::Completed;
    use pm_provisioning_core::ProvisioningStatus::Error;
    use pm_provisioning_core::ProvisioningStatus::Initial;
    use pm_provisioning_core::ProvisioningStatus::Started;

    let all = [Initial, Started, Completed, Error];
    let allowed = [
        (Initial, Started),
        (Completed, Started),
        (Error, Started),
        (Started, Completed),
        (Started, Error),
    ];
    for from in all {
        for to in all {
            assert_eq!(
                from.can_transition_to(to),
                allowed.contains(&(from, to)),
                "transition {from} -> {to}"
            );
        }
    }
}

/// Verifies status labels round-trip through their storage form.
#[test]
fn status_labels_are_stable() {
    for status in [
        ProvisioningStatus::Initial,
        ProvisioningStatus::Started,
        ProvisioningStatus::Completed,
        ProvisioningStatus::Error,
    ] {
        assert_eq!(ProvisioningStatus::parse(status.as_str()), Some(status));
    }
    assert_eq!(ProvisioningStatus::Completed.to_string(), "COMPLETED");
    assert_eq!(ProvisioningStatus::parse("completed"), None);
}

/// Verifies the shared wrapper forwards to the wrapped store.
#[test]
fn shared_store_forwards_to_inner_store() {
    let inner = InMemoryProvisioningStateStore::new();
    let shared = SharedProvisioningStateStore::from_store(inner.clone());
    let machine = ProvisioningStateMachine::new(shared.clone());
    machine.save(ProvisioningStatus::Started, at(10)).expect("start");
    assert_eq!(shared.find_latest().expect("latest").map(|row| row.id), Some(1));
    assert_eq!(inner.rows().expect("rows").len(), 1);
}
