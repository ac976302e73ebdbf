//! BDD step definitions for the snapshot lifecycle.

use std::collections::BTreeMap;

use cstor_backup::control_plane::ControlPlaneError;
use cstor_backup::model::CAS_TYPE_LABEL;
use cstor_backup::{ClaimInfo, ClaimPhase, JobStatus, VOLUME_KIND};
use rstest_bdd_macros::{given, then, when};

use super::test_helpers::SnapshotContext;

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

#[given("a discovered cstor volume \"{volume}\" in namespace \"{namespace}\"")]
fn discovered_volume(
    snapshot_context: &SnapshotContext,
    volume: String,
    namespace: String,
) -> Result<(), StepError> {
    snapshot_context.directory.add_claim(volume.as_str(), namespace.as_str());
    let claim = ClaimInfo {
        name: volume,
        storage_class: String::from("openebs-cstor"),
        claim_namespace: Some(namespace),
        labels: BTreeMap::from([(CAS_TYPE_LABEL.to_owned(), String::from("cstor"))]),
        phase: ClaimPhase::Bound,
    };
    match snapshot_context.orchestrator.discover_volume(&claim) {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(StepError::Assertion(String::from(
            "volume was not recognised as a cstor volume",
        ))),
        Err(err) => Err(StepError::Assertion(err.to_string())),
    }
}

#[given("the control plane completes every job")]
fn control_plane_completes(snapshot_context: &SnapshotContext) {
    snapshot_context.control_plane.push_statuses([JobStatus::Done]);
}

#[given("the control plane fails every job")]
fn control_plane_fails(snapshot_context: &SnapshotContext) {
    snapshot_context
        .control_plane
        .push_statuses([JobStatus::InProgress, JobStatus::Failed]);
}

#[given("the object store rejects uploads")]
fn uploads_rejected(snapshot_context: &SnapshotContext) {
    snapshot_context.store.fail_uploads();
}

#[when("the control plane has forgotten every backup")]
fn control_plane_forgets(snapshot_context: &SnapshotContext) {
    snapshot_context
        .control_plane
        .fail_deletes(ControlPlaneError::Rejected {
            status: 404,
            body: String::from("backup not found"),
        });
}

#[when("I back up volume \"{volume}\" as \"{backup}\"")]
fn back_up(snapshot_context: &SnapshotContext, volume: String, backup: String) {
    let outcome = snapshot_context
        .runtime
        .block_on(snapshot_context.orchestrator.create_snapshot(&volume, &backup));
    snapshot_context.record(outcome);
}

#[when("I restore snapshot \"{snapshot}\"")]
fn restore(snapshot_context: &SnapshotContext, snapshot: String) {
    let outcome = snapshot_context.runtime.block_on(
        snapshot_context
            .orchestrator
            .create_volume_from_snapshot(&snapshot, VOLUME_KIND),
    );
    snapshot_context.record(outcome);
}

#[when("I delete snapshot \"{snapshot}\"")]
fn delete(snapshot_context: &SnapshotContext, snapshot: String) {
    let outcome = snapshot_context
        .runtime
        .block_on(snapshot_context.orchestrator.delete_snapshot(&snapshot))
        .map(|()| String::new());
    snapshot_context.record(outcome);
}

#[then("the operation returns \"{expected}\"")]
fn operation_returns(snapshot_context: &SnapshotContext, expected: String) -> Result<(), StepError> {
    match snapshot_context.outcome.borrow().as_ref() {
        Some(Ok(value)) if *value == expected => Ok(()),
        Some(Ok(value)) => Err(StepError::Assertion(format!(
            "expected {expected}, got {value}"
        ))),
        Some(Err(err)) => Err(StepError::Assertion(format!(
            "expected {expected}, got error: {err}"
        ))),
        None => Err(StepError::Assertion(String::from("no operation ran"))),
    }
}

#[then("the operation succeeds")]
fn operation_succeeds(snapshot_context: &SnapshotContext) -> Result<(), StepError> {
    match snapshot_context.outcome.borrow().as_ref() {
        Some(Ok(_)) => Ok(()),
        Some(Err(err)) => Err(StepError::Assertion(format!(
            "expected success, got error: {err}"
        ))),
        None => Err(StepError::Assertion(String::from("no operation ran"))),
    }
}

#[then("the operation fails in the \"{phase}\" phase")]
fn operation_fails_in_phase(
    snapshot_context: &SnapshotContext,
    phase: String,
) -> Result<(), StepError> {
    match snapshot_context.outcome.borrow().as_ref() {
        Some(Err(err)) if err.phase().to_string() == phase => Ok(()),
        Some(Err(err)) => Err(StepError::Assertion(format!(
            "expected a {phase} failure, got {} failure: {err}",
            err.phase()
        ))),
        Some(Ok(value)) => Err(StepError::Assertion(format!(
            "expected a {phase} failure, got success: {value}"
        ))),
        None => Err(StepError::Assertion(String::from("no operation ran"))),
    }
}

#[then("the object store holds \"{object}\"")]
fn store_holds(snapshot_context: &SnapshotContext, object: String) -> Result<(), StepError> {
    if snapshot_context.store.contains(&object) {
        return Ok(());
    }
    Err(StepError::Assertion(format!(
        "expected {object} in {:?}",
        snapshot_context.store.objects()
    )))
}

#[then("the object store does not hold \"{object}\"")]
fn store_lacks(snapshot_context: &SnapshotContext, object: String) -> Result<(), StepError> {
    if snapshot_context.store.contains(&object) {
        return Err(StepError::Assertion(format!("{object} is still stored")));
    }
    Ok(())
}

#[then("the control plane received no commands")]
fn no_commands(snapshot_context: &SnapshotContext) -> Result<(), StepError> {
    match snapshot_context.control_plane.command_count() {
        0 => Ok(()),
        count => Err(StepError::Assertion(format!(
            "expected no commands, got {count}"
        ))),
    }
}
