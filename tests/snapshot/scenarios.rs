//! BDD scenarios for the snapshot lifecycle.

use rstest_bdd_macros::scenario;

use super::test_helpers::{SnapshotContext, snapshot_context};

#[scenario(
    path = "tests/features/snapshot.feature",
    name = "Back up a volume and restore it"
)]
fn scenario_backup_and_restore(snapshot_context: SnapshotContext) {
    drop(snapshot_context);
}

#[scenario(path = "tests/features/snapshot.feature", name = "Delete a snapshot twice")]
fn scenario_delete_twice(snapshot_context: SnapshotContext) {
    drop(snapshot_context);
}

#[scenario(
    path = "tests/features/snapshot.feature",
    name = "Keep the upload when the backup job fails"
)]
fn scenario_unconfirmed_backup(snapshot_context: SnapshotContext) {
    drop(snapshot_context);
}

#[scenario(
    path = "tests/features/snapshot.feature",
    name = "Refuse to back up an unknown volume"
)]
fn scenario_unknown_volume(snapshot_context: SnapshotContext) {
    drop(snapshot_context);
}

#[scenario(
    path = "tests/features/snapshot.feature",
    name = "Surface upload failures"
)]
fn scenario_upload_failure(snapshot_context: SnapshotContext) {
    drop(snapshot_context);
}
