//! Shared fixtures for snapshot lifecycle scenarios.

use std::cell::RefCell;
use std::time::Duration;

use cstor_backup::test_support::{MemoryDirectory, MemoryObjectStore, ScriptedControlPlane};
use cstor_backup::{OrchestratorError, OrchestratorSettings, SnapshotOrchestrator};
use rstest::fixture;
use tokio::runtime::Runtime;

pub type Orchestrator =
    SnapshotOrchestrator<ScriptedControlPlane, MemoryObjectStore, MemoryDirectory>;

pub type Outcome = Result<String, OrchestratorError>;

pub struct SnapshotContext {
    pub runtime: Runtime,
    pub orchestrator: Orchestrator,
    pub control_plane: ScriptedControlPlane,
    pub store: MemoryObjectStore,
    pub directory: MemoryDirectory,
    pub outcome: RefCell<Option<Outcome>>,
}

impl SnapshotContext {
    pub fn record(&self, outcome: Outcome) {
        self.outcome.replace(Some(outcome));
    }
}

#[fixture]
pub fn snapshot_context() -> SnapshotContext {
    let runtime =
        Runtime::new().unwrap_or_else(|err| panic!("tokio runtime should start: {err}"));
    let control_plane = ScriptedControlPlane::new();
    let store = MemoryObjectStore::new();
    let directory = MemoryDirectory::new();
    let orchestrator = SnapshotOrchestrator::new(
        control_plane.clone(),
        store.clone(),
        directory.clone(),
        OrchestratorSettings::new("10.0.0.5:9000")
            .with_poll_interval(Duration::from_millis(5))
            .with_confirm_grace(Duration::from_secs(1))
            .with_operation_timeout(Duration::from_secs(5)),
    );
    SnapshotContext {
        runtime,
        orchestrator,
        control_plane,
        store,
        directory,
        outcome: RefCell::new(None),
    }
}
