//! Backup and restore orchestration for cStor block volumes.
//!
//! The crate drives a remote volume-management service (the control plane)
//! to snapshot and restore volumes, moves the snapshot bytes through an
//! object store (the data plane), and tracks each remote job to a terminal
//! state. Snapshots are named by durable identifiers of the form
//! `<volumeID>-velero-bkp-<backupName>` so they can be found again after a
//! restart.
//!
//! [`SnapshotOrchestrator`] is the entry point; [`PluginConfig`] wires it to
//! the REST control plane and the process-backed data mover.

pub mod config;
pub mod control_plane;
pub mod directory;
pub mod identifier;
pub mod model;
pub mod naming;
pub mod orchestrator;
pub mod poller;
pub mod process;
pub mod registry;
pub mod test_support;
pub mod transfer;

pub use config::{ConfigError, PluginConfig};
pub use control_plane::{
    BackupRequest, ControlPlane, ControlPlaneError, HttpControlPlane, JobHandle, JobKind,
    RestoreRequest,
};
pub use directory::{DirectoryError, VolumeDirectory};
pub use identifier::{IdentifierError, SnapshotId};
pub use model::{ClaimInfo, ClaimPhase, JobStatus, Snapshot, VOLUME_KIND, Volume};
pub use naming::{RemoteNamer, backup_base_name, remote_name};
pub use orchestrator::{
    OrchestratorError, OrchestratorSettings, Phase, SetupError, SnapshotOrchestrator,
};
pub use poller::{PollerHandle, StatusPoller};
pub use process::{CommandOutput, CommandRunner, ProcessCommandRunner, ProcessError};
pub use registry::{OperationGuard, Registry};
pub use transfer::{CommandObjectStore, DataPlane, ObjectStore, TransferError};
