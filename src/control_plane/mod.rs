//! Client for the volume-management service (the control plane).
//!
//! The control plane snapshots and restores volumes but never handles the
//! bulk data. The engine issues three commands (create backup, create
//! restore, delete backup) and polls job status while the data moves.

mod error;
mod http;
mod types;

use std::future::Future;
use std::pin::Pin;

use crate::model::JobStatus;

pub use error::ControlPlaneError;
pub use http::{BACKUP_ENDPOINT, HttpControlPlane, RESTORE_ENDPOINT};

/// Future returned by control-plane operations.
pub type ControlPlaneFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, ControlPlaneError>> + Send + 'a>>;

/// Parameters for a backup job.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BackupRequest {
    /// Volume to snapshot.
    pub volume_id: String,
    /// Backup series the snapshot belongs to.
    pub backup_base_name: String,
    /// Full backup request name; names the snapshot on the control plane.
    pub snapshot_name: String,
    /// Data-plane address the snapshot is streamed to.
    pub destination: String,
    /// Namespace of the volume's claim.
    pub namespace: String,
}

/// Parameters for a restore job.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RestoreRequest {
    /// Volume receiving the restored data.
    pub volume_id: String,
    /// Restore name; the backup name the data was taken under.
    pub restore_name: String,
    /// Data-plane address the restored data is pulled from.
    pub source: String,
    /// Namespace of the target volume's claim.
    pub namespace: String,
}

/// Kind of remote job.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JobKind {
    /// Snapshot and stream out.
    Backup,
    /// Stream in and apply.
    Restore,
}

/// Reference to a job accepted by the control plane.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct JobHandle {
    /// Job kind.
    pub kind: JobKind,
    /// Snapshot name for backups, restore name for restores.
    pub name: String,
    /// Volume the job operates on.
    pub volume_id: String,
    /// Namespace of the volume's claim.
    pub namespace: String,
}

impl JobHandle {
    /// Handle for the backup job created from `request`.
    #[must_use]
    pub fn for_backup(request: &BackupRequest) -> Self {
        Self {
            kind: JobKind::Backup,
            name: request.snapshot_name.clone(),
            volume_id: request.volume_id.clone(),
            namespace: request.namespace.clone(),
        }
    }

    /// Handle for the restore job created from `request`.
    #[must_use]
    pub fn for_restore(request: &RestoreRequest) -> Self {
        Self {
            kind: JobKind::Restore,
            name: request.restore_name.clone(),
            volume_id: request.volume_id.clone(),
            namespace: request.namespace.clone(),
        }
    }
}

/// Operations the engine needs from the volume-management service.
pub trait ControlPlane: Send + Sync {
    /// Asks the control plane to snapshot a volume and stream it out.
    fn create_backup<'a>(&'a self, request: &'a BackupRequest) -> ControlPlaneFuture<'a, JobHandle>;

    /// Asks the control plane to restore a volume from streamed data.
    fn create_restore<'a>(
        &'a self,
        request: &'a RestoreRequest,
    ) -> ControlPlaneFuture<'a, JobHandle>;

    /// Deletes a backup. A missing backup is reported as
    /// [`ControlPlaneError::Rejected`] with status 404.
    fn delete_backup<'a>(
        &'a self,
        volume_id: &'a str,
        backup_name: &'a str,
        namespace: &'a str,
    ) -> ControlPlaneFuture<'a, ()>;

    /// Returns the current status of a job.
    fn job_status<'a>(&'a self, job: &'a JobHandle) -> ControlPlaneFuture<'a, JobStatus>;
}

#[cfg(test)]
mod tests;
