//! Delete flow: remove a backup from the control plane and the object store.

use tracing::{debug, info, instrument, warn};

use super::{OrchestratorError, SnapshotOrchestrator};
use crate::control_plane::ControlPlane;
use crate::directory::{DirectoryError, VolumeDirectory};
use crate::identifier;
use crate::model::Snapshot;
use crate::transfer::ObjectStore;

impl<C, S, D> SnapshotOrchestrator<C, S, D>
where
    C: ControlPlane + 'static,
    S: ObjectStore,
    D: VolumeDirectory,
{
    /// Deletes the snapshot named by `snapshot_id`.
    ///
    /// Snapshots taken by an earlier process are reconstructed from the
    /// identifier and the claim namespace. A backup the control plane no
    /// longer knows is treated as already deleted, so repeating a delete
    /// succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] tagged with the phase that failed. The
    /// cached snapshot is kept unless both deletions succeed.
    #[instrument(skip(self))]
    pub async fn delete_snapshot(&self, snapshot_id: &str) -> Result<(), OrchestratorError> {
        let snapshot = match self.registry.snapshot(snapshot_id) {
            Some(cached) => cached,
            None => self.reconstruct_snapshot(snapshot_id).await?,
        };
        if let Some(field) = snapshot.missing_field() {
            return Err(OrchestratorError::InsufficientMetadata { field });
        }

        match self
            .control_plane
            .delete_backup(
                &snapshot.volume_id,
                &snapshot.backup_name,
                &snapshot.namespace,
            )
            .await
        {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {
                warn!(
                    volume = %snapshot.volume_id,
                    backup = %snapshot.backup_name,
                    "control plane has no such backup; continuing"
                );
            }
            Err(err) => return Err(err.into()),
        }

        let remote_object = self
            .settings
            .namer
            .object_name(&snapshot.volume_id, &snapshot.backup_name);
        if self.data_plane.delete(&remote_object).await.is_err() {
            return Err(OrchestratorError::RemoteDeleteFailed { remote_object });
        }

        self.registry.remove_snapshot(snapshot_id);
        info!(object = %remote_object, "snapshot deleted");
        Ok(())
    }

    async fn reconstruct_snapshot(&self, snapshot_id: &str) -> Result<Snapshot, OrchestratorError> {
        let (volume_id, backup_name) = identifier::decode(snapshot_id)?;
        let namespace = match self.directory.claim_namespace(&volume_id).await {
            Ok(namespace) => namespace,
            Err(DirectoryError::MissingNamespace { .. }) => String::new(),
            Err(err) => {
                debug!(volume = %volume_id, error = %err, "claim lookup failed");
                return Err(OrchestratorError::VolumeNotFound { volume_id });
            }
        };
        Ok(Snapshot {
            volume_id,
            backup_name,
            namespace,
        })
    }
}
