//! Backup flow: snapshot a volume and stream it to the object store.

use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{OrchestratorError, SnapshotOrchestrator};
use crate::control_plane::{BackupRequest, ControlPlane};
use crate::directory::VolumeDirectory;
use crate::identifier;
use crate::model::{JobStatus, Snapshot};
use crate::naming::backup_base_name;
use crate::transfer::ObjectStore;

impl<C, S, D> SnapshotOrchestrator<C, S, D>
where
    C: ControlPlane + 'static,
    S: ObjectStore,
    D: VolumeDirectory,
{
    /// Backs up `volume_id` under `backup_name` and returns the snapshot
    /// identifier.
    ///
    /// The volume must have been discovered first. The snapshot is cached
    /// only when the control plane confirms the job as done.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] tagged with the phase that failed. When
    /// the upload succeeded but the job did not, the error is
    /// [`OrchestratorError::BackupNotConfirmed`] and the uploaded object is
    /// left in place.
    #[instrument(skip(self), fields(operation = %Uuid::new_v4()))]
    pub async fn create_snapshot(
        &self,
        volume_id: &str,
        backup_name: &str,
    ) -> Result<String, OrchestratorError> {
        let record = self
            .registry
            .volume(volume_id)
            .ok_or_else(|| OrchestratorError::VolumeNotFound {
                volume_id: volume_id.to_owned(),
            })?;
        if backup_name.trim().is_empty() {
            return Err(OrchestratorError::InvalidBackupName {
                backup_name: backup_name.to_owned(),
            });
        }
        let snapshot_id = identifier::encode(volume_id, backup_name)?;
        let _guard = self.begin(volume_id)?;

        self.registry.set_backup_name(volume_id, backup_name);
        self.registry.set_backup_status(volume_id, JobStatus::Pending);
        let volume = record.with_backup_name(backup_name);

        self.directory
            .preserve_claim(&volume)
            .await
            .map_err(|source| OrchestratorError::ClaimBackupFailed {
                volume_id: volume_id.to_owned(),
                source,
            })?;

        let request = BackupRequest {
            volume_id: volume_id.to_owned(),
            backup_base_name: backup_base_name(backup_name).to_owned(),
            snapshot_name: backup_name.to_owned(),
            destination: self.settings.server_addr.clone(),
            namespace: volume.namespace.clone(),
        };
        let job = self.control_plane.create_backup(&request).await?;
        info!(volume = volume_id, backup = backup_name, "backup job accepted");

        let remote_object = self.settings.namer.object_name(volume_id, backup_name);
        let status = self
            .transfer_and_confirm(job, self.data_plane.upload(&remote_object))
            .await?;

        if !status.is_success() {
            warn!(
                volume = volume_id,
                backup = backup_name,
                object = %remote_object,
                %status,
                "backup not confirmed; uploaded object left in place"
            );
            return Err(OrchestratorError::BackupNotConfirmed {
                volume_id: volume_id.to_owned(),
                status,
                remote_object,
            });
        }

        self.registry.insert_snapshot(
            &snapshot_id,
            Snapshot {
                volume_id: volume_id.to_owned(),
                backup_name: backup_name.to_owned(),
                namespace: volume.namespace,
            },
        );
        info!(volume = volume_id, snapshot = %snapshot_id, "backup completed");
        Ok(snapshot_id)
    }
}
