//! Restore flow: provision a volume and stream a backup into it.

use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{OrchestratorError, SnapshotOrchestrator};
use crate::control_plane::{ControlPlane, RestoreRequest};
use crate::directory::VolumeDirectory;
use crate::identifier;
use crate::model::{JobStatus, VOLUME_KIND};
use crate::transfer::ObjectStore;

impl<C, S, D> SnapshotOrchestrator<C, S, D>
where
    C: ControlPlane + 'static,
    S: ObjectStore,
    D: VolumeDirectory,
{
    /// Restores the snapshot named by `snapshot_id` into a newly provisioned
    /// volume and returns that volume's name.
    ///
    /// Data is read from the object written by the original backup, so the
    /// remote name is derived from the volume the backup was taken of, not
    /// from the restore target.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] tagged with the phase that failed.
    #[instrument(skip(self), fields(operation = %Uuid::new_v4()))]
    pub async fn create_volume_from_snapshot(
        &self,
        snapshot_id: &str,
        volume_kind: &str,
    ) -> Result<String, OrchestratorError> {
        if volume_kind != VOLUME_KIND {
            return Err(OrchestratorError::InvalidVolumeKind {
                kind: volume_kind.to_owned(),
            });
        }
        let (volume_id, backup_name) = identifier::decode(snapshot_id)?;

        let mut target = self
            .directory
            .provision_restore_target(&volume_id, &backup_name)
            .await
            .map_err(|source| OrchestratorError::ProvisionFailed {
                volume_id: volume_id.clone(),
                source,
            })?;
        if target.name.trim().is_empty() {
            return Err(OrchestratorError::InsufficientMetadata { field: "volume_id" });
        }
        if target.namespace.trim().is_empty() {
            return Err(OrchestratorError::InsufficientMetadata { field: "namespace" });
        }

        let _guard = self.begin(&target.name).inspect_err(|_| {
            warn!(
                volume = %volume_id,
                target = %target.name,
                "restore target busy; provisioned volume left behind"
            );
        })?;
        if target.name == volume_id || self.registry.volume(&target.name).is_some() {
            warn!(
                volume = %volume_id,
                target = %target.name,
                "restore target collides with a known volume; provisioned volume left behind"
            );
            return Err(OrchestratorError::RestoreTargetConflict {
                volume_id,
                target: target.name,
            });
        }
        target.restore_status = JobStatus::Pending;
        self.registry.upsert_volume(target.clone());

        let request = RestoreRequest {
            volume_id: target.name.clone(),
            restore_name: backup_name.clone(),
            source: self.settings.server_addr.clone(),
            namespace: target.namespace.clone(),
        };
        let job = self.control_plane.create_restore(&request).await?;
        info!(
            volume = %volume_id,
            target = %target.name,
            backup = %backup_name,
            "restore job accepted"
        );

        let remote_object = self.settings.namer.object_name(&volume_id, &backup_name);
        let status = self
            .transfer_and_confirm(job, self.data_plane.download(&remote_object))
            .await?;

        if !status.is_success() {
            warn!(target = %target.name, %status, "restore not confirmed");
            return Err(OrchestratorError::RestoreNotConfirmed {
                volume_id: target.name,
                status,
            });
        }

        info!(target = %target.name, object = %remote_object, "restore completed");
        Ok(target.name)
    }
}
