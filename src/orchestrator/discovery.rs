//! Volume discovery and volume info lookups.

use tracing::debug;

use super::{OrchestratorError, SnapshotOrchestrator};
use crate::control_plane::ControlPlane;
use crate::directory::VolumeDirectory;
use crate::model::{CAS_TYPE_CSTOR, CAS_TYPE_LABEL, ClaimInfo, ClaimPhase, VOLUME_KIND, Volume};
use crate::transfer::ObjectStore;

impl<C, S, D> SnapshotOrchestrator<C, S, D>
where
    C: ControlPlane + 'static,
    S: ObjectStore,
    D: VolumeDirectory,
{
    /// Registers the volume described by `claim` when it belongs to this
    /// engine and returns its name.
    ///
    /// Returns `Ok(None)` for volumes another engine manages or that lack the
    /// fields needed to build a record. Re-discovering a known volume keeps
    /// its existing record.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::InvalidVolume`] when the volume is
    /// released or failed.
    pub fn discover_volume(&self, claim: &ClaimInfo) -> Result<Option<String>, OrchestratorError> {
        if claim.name.trim().is_empty() || claim.storage_class.trim().is_empty() {
            debug!(volume = %claim.name, "volume lacks name or storage class");
            return Ok(None);
        }
        let Some(namespace) = claim
            .claim_namespace
            .as_deref()
            .filter(|namespace| !namespace.trim().is_empty())
        else {
            debug!(volume = %claim.name, "volume has no bound claim");
            return Ok(None);
        };
        if claim.labels.get(CAS_TYPE_LABEL).map(String::as_str) != Some(CAS_TYPE_CSTOR) {
            debug!(volume = %claim.name, "volume is not managed by this engine");
            return Ok(None);
        }
        if matches!(claim.phase, ClaimPhase::Released | ClaimPhase::Failed) {
            return Err(OrchestratorError::InvalidVolume {
                volume_id: claim.name.clone(),
                phase: claim.phase,
            });
        }

        if self.registry.insert_volume_if_absent(Volume::new(
            claim.name.as_str(),
            namespace,
            claim.storage_class.as_str(),
        )) {
            debug!(volume = %claim.name, namespace, "volume registered");
        }
        Ok(Some(claim.name.clone()))
    }

    /// Returns the volume kind and provisioned IOPS for `volume_id`.
    ///
    /// Every volume this engine manages reports the snapshot kind and no
    /// IOPS figure.
    #[must_use]
    pub fn volume_info(&self, volume_id: &str) -> (&'static str, Option<i64>) {
        debug!(volume = volume_id, "volume info requested");
        (VOLUME_KIND, None)
    }
}
