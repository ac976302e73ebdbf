//! Cluster-side volume directory.
//!
//! The host cluster owns persistent volumes and their claims. The engine only
//! needs three things from it: to save a claim definition next to a backup, to
//! provision a fresh volume for a restore, and to look up the namespace of the
//! claim bound to a volume.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::model::Volume;

/// Future returned by directory operations.
pub type DirectoryFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, DirectoryError>> + Send + 'a>>;

/// Errors raised by the volume directory.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum DirectoryError {
    /// The cluster has no volume with this name.
    #[error("volume {volume_id} not found")]
    NotFound {
        /// Volume that was looked up.
        volume_id: String,
    },
    /// The volume exists but no claim is bound to it.
    #[error("volume {volume_id} has no bound claim")]
    MissingNamespace {
        /// Volume that was looked up.
        volume_id: String,
    },
    /// Any other failure reported by the cluster.
    #[error("volume directory failed: {message}")]
    Provider {
        /// Provider supplied message.
        message: String,
    },
}

/// Claim and volume operations the engine delegates to the host cluster.
pub trait VolumeDirectory: Send + Sync {
    /// Saves the definition of the claim bound to `volume` so a restore can
    /// recreate it.
    fn preserve_claim<'a>(&'a self, volume: &'a Volume) -> DirectoryFuture<'a, ()>;

    /// Provisions an empty volume to receive data from `backup_name` taken of
    /// `volume_id`. The returned record names the new volume and the
    /// namespace of its claim.
    fn provision_restore_target<'a>(
        &'a self,
        volume_id: &'a str,
        backup_name: &'a str,
    ) -> DirectoryFuture<'a, Volume>;

    /// Returns the namespace of the claim bound to `volume_id`.
    fn claim_namespace<'a>(&'a self, volume_id: &'a str) -> DirectoryFuture<'a, String>;
}
