//! Error types for snapshot orchestration.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;
use crate::control_plane::ControlPlaneError;
use crate::directory::DirectoryError;
use crate::identifier::IdentifierError;
use crate::model::{ClaimPhase, JobStatus};
use crate::transfer::TransferError;

/// Stage of an operation at which an error was raised.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    /// Input checks and local lookups before anything remote happens.
    Validation,
    /// Control-plane or directory commands.
    Command,
    /// Data movement through the object store.
    Transfer,
    /// Reading the final job status.
    Confirmation,
    /// Removing remote artefacts.
    Cleanup,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Validation => "validation",
            Self::Command => "command",
            Self::Transfer => "transfer",
            Self::Confirmation => "confirmation",
            Self::Cleanup => "cleanup",
        };
        f.write_str(text)
    }
}

/// Errors raised by backup, restore, delete, and discovery operations.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum OrchestratorError {
    /// Raised when the volume has not been discovered.
    #[error("volume {volume_id} is not known to the engine")]
    VolumeNotFound {
        /// Requested volume.
        volume_id: String,
    },
    /// Raised when the backup name is empty or whitespace.
    #[error("backup name {backup_name:?} is not usable")]
    InvalidBackupName {
        /// Rejected backup name.
        backup_name: String,
    },
    /// Raised when a restore asks for a volume kind this engine does not
    /// produce.
    #[error("volume kind {kind:?} is not supported")]
    InvalidVolumeKind {
        /// Rejected kind.
        kind: String,
    },
    /// Raised when a snapshot identifier cannot be built or parsed.
    #[error(transparent)]
    MalformedIdentifier(#[from] IdentifierError),
    /// Raised when a snapshot lacks a field needed for remote calls.
    #[error("snapshot metadata is missing {field}")]
    InsufficientMetadata {
        /// First empty field.
        field: &'static str,
    },
    /// Raised when a persistent volume is in a phase that cannot be backed up.
    #[error("volume {volume_id} is in phase {phase:?}")]
    InvalidVolume {
        /// Offending volume.
        volume_id: String,
        /// Phase reported by the cluster.
        phase: ClaimPhase,
    },
    /// Raised when the claim definition cannot be saved before a backup.
    #[error("failed to preserve claim of volume {volume_id}: {source}")]
    ClaimBackupFailed {
        /// Volume being backed up.
        volume_id: String,
        /// Directory failure.
        #[source]
        source: DirectoryError,
    },
    /// Raised when no restore target volume can be provisioned.
    #[error("failed to provision restore target for volume {volume_id}: {source}")]
    ProvisionFailed {
        /// Volume the backup was taken from.
        volume_id: String,
        /// Directory failure.
        #[source]
        source: DirectoryError,
    },
    /// Raised when the provisioned restore target names the source volume or
    /// another volume already known to the registry.
    #[error("restore target {target} for volume {volume_id} is already a known volume")]
    RestoreTargetConflict {
        /// Volume the backup was taken from.
        volume_id: String,
        /// Name returned by the directory.
        target: String,
    },
    /// Raised when the control plane cannot be reached.
    #[error("control plane unreachable: {message}")]
    ControlPlaneUnreachable {
        /// Transport error message.
        message: String,
    },
    /// Raised when the control plane refuses a command.
    #[error("control plane rejected request with HTTP {status}: {body}")]
    ControlPlaneRejected {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },
    /// Raised when a control-plane response cannot be decoded.
    #[error("unexpected control plane response: {message}")]
    ControlPlaneDecode {
        /// Decoder error message.
        message: String,
    },
    /// Raised when an upload or download fails.
    #[error(transparent)]
    TransferFailed(#[from] TransferError),
    /// Raised when the upload finished but the backup job did not report
    /// success. The uploaded object is left in place.
    #[error("backup of volume {volume_id} ended with status {status}; object {remote_object} left in place")]
    BackupNotConfirmed {
        /// Volume being backed up.
        volume_id: String,
        /// Last observed job status.
        status: JobStatus,
        /// Object written by the upload.
        remote_object: String,
    },
    /// Raised when the download finished but the restore job did not report
    /// success.
    #[error("restore into volume {volume_id} ended with status {status}")]
    RestoreNotConfirmed {
        /// Restore target volume.
        volume_id: String,
        /// Last observed job status.
        status: JobStatus,
    },
    /// Raised when the remote object of a snapshot cannot be deleted.
    #[error("failed to delete remote object {remote_object}")]
    RemoteDeleteFailed {
        /// Object that could not be removed.
        remote_object: String,
    },
    /// Raised when another operation already holds the volume.
    #[error("another operation is in progress on volume {volume_id}")]
    OperationInProgress {
        /// Busy volume.
        volume_id: String,
    },
    /// Raised when transfer and confirmation exceed the operation timeout.
    #[error("operation on volume {volume_id} timed out after {limit:?}")]
    Timeout {
        /// Volume being operated on.
        volume_id: String,
        /// Configured limit.
        limit: Duration,
    },
}

impl OrchestratorError {
    /// Returns the stage the error was raised in.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        match self {
            Self::VolumeNotFound { .. }
            | Self::InvalidBackupName { .. }
            | Self::InvalidVolumeKind { .. }
            | Self::MalformedIdentifier(_)
            | Self::InsufficientMetadata { .. }
            | Self::InvalidVolume { .. }
            | Self::OperationInProgress { .. } => Phase::Validation,
            Self::ClaimBackupFailed { .. }
            | Self::ProvisionFailed { .. }
            | Self::RestoreTargetConflict { .. }
            | Self::ControlPlaneUnreachable { .. }
            | Self::ControlPlaneRejected { .. }
            | Self::ControlPlaneDecode { .. } => Phase::Command,
            Self::TransferFailed(_) | Self::Timeout { .. } => Phase::Transfer,
            Self::BackupNotConfirmed { .. } | Self::RestoreNotConfirmed { .. } => {
                Phase::Confirmation
            }
            Self::RemoteDeleteFailed { .. } => Phase::Cleanup,
        }
    }
}

impl From<ControlPlaneError> for OrchestratorError {
    fn from(value: ControlPlaneError) -> Self {
        match value {
            ControlPlaneError::Unreachable { message } | ControlPlaneError::Client { message } => {
                Self::ControlPlaneUnreachable { message }
            }
            ControlPlaneError::Rejected { status, body } => {
                Self::ControlPlaneRejected { status, body }
            }
            ControlPlaneError::Decode { message } => Self::ControlPlaneDecode { message },
        }
    }
}

/// Errors raised while wiring an orchestrator from configuration.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum SetupError {
    /// Raised when configuration is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// Raised when the control-plane client cannot be built.
    #[error("control plane client error: {0}")]
    ControlPlane(#[from] ControlPlaneError),
}
