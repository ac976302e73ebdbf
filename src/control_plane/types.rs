//! Wire representations of control-plane job resources.

use serde::{Deserialize, Serialize};

use crate::model::JobStatus;

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub(crate) struct Metadata {
    pub(crate) namespace: String,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BackupSpec {
    /// Backup series the control plane computes deltas within.
    pub(crate) backup_name: String,
    pub(crate) volume_name: String,
    /// Full backup request name.
    pub(crate) snap_name: String,
    /// Address the volume target streams the snapshot to.
    pub(crate) backup_dest: String,
}

/// Body of `POST /latest/backups/`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub(crate) struct BackupPayload {
    pub(crate) metadata: Metadata,
    pub(crate) spec: BackupSpec,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RestoreSpec {
    pub(crate) restore_name: String,
    pub(crate) volume_name: String,
    /// Address the volume target pulls the snapshot from.
    pub(crate) restore_src: String,
}

/// Body of `POST /latest/restore/`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub(crate) struct RestorePayload {
    pub(crate) metadata: Metadata,
    pub(crate) spec: RestoreSpec,
}

/// Job resource returned by status queries. Only the status is consumed.
#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct JobObject {
    #[serde(default)]
    pub(crate) status: JobStatus,
}
