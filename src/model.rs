//! Volume, snapshot, and job records tracked by the engine.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Volume kind reported to the host and accepted on restore.
pub const VOLUME_KIND: &str = "cstor-snapshot";

/// Storage engine type understood by the control plane.
pub const CAS_TYPE_CSTOR: &str = "cstor";

/// Label carrying the storage engine type on persistent volumes.
pub const CAS_TYPE_LABEL: &str = "openebs.io/cas-type";

/// Status of a remote backup or restore job.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum JobStatus {
    /// Job accepted but not started.
    #[default]
    #[serde(alias = "Init")]
    Pending,
    /// Job is moving data.
    InProgress,
    /// Job completed successfully.
    Done,
    /// Job failed on the control plane.
    Failed,
    /// Control plane rejected the job definition.
    Invalid,
    /// Status string the engine does not recognise.
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// Returns `true` once no further progress can occur.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Invalid)
    }

    /// Returns `true` only for the terminal success state.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Done)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Pending => "Pending",
            Self::InProgress => "InProgress",
            Self::Done => "Done",
            Self::Failed => "Failed",
            Self::Invalid => "Invalid",
            Self::Unknown => "Unknown",
        };
        f.write_str(text)
    }
}

/// Storage volume known to the engine.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Volume {
    /// Stable volume identifier (the persistent volume name).
    pub name: String,
    /// Namespace of the claim bound to the volume.
    pub namespace: String,
    /// Storage class the volume was provisioned from.
    pub cas_type: String,
    /// Last backup request name assigned to this volume.
    pub backup_name: String,
    /// Last observed backup job status.
    pub backup_status: JobStatus,
    /// Last observed restore job status.
    pub restore_status: JobStatus,
}

impl Volume {
    /// Creates a volume record with no backup history.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        cas_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            cas_type: cas_type.into(),
            backup_name: String::new(),
            backup_status: JobStatus::default(),
            restore_status: JobStatus::default(),
        }
    }

    /// Sets the backup name carried by the record.
    #[must_use]
    pub fn with_backup_name(mut self, backup_name: impl Into<String>) -> Self {
        self.backup_name = backup_name.into();
        self
    }
}

/// One backup unit of work.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Snapshot {
    /// Volume the backup was taken from.
    pub volume_id: String,
    /// Backup request name.
    pub backup_name: String,
    /// Namespace of the claim bound to the volume.
    pub namespace: String,
}

impl Snapshot {
    /// Returns the name of the first empty field, if any.
    #[must_use]
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("volume_id", &self.volume_id),
            ("backup_name", &self.backup_name),
            ("namespace", &self.namespace),
        ]
        .into_iter()
        .find_map(|(field, value)| value.trim().is_empty().then_some(field))
    }
}

/// Lifecycle phase of a persistent volume.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ClaimPhase {
    /// Available for binding.
    Available,
    /// Bound to a claim.
    #[default]
    Bound,
    /// Claim deleted; volume awaiting reclamation.
    Released,
    /// Automatic reclamation failed.
    Failed,
    /// Not yet available.
    Pending,
}

/// Minimal persistent volume fields needed to recognise an engine volume.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ClaimInfo {
    /// Persistent volume name.
    pub name: String,
    /// Storage class name.
    pub storage_class: String,
    /// Namespace of the bound claim, when a claim reference exists.
    pub claim_namespace: Option<String>,
    /// Labels on the persistent volume.
    pub labels: BTreeMap<String, String>,
    /// Current phase of the persistent volume.
    pub phase: ClaimPhase,
}
