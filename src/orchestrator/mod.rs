//! Backup, restore, and delete orchestration.
//!
//! [`SnapshotOrchestrator`] ties the control plane, the data plane, and the
//! volume directory together. Every transfer runs beside a status poller;
//! the outcome is decided from the last status the poller recorded once the
//! transfer has finished and the poller has settled.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::warn;

use crate::config::PluginConfig;
use crate::control_plane::{ControlPlane, HttpControlPlane, JobHandle, JobKind};
use crate::directory::VolumeDirectory;
use crate::model::JobStatus;
use crate::naming::RemoteNamer;
use crate::poller::{DEFAULT_POLL_INTERVAL, StatusPoller};
use crate::process::ProcessCommandRunner;
use crate::registry::{OperationGuard, Registry};
use crate::transfer::{CommandObjectStore, DataPlane, ObjectStore, TransferError};

mod backup;
mod delete;
mod discovery;
mod error;
mod restore;

pub use error::{OrchestratorError, Phase, SetupError};

/// Default upper bound on a transfer and its confirmation.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(3600);

/// Default time a job has to reach a terminal status after its transfer.
pub const DEFAULT_CONFIRM_GRACE: Duration = Duration::from_secs(30);

/// Runtime settings for the orchestrator.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OrchestratorSettings {
    /// Data mover address handed to the control plane as backup destination
    /// and restore source.
    pub server_addr: String,
    /// Interval between job status queries.
    pub poll_interval: Duration,
    /// Upper bound on transfer plus confirmation.
    pub operation_timeout: Duration,
    /// Time allowed for a terminal status after the transfer.
    pub confirm_grace: Duration,
    /// Remote object naming.
    pub namer: RemoteNamer,
}

impl OrchestratorSettings {
    /// Creates settings with default timings and no object prefix.
    #[must_use]
    pub fn new(server_addr: impl Into<String>) -> Self {
        Self {
            server_addr: server_addr.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
            confirm_grace: DEFAULT_CONFIRM_GRACE,
            namer: RemoteNamer::default(),
        }
    }

    /// Overrides the poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Overrides the operation timeout.
    #[must_use]
    pub fn with_operation_timeout(mut self, operation_timeout: Duration) -> Self {
        self.operation_timeout = operation_timeout;
        self
    }

    /// Overrides the confirmation grace period.
    #[must_use]
    pub fn with_confirm_grace(mut self, confirm_grace: Duration) -> Self {
        self.confirm_grace = confirm_grace;
        self
    }

    /// Overrides remote object naming.
    #[must_use]
    pub fn with_namer(mut self, namer: RemoteNamer) -> Self {
        self.namer = namer;
        self
    }
}

/// Coordinates snapshot operations across the control plane, the data plane,
/// and the volume directory.
#[derive(Debug)]
pub struct SnapshotOrchestrator<C, S, D> {
    control_plane: Arc<C>,
    data_plane: DataPlane<S>,
    directory: D,
    registry: Registry,
    settings: OrchestratorSettings,
}

impl<D> SnapshotOrchestrator<HttpControlPlane, CommandObjectStore<ProcessCommandRunner>, D>
where
    D: VolumeDirectory,
{
    /// Wires the REST control plane and the process-backed object store from
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError`] when the configuration is invalid or the HTTP
    /// client cannot be built.
    pub fn from_config(config: &PluginConfig, directory: D) -> Result<Self, SetupError> {
        let settings = config.settings()?;
        let control_plane =
            HttpControlPlane::new(config.control_plane_url(), config.request_timeout())?;
        let store = CommandObjectStore::with_process_runner(
            config.transfer_bin.trim(),
            settings.server_addr.clone(),
        );
        Ok(Self::new(control_plane, store, directory, settings))
    }
}

impl<C, S, D> SnapshotOrchestrator<C, S, D>
where
    C: ControlPlane + 'static,
    S: ObjectStore,
    D: VolumeDirectory,
{
    /// Creates an orchestrator with an empty registry.
    #[must_use]
    pub fn new(control_plane: C, store: S, directory: D, settings: OrchestratorSettings) -> Self {
        Self {
            control_plane: Arc::new(control_plane),
            data_plane: DataPlane::new(store),
            directory,
            registry: Registry::new(),
            settings,
        }
    }

    /// Replaces the registry, typically to share it with another component.
    #[must_use]
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    /// Registry holding the volumes and snapshots this orchestrator knows.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Active settings.
    #[must_use]
    pub const fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    fn begin(&self, volume_id: &str) -> Result<OperationGuard, OrchestratorError> {
        self.registry
            .begin_operation(volume_id)
            .ok_or_else(|| OrchestratorError::OperationInProgress {
                volume_id: volume_id.to_owned(),
            })
    }

    /// Runs `transfer` beside a poller for `job` and returns the job status
    /// recorded once the transfer finished and the poller settled.
    ///
    /// The poller is cancelled on every exit path, including the timeout.
    async fn transfer_and_confirm<F>(
        &self,
        job: JobHandle,
        transfer: F,
    ) -> Result<JobStatus, OrchestratorError>
    where
        F: Future<Output = Result<(), TransferError>>,
    {
        let volume_id = job.volume_id.clone();
        let kind = job.kind;
        let poller = StatusPoller::new(
            Arc::clone(&self.control_plane),
            self.registry.clone(),
            self.settings.poll_interval,
        )
        .spawn(job);
        let grace = self.settings.confirm_grace;
        let limit = self.settings.operation_timeout;

        let bounded = timeout(limit, async move {
            transfer.await?;
            poller.settle(grace).await;
            Ok::<(), OrchestratorError>(())
        })
        .await;

        match bounded {
            Ok(outcome) => outcome?,
            Err(_) => {
                warn!(volume = %volume_id, ?limit, "operation timed out");
                return Err(OrchestratorError::Timeout { volume_id, limit });
            }
        }

        let recorded = match kind {
            JobKind::Backup => self.registry.backup_status(&volume_id),
            JobKind::Restore => self.registry.restore_status(&volume_id),
        };
        Ok(recorded.unwrap_or_default())
    }
}
