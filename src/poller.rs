//! Background polling of remote job status.
//!
//! A poller runs beside the data transfer and records every status it
//! observes in the shared [`Registry`]. It never decides whether the operation
//! succeeded; the orchestrator reads the registry once the transfer is over.
//! Each poller is tied to a [`CancellationToken`] that is cancelled when its
//! [`PollerHandle`] is settled or dropped, so no task outlives the operation
//! that started it.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

use crate::control_plane::{ControlPlane, JobHandle, JobKind};
use crate::model::JobStatus;
use crate::registry::Registry;

/// Default interval between status queries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Spawns status pollers for remote jobs.
#[derive(Debug)]
pub struct StatusPoller<C> {
    control_plane: Arc<C>,
    registry: Registry,
    interval: Duration,
}

impl<C> StatusPoller<C>
where
    C: ControlPlane + 'static,
{
    /// Creates a poller factory writing into `registry`.
    #[must_use]
    pub const fn new(control_plane: Arc<C>, registry: Registry, interval: Duration) -> Self {
        Self {
            control_plane,
            registry,
            interval,
        }
    }

    /// Starts polling `job` on the current runtime.
    ///
    /// The first query is issued immediately. Backup statuses are written to
    /// the job volume's `backup_status`, restore statuses to its
    /// `restore_status`.
    #[must_use]
    pub fn spawn(&self, job: JobHandle) -> PollerHandle {
        let token = CancellationToken::new();
        let task = tokio::spawn(poll(
            Arc::clone(&self.control_plane),
            self.registry.clone(),
            job,
            self.interval,
            token.clone(),
        ));
        PollerHandle {
            task,
            token: token.clone(),
            _cancel_on_drop: token.drop_guard(),
        }
    }
}

/// Handle to a running poller. Dropping it cancels the poller.
#[derive(Debug)]
pub struct PollerHandle {
    task: JoinHandle<Option<JobStatus>>,
    token: CancellationToken,
    _cancel_on_drop: DropGuard,
}

impl PollerHandle {
    /// Gives the poller up to `grace` to observe a terminal status, then
    /// cancels it and waits for the task to exit.
    ///
    /// Returns the last status the poller observed, if any.
    pub async fn settle(self, grace: Duration) -> Option<JobStatus> {
        let Self {
            mut task,
            token,
            _cancel_on_drop,
        } = self;

        if let Ok(joined) = timeout(grace, &mut task).await {
            return joined.unwrap_or_else(|err| {
                warn!(error = %err, "status poller task failed");
                None
            });
        }

        token.cancel();
        task.await.unwrap_or_else(|err| {
            warn!(error = %err, "status poller task failed");
            None
        })
    }
}

async fn poll<C>(
    control_plane: Arc<C>,
    registry: Registry,
    job: JobHandle,
    interval: Duration,
    token: CancellationToken,
) -> Option<JobStatus>
where
    C: ControlPlane,
{
    let mut last = None;
    loop {
        let polled = tokio::select! {
            biased;
            () = token.cancelled() => break,
            result = control_plane.job_status(&job) => result,
        };

        match polled {
            Ok(status) => {
                debug!(volume = %job.volume_id, job = %job.name, %status, "polled job status");
                record(&registry, &job, status);
                last = Some(status);
                if status.is_terminal() {
                    info!(volume = %job.volume_id, job = %job.name, %status, "job reached terminal state");
                    break;
                }
            }
            Err(err) => {
                warn!(volume = %job.volume_id, job = %job.name, error = %err, "status query failed");
            }
        }

        tokio::select! {
            biased;
            () = token.cancelled() => break,
            () = sleep(interval) => {}
        }
    }
    last
}

fn record(registry: &Registry, job: &JobHandle, status: JobStatus) {
    match job.kind {
        JobKind::Backup => registry.set_backup_status(&job.volume_id, status),
        JobKind::Restore => registry.set_restore_status(&job.volume_id, status),
    }
}
