//! Test support utilities shared across unit and integration tests.
//!
//! The doubles here are cheap to clone and share their state, so a test can
//! hand one copy to the orchestrator and keep another for assertions.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::env;
use std::ffi::OsString;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::control_plane::{
    BackupRequest, ControlPlane, ControlPlaneError, ControlPlaneFuture, JobHandle, RestoreRequest,
};
use crate::directory::{DirectoryError, DirectoryFuture, VolumeDirectory};
use crate::model::{JobStatus, Volume};
use crate::process::{CommandFuture, CommandOutput, CommandRunner, ProcessError};
use crate::transfer::{ObjectStore, TransferFuture};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scripted command runner that returns pre-seeded outputs in FIFO order.
///
/// Used to drive deterministic data-mover outcomes without spawning
/// processes. An empty queue reports a spawn failure.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRunner {
    responses: Arc<Mutex<VecDeque<CommandOutput>>>,
    invocations: Arc<Mutex<Vec<CommandInvocation>>>,
}

/// Records a single invocation made through [`ScriptedRunner`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandInvocation {
    /// Program name as passed to the runner.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<OsString>,
}

impl ScriptedRunner {
    /// Creates a new runner with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all invocations recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<CommandInvocation> {
        lock(&self.invocations).clone()
    }

    /// Pushes a successful exit status.
    pub fn push_success(&self) {
        self.push_output(Some(0), "", "");
    }

    /// Pushes a failing exit code with stderr text.
    pub fn push_failure(&self, code: i32) {
        self.push_output(Some(code), "", "simulated failure");
    }

    /// Pushes an explicit command output response.
    pub fn push_output(
        &self,
        code: Option<i32>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) {
        lock(&self.responses).push_back(CommandOutput {
            code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        });
    }
}

impl CommandRunner for ScriptedRunner {
    fn run<'a>(&'a self, program: &'a str, args: &'a [OsString]) -> CommandFuture<'a> {
        lock(&self.invocations).push(CommandInvocation {
            program: program.to_owned(),
            args: args.to_vec(),
        });
        let response = lock(&self.responses)
            .pop_front()
            .ok_or_else(|| ProcessError::Spawn {
                program: program.to_owned(),
                message: String::from("no scripted response available"),
            });
        Box::pin(std::future::ready(response))
    }
}

/// Delete call recorded by [`ScriptedControlPlane`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeleteCall {
    /// Volume the backup belongs to.
    pub volume_id: String,
    /// Backup name.
    pub backup_name: String,
    /// Claim namespace.
    pub namespace: String,
}

#[derive(Debug, Default)]
struct ControlPlaneState {
    backups: Vec<BackupRequest>,
    restores: Vec<RestoreRequest>,
    deletes: Vec<DeleteCall>,
    statuses: VecDeque<JobStatus>,
    last_status: Option<JobStatus>,
    status_failures: VecDeque<ControlPlaneError>,
    status_queries: usize,
    backup_failure: Option<ControlPlaneError>,
    restore_failure: Option<ControlPlaneError>,
    delete_failure: Option<ControlPlaneError>,
}

/// Control plane double that records commands and replays scripted job
/// statuses.
///
/// Statuses are served in FIFO order; once the queue is empty the last
/// served status repeats. With nothing scripted every query reports
/// [`JobStatus::Pending`].
#[derive(Clone, Debug, Default)]
pub struct ScriptedControlPlane {
    state: Arc<Mutex<ControlPlaneState>>,
}

impl ScriptedControlPlane {
    /// Creates a control plane that accepts every command.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues statuses returned by successive status queries.
    pub fn push_statuses(&self, statuses: impl IntoIterator<Item = JobStatus>) {
        lock(&self.state).statuses.extend(statuses);
    }

    /// Makes the next status query fail with `err`.
    pub fn fail_next_status(&self, err: ControlPlaneError) {
        lock(&self.state).status_failures.push_back(err);
    }

    /// Makes every backup command fail with `err`.
    pub fn fail_backups(&self, err: ControlPlaneError) {
        lock(&self.state).backup_failure = Some(err);
    }

    /// Makes every restore command fail with `err`.
    pub fn fail_restores(&self, err: ControlPlaneError) {
        lock(&self.state).restore_failure = Some(err);
    }

    /// Makes every delete command fail with `err`.
    pub fn fail_deletes(&self, err: ControlPlaneError) {
        lock(&self.state).delete_failure = Some(err);
    }

    /// Backup commands received so far.
    #[must_use]
    pub fn backup_requests(&self) -> Vec<BackupRequest> {
        lock(&self.state).backups.clone()
    }

    /// Restore commands received so far.
    #[must_use]
    pub fn restore_requests(&self) -> Vec<RestoreRequest> {
        lock(&self.state).restores.clone()
    }

    /// Delete commands received so far.
    #[must_use]
    pub fn delete_calls(&self) -> Vec<DeleteCall> {
        lock(&self.state).deletes.clone()
    }

    /// Number of status queries served.
    #[must_use]
    pub fn status_queries(&self) -> usize {
        lock(&self.state).status_queries
    }

    /// Total number of commands received, excluding status queries.
    #[must_use]
    pub fn command_count(&self) -> usize {
        let state = lock(&self.state);
        state.backups.len() + state.restores.len() + state.deletes.len()
    }
}

impl ControlPlane for ScriptedControlPlane {
    fn create_backup<'a>(&'a self, request: &'a BackupRequest) -> ControlPlaneFuture<'a, JobHandle> {
        Box::pin(async move {
            let mut state = lock(&self.state);
            state.backups.push(request.clone());
            state
                .backup_failure
                .clone()
                .map_or_else(|| Ok(JobHandle::for_backup(request)), Err)
        })
    }

    fn create_restore<'a>(
        &'a self,
        request: &'a RestoreRequest,
    ) -> ControlPlaneFuture<'a, JobHandle> {
        Box::pin(async move {
            let mut state = lock(&self.state);
            state.restores.push(request.clone());
            state
                .restore_failure
                .clone()
                .map_or_else(|| Ok(JobHandle::for_restore(request)), Err)
        })
    }

    fn delete_backup<'a>(
        &'a self,
        volume_id: &'a str,
        backup_name: &'a str,
        namespace: &'a str,
    ) -> ControlPlaneFuture<'a, ()> {
        Box::pin(async move {
            let mut state = lock(&self.state);
            state.deletes.push(DeleteCall {
                volume_id: volume_id.to_owned(),
                backup_name: backup_name.to_owned(),
                namespace: namespace.to_owned(),
            });
            state.delete_failure.clone().map_or(Ok(()), Err)
        })
    }

    fn job_status<'a>(&'a self, _job: &'a JobHandle) -> ControlPlaneFuture<'a, JobStatus> {
        Box::pin(async move {
            let mut state = lock(&self.state);
            state.status_queries += 1;
            if let Some(err) = state.status_failures.pop_front() {
                return Err(err);
            }
            let status = state
                .statuses
                .pop_front()
                .or(state.last_status)
                .unwrap_or_default();
            state.last_status = Some(status);
            Ok(status)
        })
    }
}

#[derive(Debug, Default)]
struct StoreState {
    objects: BTreeSet<String>,
    uploads: Vec<String>,
    downloads: Vec<String>,
    deletes: Vec<String>,
    fail_uploads: bool,
    fail_downloads: bool,
    fail_deletes: bool,
    held: bool,
}

/// In-memory object store.
///
/// Uploads add the object, downloads require it, and deletes succeed whether
/// or not it exists. Transfers can be held open with
/// [`MemoryObjectStore::hold_transfers`] to exercise concurrency and
/// timeouts.
#[derive(Clone, Debug, Default)]
pub struct MemoryObjectStore {
    state: Arc<Mutex<StoreState>>,
    released: Arc<Notify>,
}

impl MemoryObjectStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an object, as if uploaded by an earlier process.
    pub fn insert_object(&self, name: impl Into<String>) {
        lock(&self.state).objects.insert(name.into());
    }

    /// Returns `true` when `name` is stored.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        lock(&self.state).objects.contains(name)
    }

    /// Objects currently stored.
    #[must_use]
    pub fn objects(&self) -> Vec<String> {
        lock(&self.state).objects.iter().cloned().collect()
    }

    /// Upload attempts so far.
    #[must_use]
    pub fn uploads(&self) -> Vec<String> {
        lock(&self.state).uploads.clone()
    }

    /// Download attempts so far.
    #[must_use]
    pub fn downloads(&self) -> Vec<String> {
        lock(&self.state).downloads.clone()
    }

    /// Delete attempts so far.
    #[must_use]
    pub fn deletes(&self) -> Vec<String> {
        lock(&self.state).deletes.clone()
    }

    /// Makes every upload fail.
    pub fn fail_uploads(&self) {
        lock(&self.state).fail_uploads = true;
    }

    /// Makes every download fail.
    pub fn fail_downloads(&self) {
        lock(&self.state).fail_downloads = true;
    }

    /// Makes every delete fail.
    pub fn fail_deletes(&self) {
        lock(&self.state).fail_deletes = true;
    }

    /// Holds uploads and downloads open until [`Self::release_transfers`].
    pub fn hold_transfers(&self) {
        lock(&self.state).held = true;
    }

    /// Lets held and future transfers complete.
    pub fn release_transfers(&self) {
        lock(&self.state).held = false;
        self.released.notify_waiters();
    }

    async fn wait_until_released(&self) {
        loop {
            let released = self.released.notified();
            if !lock(&self.state).held {
                return;
            }
            released.await;
        }
    }
}

impl ObjectStore for MemoryObjectStore {
    fn upload<'a>(&'a self, remote_name: &'a str) -> TransferFuture<'a> {
        Box::pin(async move {
            lock(&self.state).uploads.push(remote_name.to_owned());
            self.wait_until_released().await;
            let mut state = lock(&self.state);
            if state.fail_uploads {
                return false;
            }
            state.objects.insert(remote_name.to_owned());
            true
        })
    }

    fn download<'a>(&'a self, remote_name: &'a str) -> TransferFuture<'a> {
        Box::pin(async move {
            lock(&self.state).downloads.push(remote_name.to_owned());
            self.wait_until_released().await;
            let state = lock(&self.state);
            !state.fail_downloads && state.objects.contains(remote_name)
        })
    }

    fn delete<'a>(&'a self, remote_name: &'a str) -> TransferFuture<'a> {
        Box::pin(async move {
            let mut state = lock(&self.state);
            state.deletes.push(remote_name.to_owned());
            if state.fail_deletes {
                return false;
            }
            state.objects.remove(remote_name);
            true
        })
    }
}

#[derive(Debug, Default)]
struct DirectoryState {
    namespaces: HashMap<String, String>,
    preserved: Vec<String>,
    provisioned: Vec<(String, String)>,
    restore_target: Option<Volume>,
    preserve_failure: Option<DirectoryError>,
    provision_failure: Option<DirectoryError>,
}

/// In-memory volume directory.
///
/// Restore targets default to `<volume>-restored` in the source volume's
/// claim namespace (or `default` when the source is unknown).
#[derive(Clone, Debug, Default)]
pub struct MemoryDirectory {
    state: Arc<Mutex<DirectoryState>>,
}

impl MemoryDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a claim namespace for `volume_id`.
    #[must_use]
    pub fn with_claim(self, volume_id: impl Into<String>, namespace: impl Into<String>) -> Self {
        self.add_claim(volume_id, namespace);
        self
    }

    /// Registers a claim namespace for `volume_id` on a shared directory.
    pub fn add_claim(&self, volume_id: impl Into<String>, namespace: impl Into<String>) {
        lock(&self.state)
            .namespaces
            .insert(volume_id.into(), namespace.into());
    }

    /// Fixes the volume returned by the next restore provisioning.
    pub fn set_restore_target(&self, volume: Volume) {
        lock(&self.state).restore_target = Some(volume);
    }

    /// Makes claim preservation fail with `err`.
    pub fn fail_preserve(&self, err: DirectoryError) {
        lock(&self.state).preserve_failure = Some(err);
    }

    /// Makes restore provisioning fail with `err`.
    pub fn fail_provision(&self, err: DirectoryError) {
        lock(&self.state).provision_failure = Some(err);
    }

    /// Volumes whose claim definitions were preserved.
    #[must_use]
    pub fn preserved_claims(&self) -> Vec<String> {
        lock(&self.state).preserved.clone()
    }

    /// `(volume_id, backup_name)` pairs restore targets were provisioned for.
    #[must_use]
    pub fn provisioned_targets(&self) -> Vec<(String, String)> {
        lock(&self.state).provisioned.clone()
    }
}

impl VolumeDirectory for MemoryDirectory {
    fn preserve_claim<'a>(&'a self, volume: &'a Volume) -> DirectoryFuture<'a, ()> {
        Box::pin(async move {
            let mut state = lock(&self.state);
            if let Some(err) = state.preserve_failure.clone() {
                return Err(err);
            }
            state.preserved.push(volume.name.clone());
            Ok(())
        })
    }

    fn provision_restore_target<'a>(
        &'a self,
        volume_id: &'a str,
        backup_name: &'a str,
    ) -> DirectoryFuture<'a, Volume> {
        Box::pin(async move {
            let mut state = lock(&self.state);
            if let Some(err) = state.provision_failure.clone() {
                return Err(err);
            }
            state
                .provisioned
                .push((volume_id.to_owned(), backup_name.to_owned()));
            let target = state.restore_target.take().unwrap_or_else(|| {
                let namespace = state
                    .namespaces
                    .get(volume_id)
                    .cloned()
                    .unwrap_or_else(|| String::from("default"));
                Volume::new(format!("{volume_id}-restored"), namespace, "openebs-cstor")
            });
            state
                .namespaces
                .insert(target.name.clone(), target.namespace.clone());
            Ok(target)
        })
    }

    fn claim_namespace<'a>(&'a self, volume_id: &'a str) -> DirectoryFuture<'a, String> {
        Box::pin(async move {
            lock(&self.state)
                .namespaces
                .get(volume_id)
                .cloned()
                .ok_or_else(|| DirectoryError::NotFound {
                    volume_id: volume_id.to_owned(),
                })
        })
    }
}

static ENV_LOCK: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());

/// Guard that holds the environment mutex and restores variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: tokio::sync::MutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets environment variables while holding a process-wide mutex.
    pub async fn set_vars(pairs: &[(&str, &str)]) -> Self {
        let guard = ENV_LOCK.lock().await;
        let previous = pairs
            .iter()
            .map(|(key, value)| {
                let old = env::var_os(key);
                // SAFETY: Environment mutation is serialised by `ENV_LOCK`.
                unsafe { env::set_var(key, value) };
                ((*key).to_owned(), old)
            })
            .collect();
        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(value) => env::set_var(key, value),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
