//! Shared volume and snapshot registries.
//!
//! The orchestrator and every status poller it spawns hold clones of the same
//! [`Registry`]. All state lives behind one mutex that is never held across an
//! `.await`, and callers only ever see owned copies of the records.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::model::{JobStatus, Snapshot, Volume};

#[derive(Debug, Default)]
struct State {
    volumes: HashMap<String, Volume>,
    snapshots: HashMap<String, Snapshot>,
    in_flight: HashSet<String>,
}

/// Process-lifetime registry of volumes, snapshots, and in-flight operations.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    state: Arc<Mutex<State>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts `volume` unless a record with the same name exists. Returns
    /// `true` when the record was inserted.
    pub fn insert_volume_if_absent(&self, volume: Volume) -> bool {
        let mut state = self.lock();
        if state.volumes.contains_key(&volume.name) {
            return false;
        }
        state.volumes.insert(volume.name.clone(), volume);
        true
    }

    /// Inserts or replaces a volume record.
    pub fn upsert_volume(&self, volume: Volume) {
        self.lock().volumes.insert(volume.name.clone(), volume);
    }

    /// Returns a copy of the volume record.
    #[must_use]
    pub fn volume(&self, name: &str) -> Option<Volume> {
        self.lock().volumes.get(name).cloned()
    }

    /// Records the backup name assigned to a volume.
    pub fn set_backup_name(&self, name: &str, backup_name: &str) {
        if let Some(volume) = self.lock().volumes.get_mut(name) {
            backup_name.clone_into(&mut volume.backup_name);
        }
    }

    /// Records the latest backup job status for a volume.
    pub fn set_backup_status(&self, name: &str, status: JobStatus) {
        if let Some(volume) = self.lock().volumes.get_mut(name) {
            volume.backup_status = status;
        }
    }

    /// Records the latest restore job status for a volume.
    pub fn set_restore_status(&self, name: &str, status: JobStatus) {
        if let Some(volume) = self.lock().volumes.get_mut(name) {
            volume.restore_status = status;
        }
    }

    /// Returns the last observed backup status for a volume.
    #[must_use]
    pub fn backup_status(&self, name: &str) -> Option<JobStatus> {
        self.lock().volumes.get(name).map(|volume| volume.backup_status)
    }

    /// Returns the last observed restore status for a volume.
    #[must_use]
    pub fn restore_status(&self, name: &str) -> Option<JobStatus> {
        self.lock()
            .volumes
            .get(name)
            .map(|volume| volume.restore_status)
    }

    /// Caches a snapshot under its identifier.
    pub fn insert_snapshot(&self, id: &str, snapshot: Snapshot) {
        self.lock().snapshots.insert(id.to_owned(), snapshot);
    }

    /// Returns a copy of a cached snapshot.
    #[must_use]
    pub fn snapshot(&self, id: &str) -> Option<Snapshot> {
        self.lock().snapshots.get(id).cloned()
    }

    /// Removes a cached snapshot, returning it when present.
    pub fn remove_snapshot(&self, id: &str) -> Option<Snapshot> {
        self.lock().snapshots.remove(id)
    }

    /// Marks an operation on `volume` as in flight.
    ///
    /// Returns `None` when another operation already holds the volume. The
    /// returned guard releases the volume when dropped.
    #[must_use]
    pub fn begin_operation(&self, volume: &str) -> Option<OperationGuard> {
        if !self.lock().in_flight.insert(volume.to_owned()) {
            return None;
        }
        Some(OperationGuard {
            registry: self.clone(),
            volume: volume.to_owned(),
        })
    }

    /// Returns `true` while an operation holds `volume`.
    #[must_use]
    pub fn is_in_flight(&self, volume: &str) -> bool {
        self.lock().in_flight.contains(volume)
    }
}

/// Releases a volume's in-flight marker on drop.
#[derive(Debug)]
pub struct OperationGuard {
    registry: Registry,
    volume: String,
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        self.registry.lock().in_flight.remove(&self.volume);
    }
}
