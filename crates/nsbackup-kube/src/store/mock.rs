//! Mock backup store for testing
//!
//! Keeps schedules and backups in memory and records every call in order,
//! useful for unit tests without requiring a Kubernetes cluster.

use async_trait::async_trait;
use nsbackup_core::BackupConfig;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::BackupStore;
use crate::error::{KubeError, Result};
use crate::velero::{Backup, Schedule, VeleroResource};

/// Store primitive, used to inject failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    GetSchedule,
    CreateSchedule,
    CreateBackup,
    DeleteSchedule,
}

/// One recorded call with the resource name it targeted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    GetSchedule(String),
    CreateSchedule(String),
    CreateBackup(String),
    DeleteSchedule(String),
}

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationCounts {
    pub gets: usize,
    pub schedule_creates: usize,
    pub backup_creates: usize,
    pub deletes: usize,
}

#[derive(Default)]
struct MockState {
    namespace: String,
    schedules: BTreeMap<String, Schedule>,
    backups: BTreeMap<String, Backup>,
    calls: Vec<StoreCall>,
    counts: OperationCounts,
    failing: HashSet<StoreOp>,
}

/// In-memory backup store for testing
#[derive(Clone)]
pub struct MockBackupStore {
    state: Arc<RwLock<MockState>>,
}

impl Default for MockBackupStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackupStore {
    /// Create a new empty mock store in the default Velero namespace
    pub fn new() -> Self {
        Self::in_namespace(BackupConfig::default().velero_namespace)
    }

    /// Create a new empty mock store standing for the given Velero namespace
    pub fn in_namespace(namespace: impl Into<String>) -> Self {
        let state = MockState {
            namespace: namespace.into(),
            ..MockState::default()
        };
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Create with pre-existing schedules
    pub fn with_schedules(schedules: Vec<Schedule>) -> Self {
        let store = Self::new();
        {
            let mut state = store.write();
            for schedule in schedules {
                state
                    .schedules
                    .insert(schedule.name().to_string(), schedule);
            }
        }
        store
    }

    /// Make every future call of `op` fail
    pub fn fail_on(&self, op: StoreOp) {
        self.write().failing.insert(op);
    }

    /// Let `op` succeed again
    pub fn recover(&self, op: StoreOp) {
        self.write().failing.remove(&op);
    }

    /// Calls made so far, in order
    pub fn calls(&self) -> Vec<StoreCall> {
        self.read().calls.clone()
    }

    /// Get operation counts for assertions
    pub fn operation_counts(&self) -> OperationCounts {
        self.read().counts.clone()
    }

    /// Reset calls and counts, keeping stored objects
    pub fn reset_counts(&self) {
        let mut state = self.write();
        state.calls.clear();
        state.counts = OperationCounts::default();
    }

    pub fn schedule(&self, name: &str) -> Option<Schedule> {
        self.read().schedules.get(name).cloned()
    }

    pub fn schedule_names(&self) -> Vec<String> {
        self.read().schedules.keys().cloned().collect()
    }

    pub fn backups(&self) -> Vec<Backup> {
        self.read().backups.values().cloned().collect()
    }

    fn read(&self) -> RwLockReadGuard<'_, MockState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MockState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the call and return the injected failure, if any
    fn record(&self, op: StoreOp, call: StoreCall) -> Result<RwLockWriteGuard<'_, MockState>> {
        let mut state = self.write();
        state.calls.push(call);
        match op {
            StoreOp::GetSchedule => state.counts.gets += 1,
            StoreOp::CreateSchedule => state.counts.schedule_creates += 1,
            StoreOp::CreateBackup => state.counts.backup_creates += 1,
            StoreOp::DeleteSchedule => state.counts.deletes += 1,
        }
        if state.failing.contains(&op) {
            return Err(KubeError::Store(format!("injected {:?} failure", op)));
        }
        Ok(state)
    }
}

#[async_trait]
impl BackupStore for MockBackupStore {
    async fn schedule_exists(&self, name: &str) -> Result<bool> {
        let state = self.record(StoreOp::GetSchedule, StoreCall::GetSchedule(name.to_string()))?;
        Ok(state.schedules.contains_key(name))
    }

    async fn create_schedule(&self, schedule: &Schedule) -> Result<()> {
        let name = schedule.name().to_string();
        let mut state =
            self.record(StoreOp::CreateSchedule, StoreCall::CreateSchedule(name.clone()))?;
        if state.schedules.contains_key(&name) {
            return Err(KubeError::AlreadyExists {
                kind: Schedule::KIND.to_string(),
                name,
            });
        }
        state.schedules.insert(name, schedule.clone());
        Ok(())
    }

    async fn create_backup(&self, backup: &Backup) -> Result<()> {
        let name = backup.name().to_string();
        let mut state = self.record(StoreOp::CreateBackup, StoreCall::CreateBackup(name.clone()))?;
        if state.backups.contains_key(&name) {
            return Err(KubeError::AlreadyExists {
                kind: Backup::KIND.to_string(),
                name,
            });
        }
        state.backups.insert(name, backup.clone());
        Ok(())
    }

    async fn delete_schedule(&self, name: &str) -> Result<()> {
        let mut state =
            self.record(StoreOp::DeleteSchedule, StoreCall::DeleteSchedule(name.to_string()))?;
        match state.schedules.remove(name) {
            Some(_) => Ok(()),
            None => Err(KubeError::ScheduleNotFound {
                name: name.to_string(),
                namespace: state.namespace.clone(),
            }),
        }
    }
}
