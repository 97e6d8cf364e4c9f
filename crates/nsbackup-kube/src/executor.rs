//! Lifecycle action execution
//!
//! Turns decided [`Action`]s into backup store calls. Actions run in order
//! and the first failure aborts the rest. Nothing already done is rolled
//! back: a schedule created before a failed backup stays in place and the
//! next enrollment finds it.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use nsbackup_core::{Action, BackupConfig};
use tracing::{debug, info, warn};

use crate::error::{ExecutionError, KubeError, Step};
use crate::store::BackupStore;
use crate::velero::{Backup, Schedule, VeleroResource};

/// Source of backup timestamps
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// What a run of actions did to the backup store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    pub schedules_created: Vec<String>,
    pub schedules_existing: Vec<String>,
    pub backups_created: Vec<String>,
    pub schedules_deleted: Vec<String>,
    pub schedules_missing: Vec<String>,
}

impl ExecutionReport {
    pub fn is_empty(&self) -> bool {
        self.schedules_created.is_empty()
            && self.schedules_existing.is_empty()
            && self.backups_created.is_empty()
            && self.schedules_deleted.is_empty()
            && self.schedules_missing.is_empty()
    }
}

impl fmt::Display for ExecutionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "no changes");
        }
        let parts = [
            ("schedules created", &self.schedules_created),
            ("schedules already present", &self.schedules_existing),
            ("backups created", &self.backups_created),
            ("schedules deleted", &self.schedules_deleted),
            ("schedules already absent", &self.schedules_missing),
        ];
        let rendered: Vec<String> = parts
            .iter()
            .filter(|(_, names)| !names.is_empty())
            .map(|(label, names)| format!("{}: {}", label, names.join(", ")))
            .collect();
        write!(f, "{}", rendered.join("; "))
    }
}

/// Executes lifecycle actions against a shared backup store
#[derive(Clone)]
pub struct LifecycleExecutor {
    store: Arc<dyn BackupStore>,
    config: Arc<BackupConfig>,
    clock: Clock,
}

impl LifecycleExecutor {
    pub fn new(store: Arc<dyn BackupStore>, config: Arc<BackupConfig>) -> Self {
        Self {
            store,
            config,
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the wall clock used for backup names
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn config(&self) -> &BackupConfig {
        &self.config
    }

    /// Run `actions` for `namespace` in order, stopping at the first error
    pub async fn execute(
        &self,
        namespace: &str,
        actions: &[Action],
    ) -> Result<ExecutionReport, ExecutionError> {
        let mut report = ExecutionReport::default();
        for action in actions {
            match action {
                Action::EnsureScheduleAndBackup { target } => {
                    self.ensure_schedule_and_backup(target, namespace, &mut report)
                        .await?
                }
                Action::DeleteSchedule { target } => {
                    self.delete_schedule(target, namespace, &mut report).await?
                }
            }
        }
        Ok(report)
    }

    /// Create the schedule unless it exists, then always take a new backup
    pub async fn ensure_schedule_and_backup(
        &self,
        target: &str,
        namespace: &str,
        report: &mut ExecutionReport,
    ) -> Result<(), ExecutionError> {
        let schedule = Schedule::for_namespace(&self.config, target, namespace);
        let name = schedule.name().to_string();

        let exists = self
            .store
            .schedule_exists(&name)
            .await
            .map_err(|source| failed(Step::GetSchedule, &name, source))?;

        if exists {
            info!(schedule = %name, namespace = %namespace, "Velero schedule already exists");
            report.schedules_existing.push(name);
        } else {
            info!(schedule = %name, namespace = %namespace, cron = %schedule.spec.schedule, "Creating Velero schedule");
            match self.store.create_schedule(&schedule).await {
                Ok(()) => report.schedules_created.push(name),
                Err(e) if e.is_conflict() => {
                    // Lost a race with another admission call for the same namespace
                    debug!(schedule = %name, "Velero schedule created concurrently");
                    report.schedules_existing.push(name);
                }
                Err(source) => return Err(failed(Step::CreateSchedule, &name, source)),
            }
        }

        let backup = Backup::for_namespace(&self.config, target, namespace, (self.clock)());
        let backup_name = backup.name().to_string();
        info!(backup = %backup_name, namespace = %namespace, "Creating Velero backup");
        self.store
            .create_backup(&backup)
            .await
            .map_err(|source| failed(Step::CreateBackup, &backup_name, source))?;
        report.backups_created.push(backup_name);

        Ok(())
    }

    /// Delete the schedule; a missing one only fails with `strict_delete`
    pub async fn delete_schedule(
        &self,
        target: &str,
        namespace: &str,
        report: &mut ExecutionReport,
    ) -> Result<(), ExecutionError> {
        let name = self.config.schedule_name(target, namespace);
        info!(schedule = %name, namespace = %namespace, "Deleting Velero schedule");

        match self.store.delete_schedule(&name).await {
            Ok(()) => {
                report.schedules_deleted.push(name);
                Ok(())
            }
            Err(e) if e.is_not_found() && !self.config.strict_delete => {
                warn!(schedule = %name, "Velero schedule not found, nothing to delete");
                report.schedules_missing.push(name);
                Ok(())
            }
            Err(source) => Err(failed(Step::DeleteSchedule, &name, source)),
        }
    }
}

fn failed(step: Step, name: &str, source: KubeError) -> ExecutionError {
    ExecutionError {
        step,
        name: name.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MockBackupStore, StoreCall, StoreOp};
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicI64, Ordering};

    const SCHEDULE: &str = "test-project-prod-shop";

    /// Clock that advances one second per call
    fn ticking_clock() -> impl Fn() -> DateTime<Utc> + Send + Sync + 'static {
        let tick = AtomicI64::new(0);
        move || {
            let base = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
            base + chrono::Duration::seconds(tick.fetch_add(1, Ordering::SeqCst))
        }
    }

    fn executor_with(store: &MockBackupStore, config: BackupConfig) -> LifecycleExecutor {
        LifecycleExecutor::new(Arc::new(store.clone()), Arc::new(config)).with_clock(ticking_clock())
    }

    fn executor(store: &MockBackupStore) -> LifecycleExecutor {
        executor_with(store, BackupConfig::default())
    }

    fn ensure(target: &str) -> Action {
        Action::EnsureScheduleAndBackup {
            target: target.to_string(),
        }
    }

    fn delete(target: &str) -> Action {
        Action::DeleteSchedule {
            target: target.to_string(),
        }
    }

    #[tokio::test]
    async fn test_ensure_creates_schedule_then_backup() {
        let store = MockBackupStore::new();

        let report = executor(&store).execute("shop", &[ensure("prod")]).await.unwrap();

        assert_eq!(
            store.calls(),
            vec![
                StoreCall::GetSchedule(SCHEDULE.to_string()),
                StoreCall::CreateSchedule(SCHEDULE.to_string()),
                StoreCall::CreateBackup("test-project-prod-shop-20240501120000".to_string()),
            ]
        );
        assert_eq!(report.schedules_created, vec![SCHEDULE]);
        assert_eq!(report.backups_created.len(), 1);
        assert!(store.schedule(SCHEDULE).is_some());
    }

    #[tokio::test]
    async fn test_ensure_twice_keeps_one_schedule_and_two_backups() {
        let store = MockBackupStore::new();
        let exec = executor(&store);

        exec.execute("shop", &[ensure("prod")]).await.unwrap();
        let second = exec.execute("shop", &[ensure("prod")]).await.unwrap();

        assert_eq!(store.schedule_names(), vec![SCHEDULE]);
        assert_eq!(store.backups().len(), 2);
        assert_eq!(second.schedules_existing, vec![SCHEDULE]);
        assert!(second.schedules_created.is_empty());
        assert_eq!(store.operation_counts().schedule_creates, 1);
    }

    #[tokio::test]
    async fn test_ensure_with_existing_schedule_skips_creation() {
        let existing = Schedule::for_namespace(&BackupConfig::default(), "prod", "shop");
        let store = MockBackupStore::with_schedules(vec![existing]);

        executor(&store).execute("shop", &[ensure("prod")]).await.unwrap();

        let counts = store.operation_counts();
        assert_eq!(counts.gets, 1);
        assert_eq!(counts.schedule_creates, 0);
        assert_eq!(counts.backup_creates, 1);
    }

    /// Store where the schedule appears between the lookup and the create
    struct RacingStore(MockBackupStore);

    #[async_trait::async_trait]
    impl BackupStore for RacingStore {
        async fn schedule_exists(&self, name: &str) -> crate::error::Result<bool> {
            self.0.schedule_exists(name).await?;
            Ok(false)
        }

        async fn create_schedule(&self, schedule: &Schedule) -> crate::error::Result<()> {
            self.0.create_schedule(schedule).await
        }

        async fn create_backup(&self, backup: &Backup) -> crate::error::Result<()> {
            self.0.create_backup(backup).await
        }

        async fn delete_schedule(&self, name: &str) -> crate::error::Result<()> {
            self.0.delete_schedule(name).await
        }
    }

    #[tokio::test]
    async fn test_schedule_created_concurrently_counts_as_existing() {
        let existing = Schedule::for_namespace(&BackupConfig::default(), "prod", "shop");
        let store = MockBackupStore::with_schedules(vec![existing]);
        let exec = LifecycleExecutor::new(
            Arc::new(RacingStore(store.clone())),
            Arc::new(BackupConfig::default()),
        )
        .with_clock(ticking_clock());

        let report = exec.execute("shop", &[ensure("prod")]).await.unwrap();

        assert_eq!(report.schedules_existing, vec![SCHEDULE]);
        assert!(report.schedules_created.is_empty());
        assert_eq!(report.backups_created.len(), 1);
        assert_eq!(
            store.calls(),
            vec![
                StoreCall::GetSchedule(SCHEDULE.to_string()),
                StoreCall::CreateSchedule(SCHEDULE.to_string()),
                StoreCall::CreateBackup("test-project-prod-shop-20240501120000".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_schedule_creation_failure_aborts_before_backup() {
        let store = MockBackupStore::new();
        store.fail_on(StoreOp::CreateSchedule);

        let err = executor(&store)
            .execute("shop", &[ensure("prod")])
            .await
            .unwrap_err();

        assert_eq!(err.step, Step::CreateSchedule);
        assert_eq!(err.name, SCHEDULE);
        assert_eq!(store.operation_counts().backup_creates, 0);
    }

    #[tokio::test]
    async fn test_lookup_failure_is_surfaced() {
        let store = MockBackupStore::new();
        store.fail_on(StoreOp::GetSchedule);

        let err = executor(&store)
            .execute("shop", &[ensure("prod")])
            .await
            .unwrap_err();
        assert_eq!(err.step, Step::GetSchedule);
        assert_eq!(store.operation_counts().schedule_creates, 0);
    }

    #[tokio::test]
    async fn test_backup_failure_keeps_created_schedule() {
        let store = MockBackupStore::new();
        store.fail_on(StoreOp::CreateBackup);

        let err = executor(&store)
            .execute("shop", &[ensure("prod")])
            .await
            .unwrap_err();

        assert_eq!(err.step, Step::CreateBackup);
        assert!(store.schedule(SCHEDULE).is_some());
        assert!(store.backups().is_empty());
    }

    #[tokio::test]
    async fn test_failure_stops_remaining_actions() {
        let store = MockBackupStore::new();
        store.fail_on(StoreOp::DeleteSchedule);

        let result = executor(&store)
            .execute("shop", &[delete("old"), ensure("prod")])
            .await;

        assert!(result.is_err());
        assert_eq!(
            store.calls(),
            vec![StoreCall::DeleteSchedule("test-project-old-shop".to_string())]
        );
    }

    #[tokio::test]
    async fn test_delete_existing_schedule() {
        let existing = Schedule::for_namespace(&BackupConfig::default(), "prod", "shop");
        let store = MockBackupStore::with_schedules(vec![existing]);

        let report = executor(&store).execute("shop", &[delete("prod")]).await.unwrap();

        assert_eq!(report.schedules_deleted, vec![SCHEDULE]);
        assert!(store.schedule_names().is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_schedule_is_lenient_by_default() {
        let store = MockBackupStore::new();

        let report = executor(&store).execute("shop", &[delete("prod")]).await.unwrap();

        assert_eq!(report.schedules_missing, vec![SCHEDULE]);
        assert!(report.schedules_deleted.is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_schedule_strict() {
        let store = MockBackupStore::new();
        let config = BackupConfig {
            strict_delete: true,
            ..Default::default()
        };

        let err = executor_with(&store, config)
            .execute("shop", &[delete("prod")])
            .await
            .unwrap_err();

        assert_eq!(err.step, Step::DeleteSchedule);
        assert!(err.source.is_not_found());
    }

    #[tokio::test]
    async fn test_no_actions_touch_nothing() {
        let store = MockBackupStore::new();

        let report = executor(&store).execute("shop", &[]).await.unwrap();

        assert!(report.is_empty());
        assert!(store.calls().is_empty());
    }

    #[test]
    fn test_report_display() {
        assert_eq!(ExecutionReport::default().to_string(), "no changes");

        let report = ExecutionReport {
            schedules_created: vec!["s".to_string()],
            backups_created: vec!["b1".to_string()],
            ..Default::default()
        };
        assert_eq!(report.to_string(), "schedules created: s; backups created: b1");
    }
}
