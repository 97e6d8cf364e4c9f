//! nsbackup Kube - Velero integration for nsbackup
//!
//! This crate provides:
//! - **Velero Resources**: Typed Schedule and Backup objects built from configuration
//! - **Backup Stores**: The narrow store contract, its Velero binding and an in-memory mock
//! - **Lifecycle Execution**: Idempotent schedule creation, one-shot backups, schedule teardown

pub mod error;
pub mod executor;
pub mod store;
pub mod velero;

pub use error::{ExecutionError, KubeError, Result, Step};
pub use executor::{Clock, ExecutionReport, LifecycleExecutor};
pub use store::{BackupStore, MockBackupStore, OperationCounts, StoreCall, StoreOp, VeleroStore};
pub use velero::{Backup, BackupTemplate, Schedule, ScheduleSpec, VeleroResource, go_duration};
