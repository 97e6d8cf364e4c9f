//! Backup stores
//!
//! The executor only needs four primitives from the backup system. They are
//! expressed as a trait so the production Velero binding and the in-memory
//! store used in tests are interchangeable:
//! - **Velero**: Schedule and Backup objects through the Kubernetes API
//! - **Mock**: In-memory, records every call for assertions

mod mock;
mod velero;

pub use mock::{MockBackupStore, OperationCounts, StoreCall, StoreOp};
pub use velero::VeleroStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::velero::{Backup, Schedule};

/// Narrow contract against the external backup system
///
/// Implementations must be Send + Sync; one store is shared by every
/// in-flight admission call.
#[async_trait]
pub trait BackupStore: Send + Sync {
    /// Whether a schedule with this name exists; its contents are not read
    async fn schedule_exists(&self, name: &str) -> Result<bool>;

    /// Create a schedule; an existing one with the same name is a conflict
    async fn create_schedule(&self, schedule: &Schedule) -> Result<()>;

    /// Create a one-shot backup
    async fn create_backup(&self, backup: &Backup) -> Result<()>;

    /// Delete a schedule by name; a missing one is `ScheduleNotFound`
    async fn delete_schedule(&self, name: &str) -> Result<()>;
}
