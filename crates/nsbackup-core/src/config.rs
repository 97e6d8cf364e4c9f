//! Webhook configuration
//!
//! Every fixed value used when building schedules and backups lives here.
//! A YAML file may override any subset; missing fields keep their defaults.
//!
//! ```yaml
//! project: payments
//! schedule: "0 */6 * * *"
//! retention: 14days
//! labels:
//!   target: namespace.oam.dev/target
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{CoreError, Result};
use crate::labels::LabelKeys;

/// Timestamp suffix format for one-shot backups
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Backup policy and naming configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupConfig {
    /// Project prefix used in schedule and backup names
    #[serde(default = "default_project")]
    pub project: String,

    /// Namespace where Velero watches for Schedule and Backup objects
    #[serde(default = "default_velero_namespace")]
    pub velero_namespace: String,

    /// Velero BackupStorageLocation name
    #[serde(default = "default_storage_location")]
    pub storage_location: String,

    /// Recurring cadence for schedules (cron or `@every` form)
    #[serde(default = "default_schedule")]
    pub schedule: String,

    /// How long Velero keeps each backup
    #[serde(default = "default_retention", with = "humantime_serde")]
    pub retention: Duration,

    /// CSI snapshot timeout
    #[serde(default = "default_snapshot_timeout", with = "humantime_serde")]
    pub snapshot_timeout: Duration,

    /// Async item operation timeout for one-shot backups
    #[serde(default = "default_item_operation_timeout", with = "humantime_serde")]
    pub item_operation_timeout: Duration,

    /// Back up volumes with file-system backup by default
    #[serde(default = "default_true")]
    pub fs_backup: bool,

    /// Fail deletes of schedules that do not exist
    #[serde(default)]
    pub strict_delete: bool,

    /// Enrollment label keys
    #[serde(default)]
    pub labels: LabelKeys,
}

fn default_project() -> String {
    "test-project".to_string()
}

fn default_velero_namespace() -> String {
    "velero".to_string()
}

fn default_storage_location() -> String {
    "default".to_string()
}

fn default_schedule() -> String {
    "@every 5m".to_string()
}

fn default_retention() -> Duration {
    Duration::from_secs(30 * 24 * 60 * 60)
}

fn default_snapshot_timeout() -> Duration {
    Duration::from_secs(10 * 60)
}

fn default_item_operation_timeout() -> Duration {
    Duration::from_secs(4 * 60 * 60)
}

fn default_true() -> bool {
    true
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            project: default_project(),
            velero_namespace: default_velero_namespace(),
            storage_location: default_storage_location(),
            schedule: default_schedule(),
            retention: default_retention(),
            snapshot_timeout: default_snapshot_timeout(),
            item_operation_timeout: default_item_operation_timeout(),
            fs_backup: true,
            strict_delete: false,
            labels: LabelKeys::default(),
        }
    }
}

impl BackupConfig {
    /// Load configuration from a YAML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load from a file when given, defaults otherwise
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => Ok(Self::default()),
        }
    }

    /// Parse and validate YAML configuration
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Reject configurations that would produce unusable resources
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("project", &self.project),
            ("veleroNamespace", &self.velero_namespace),
            ("storageLocation", &self.storage_location),
            ("schedule", &self.schedule),
            ("labels.target", &self.labels.target),
            ("labels.runtime", &self.labels.runtime),
            ("labels.sentinel", &self.labels.sentinel),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(CoreError::InvalidConfig {
                    message: format!("{} must not be empty", field),
                });
            }
        }

        let durations = [
            ("retention", self.retention),
            ("snapshotTimeout", self.snapshot_timeout),
            ("itemOperationTimeout", self.item_operation_timeout),
        ];
        for (field, value) in durations {
            if value.is_zero() {
                return Err(CoreError::InvalidConfig {
                    message: format!("{} must be greater than zero", field),
                });
            }
        }

        Ok(())
    }

    /// Deterministic schedule name: `<project>-<target>-<namespace>`
    pub fn schedule_name(&self, target: &str, namespace: &str) -> String {
        format!("{}-{}-{}", self.project, target, namespace)
    }

    /// One-shot backup name: `<schedule>-<YYYYMMDDhhmmss>`
    pub fn backup_name(&self, schedule_name: &str, at: DateTime<Utc>) -> String {
        format!("{}-{}", schedule_name, at.format(BACKUP_TIMESTAMP_FORMAT))
    }
}
