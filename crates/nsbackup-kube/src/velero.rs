//! Velero resource types
//!
//! Typed Schedule and Backup objects for `velero.io/v1`, built from
//! [`BackupConfig`] so that no policy value is hard-coded at the call site.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use kube::discovery::ApiResource;
use nsbackup_core::BackupConfig;
use serde::{Deserialize, Serialize};

pub const VELERO_GROUP: &str = "velero.io";
pub const VELERO_VERSION: &str = "v1";
pub const VELERO_API_VERSION: &str = "velero.io/v1";

/// Manager label value on everything this webhook creates
pub const MANAGED_BY: &str = "nsbackup-webhook";
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";
pub const LABEL_NAMESPACE: &str = "nsbackup.io/namespace";
pub const LABEL_TARGET: &str = "nsbackup.io/target";

/// A Velero kind addressable through the dynamic API
pub trait VeleroResource: Serialize {
    const KIND: &'static str;
    const PLURAL: &'static str;

    fn api_resource() -> ApiResource {
        ApiResource {
            group: VELERO_GROUP.to_string(),
            version: VELERO_VERSION.to_string(),
            api_version: VELERO_API_VERSION.to_string(),
            kind: Self::KIND.to_string(),
            plural: Self::PLURAL.to_string(),
        }
    }

    fn name(&self) -> &str;
}

/// Render a duration the way Go's `time.Duration` prints it
///
/// Velero parses durations with Go, so `720h0m0s` is the canonical form.
/// Sub-second precision is dropped.
pub fn go_duration(d: Duration) -> String {
    let total = d.as_secs();
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{}h{}m{}s", h, m, s)
    } else if m > 0 {
        format!("{}m{}s", m, s)
    } else {
        format!("{}s", s)
    }
}

/// Metadata for Velero objects
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl ObjectMeta {
    /// Metadata labelled with the owning namespace and target
    pub fn managed(
        name: impl Into<String>,
        config: &BackupConfig,
        target: &str,
        namespace: &str,
    ) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert(LABEL_MANAGED_BY.to_string(), MANAGED_BY.to_string());
        labels.insert(LABEL_NAMESPACE.to_string(), namespace.to_string());
        labels.insert(LABEL_TARGET.to_string(), target.to_string());
        Self {
            name: name.into(),
            namespace: config.velero_namespace.clone(),
            labels,
        }
    }
}

// =============================================================================
// Schedule
// =============================================================================

/// Velero Schedule resource
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "Schedule::default_kind")]
    pub kind: String,
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ScheduleSpec,
}

impl VeleroResource for Schedule {
    const KIND: &'static str = "Schedule";
    const PLURAL: &'static str = "schedules";

    fn name(&self) -> &str {
        &self.metadata.name
    }
}

impl Schedule {
    fn default_kind() -> String {
        <Self as VeleroResource>::KIND.to_string()
    }

    /// Recurring schedule covering exactly one namespace
    pub fn for_namespace(config: &BackupConfig, target: &str, namespace: &str) -> Self {
        let name = config.schedule_name(target, namespace);
        Self {
            api_version: default_api_version(),
            kind: Self::default_kind(),
            metadata: ObjectMeta::managed(name, config, target, namespace),
            spec: ScheduleSpec {
                schedule: config.schedule.clone(),
                use_owner_references_in_backup: Some(false),
                template: BackupTemplate {
                    csi_snapshot_timeout: Some(go_duration(config.snapshot_timeout)),
                    item_operation_timeout: None,
                    included_namespaces: vec![namespace.to_string()],
                    storage_location: Some(config.storage_location.clone()),
                    ttl: Some(go_duration(config.retention)),
                    default_volumes_to_fs_backup: Some(config.fs_backup),
                },
            },
        }
    }
}

/// Schedule spec
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSpec {
    /// Cron expression or `@every` interval
    #[serde(default)]
    pub schedule: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_owner_references_in_backup: Option<bool>,
    #[serde(default)]
    pub template: BackupTemplate,
}

/// Backup settings shared by Schedule templates and one-shot Backups
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackupTemplate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csi_snapshot_timeout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_operation_timeout: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included_namespaces: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_volumes_to_fs_backup: Option<bool>,
}

// =============================================================================
// Backup
// =============================================================================

/// Velero Backup resource
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "Backup::default_kind")]
    pub kind: String,
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: BackupTemplate,
}

impl VeleroResource for Backup {
    const KIND: &'static str = "Backup";
    const PLURAL: &'static str = "backups";

    fn name(&self) -> &str {
        &self.metadata.name
    }
}

impl Backup {
    fn default_kind() -> String {
        <Self as VeleroResource>::KIND.to_string()
    }

    /// One-shot backup of a namespace, named after its schedule and `at`
    pub fn for_namespace(
        config: &BackupConfig,
        target: &str,
        namespace: &str,
        at: DateTime<Utc>,
    ) -> Self {
        let schedule = config.schedule_name(target, namespace);
        let name = config.backup_name(&schedule, at);
        Self {
            api_version: default_api_version(),
            kind: Self::default_kind(),
            metadata: ObjectMeta::managed(name, config, target, namespace),
            spec: BackupTemplate {
                csi_snapshot_timeout: Some(go_duration(config.snapshot_timeout)),
                item_operation_timeout: Some(go_duration(config.item_operation_timeout)),
                included_namespaces: vec![namespace.to_string()],
                storage_location: Some(config.storage_location.clone()),
                ttl: Some(go_duration(config.retention)),
                default_volumes_to_fs_backup: Some(config.fs_backup),
            },
        }
    }
}

fn default_api_version() -> String {
    VELERO_API_VERSION.to_string()
}
