//! Error types for nsbackup-kube

use thiserror::Error;

/// Result type for backup store operations
pub type Result<T> = std::result::Result<T, KubeError>;

/// Errors returned by a backup store
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KubeError {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    /// Resource with the same name already exists
    #[error("{kind} '{name}' already exists")]
    AlreadyExists { kind: String, name: String },

    /// Schedule not found
    #[error("schedule '{name}' not found in namespace '{namespace}'")]
    ScheduleNotFound { name: String, namespace: String },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Backing store refused or failed the operation
    #[error("backup store error: {0}")]
    Store(String),
}

impl From<serde_json::Error> for KubeError {
    fn from(e: serde_json::Error) -> Self {
        KubeError::Serialization(e.to_string())
    }
}

impl KubeError {
    /// Check if this is a Kubernetes 404 Not Found error
    pub fn is_not_found(&self) -> bool {
        match self {
            KubeError::ScheduleNotFound { .. } => true,
            KubeError::Api(kube::Error::Api(resp)) => resp.code == 404,
            _ => false,
        }
    }

    /// Check if this is a conflict error (409)
    pub fn is_conflict(&self) -> bool {
        match self {
            KubeError::AlreadyExists { .. } => true,
            KubeError::Api(kube::Error::Api(resp)) => resp.code == 409,
            _ => false,
        }
    }
}

/// Failure while executing a lifecycle action
#[derive(Debug, Error)]
#[error("failed to {step} '{name}': {source}")]
pub struct ExecutionError {
    pub step: Step,
    pub name: String,
    #[source]
    pub source: KubeError,
}

/// Store call that failed during execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    GetSchedule,
    CreateSchedule,
    CreateBackup,
    DeleteSchedule,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Step::GetSchedule => "look up Velero schedule",
            Step::CreateSchedule => "create Velero schedule",
            Step::CreateBackup => "create Velero backup",
            Step::DeleteSchedule => "delete Velero schedule",
        };
        f.write_str(s)
    }
}
