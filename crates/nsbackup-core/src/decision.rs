//! Label transition decisions
//!
//! A namespace moves between two states as it is admitted over and over:
//! unenrolled and enrolled. Entering the enrolled state ensures a schedule
//! exists and takes an immediate backup. Leaving it tears the schedule down.
//! Deleting the namespace is a forced transition to unenrolled. Staying in
//! either state does nothing, so unrelated label edits never trigger extra
//! backups.

use std::fmt;

use crate::snapshot::{OperationKind, OperationRecord};

/// Lifecycle action produced for one admission call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Create the schedule if it is missing, then take a one-shot backup
    EnsureScheduleAndBackup { target: String },
    /// Remove the schedule for the given target
    DeleteSchedule { target: String },
}

impl Action {
    pub fn target(&self) -> &str {
        match self {
            Action::EnsureScheduleAndBackup { target } | Action::DeleteSchedule { target } => {
                target
            }
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::EnsureScheduleAndBackup { target } => {
                write!(f, "ensure schedule and backup (target {})", target)
            }
            Action::DeleteSchedule { target } => write!(f, "delete schedule (target {})", target),
        }
    }
}

/// Decide which actions an operation requires
///
/// Total over every kind and enrollment combination; unrecognized kinds
/// produce no actions.
pub fn decide(record: &OperationRecord) -> Vec<Action> {
    let current = record.current.target();
    let previous = record.previous.target();

    let action = match (&record.kind, current, previous) {
        (OperationKind::Create, Some(target), _) => Some(Action::EnsureScheduleAndBackup {
            target: target.to_string(),
        }),
        (OperationKind::Update, Some(target), None) => Some(Action::EnsureScheduleAndBackup {
            target: target.to_string(),
        }),
        (OperationKind::Update, None, Some(target)) | (OperationKind::Delete, _, Some(target)) => {
            Some(Action::DeleteSchedule {
                target: target.to_string(),
            })
        }
        _ => None,
    };

    action.into_iter().collect()
}
