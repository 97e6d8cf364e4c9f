//! nsbackup Core - label evaluation and lifecycle decisions
//!
//! This crate holds everything that decides *what* to do with a namespace
//! admission call, independent of the cluster:
//! - `labels`: Enrollment predicate over the target and runtime labels
//! - `snapshot`: Decoding admission payloads into operation records
//! - `decision`: The label transition table
//! - `config`: Backup policy, naming, and label key configuration

pub mod config;
pub mod decision;
pub mod error;
pub mod labels;
pub mod snapshot;

pub use config::{BACKUP_TIMESTAMP_FORMAT, BackupConfig};
pub use decision::{Action, decide};
pub use error::{CoreError, Result};
pub use labels::{LabelKeys, LabelView, RUNTIME_LABEL, RUNTIME_SENTINEL, TARGET_LABEL};
pub use snapshot::{OperationKind, OperationRecord, ResourceSnapshot, parse_snapshot};
