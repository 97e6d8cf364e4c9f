//! Resource snapshots and per-request operation records
//!
//! An admission call carries the proposed object and, for updates and
//! deletes, the prior object. Both are decoded into the namespace shape and
//! reduced to the two label views the decision engine needs.

use k8s_openapi::api::core::v1::Namespace;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{CoreError, Result};
use crate::labels::{LabelKeys, LabelView};

/// Kind of mutation being admitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationKind {
    Create,
    Update,
    Delete,
    /// Anything else the control plane sends (e.g. `CONNECT`)
    Other(String),
}

impl OperationKind {
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "CREATE"),
            Self::Update => write!(f, "UPDATE"),
            Self::Delete => write!(f, "DELETE"),
            Self::Other(name) => write!(f, "{}", name),
        }
    }
}

/// The parts of a namespace object the engine cares about
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceSnapshot {
    pub name: Option<String>,
    pub labels: BTreeMap<String, String>,
}

impl ResourceSnapshot {
    pub fn view(&self, keys: &LabelKeys) -> LabelView {
        LabelView::evaluate(&self.labels, keys)
    }
}

/// Decode a raw object payload into a snapshot
pub fn parse_snapshot(raw: &serde_json::Value, which: &'static str) -> Result<ResourceSnapshot> {
    let namespace =
        Namespace::deserialize(raw).map_err(|source| CoreError::Decode { which, source })?;

    Ok(ResourceSnapshot {
        name: namespace.metadata.name,
        labels: namespace.metadata.labels.unwrap_or_default(),
    })
}

fn decode(payload: Option<&serde_json::Value>, which: &'static str) -> Result<ResourceSnapshot> {
    match payload {
        Some(value) if !value.is_null() => parse_snapshot(value, which),
        _ => Err(CoreError::MissingObject { which }),
    }
}

/// Everything the decision engine knows about one admission call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRecord {
    pub kind: OperationKind,
    pub resource_name: String,
    pub current: LabelView,
    pub previous: LabelView,
}

impl OperationRecord {
    /// Build a record from the raw admission payloads
    ///
    /// `request_name` is the name reported by the admission request and is
    /// used when the object itself carries no name. A delete still rejects a
    /// malformed current object, but its labels never enroll anything; creates
    /// never look at the prior object.
    pub fn from_payloads(
        kind: OperationKind,
        request_name: &str,
        current: Option<&serde_json::Value>,
        previous: Option<&serde_json::Value>,
        keys: &LabelKeys,
    ) -> Result<Self> {
        let (current, previous) = match kind {
            OperationKind::Create => (Some(decode(current, "current")?), None),
            OperationKind::Update => (
                Some(decode(current, "current")?),
                Some(decode(previous, "previous")?),
            ),
            OperationKind::Delete => {
                if let Some(value) = current.filter(|v| !v.is_null()) {
                    parse_snapshot(value, "current")?;
                }
                (None, Some(decode(previous, "previous")?))
            }
            OperationKind::Other(_) => (None, None),
        };

        let resource_name = current
            .as_ref()
            .and_then(|s| s.name.clone())
            .or_else(|| previous.as_ref().and_then(|s| s.name.clone()))
            .unwrap_or_else(|| request_name.to_string());

        Ok(Self {
            kind,
            resource_name,
            current: current.map(|s| s.view(keys)).unwrap_or_default(),
            previous: previous.map(|s| s.view(keys)).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::{RUNTIME_LABEL, TARGET_LABEL};
    use serde_json::json;

    fn namespace(name: &str, labels: serde_json::Value) -> serde_json::Value {
        json!({
            "apiVersion": "v1",
            "kind": "Namespace",
            "metadata": { "name": name, "labels": labels }
        })
    }

    fn enrolled(name: &str, target: &str) -> serde_json::Value {
        namespace(name, json!({ TARGET_LABEL: target, RUNTIME_LABEL: "target" }))
    }

    #[test]
    fn test_operation_kind_display() {
        assert_eq!(OperationKind::Create.to_string(), "CREATE");
        assert_eq!(OperationKind::Delete.to_string(), "DELETE");
        let connect = OperationKind::Other("CONNECT".to_string());
        assert_eq!(connect.to_string(), "CONNECT");
        assert!(!connect.is_recognized());
        assert!(OperationKind::Update.is_recognized());
    }

    #[test]
    fn test_parse_snapshot() {
        let snapshot = parse_snapshot(&enrolled("shop", "prod"), "current").unwrap();
        assert_eq!(snapshot.name.as_deref(), Some("shop"));
        assert_eq!(snapshot.labels.get(TARGET_LABEL).map(String::as_str), Some("prod"));
    }

    #[test]
    fn test_parse_snapshot_without_labels() {
        let raw = json!({ "apiVersion": "v1", "kind": "Namespace", "metadata": { "name": "bare" } });
        let snapshot = parse_snapshot(&raw, "current").unwrap();
        assert!(snapshot.labels.is_empty());
    }

    #[test]
    fn test_parse_snapshot_rejects_malformed_labels() {
        let raw = namespace("shop", json!(["not", "a", "map"]));
        let err = parse_snapshot(&raw, "current").unwrap_err();
        assert!(matches!(err, CoreError::Decode { which: "current", .. }));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_create_record() {
        let current = enrolled("shop", "prod");
        let record = OperationRecord::from_payloads(
            OperationKind::Create,
            "shop",
            Some(&current),
            None,
            &LabelKeys::default(),
        )
        .unwrap();

        assert_eq!(record.resource_name, "shop");
        assert_eq!(record.current.target(), Some("prod"));
        assert!(!record.previous.enrolled);
    }

    #[test]
    fn test_create_ignores_previous_payload() {
        let current = namespace("shop", json!({}));
        let garbage = json!("garbage");
        let record = OperationRecord::from_payloads(
            OperationKind::Create,
            "shop",
            Some(&current),
            Some(&garbage),
            &LabelKeys::default(),
        )
        .unwrap();
        assert!(!record.previous.enrolled);
    }

    #[test]
    fn test_update_requires_previous() {
        let current = enrolled("shop", "prod");
        let err = OperationRecord::from_payloads(
            OperationKind::Update,
            "shop",
            Some(&current),
            None,
            &LabelKeys::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::MissingObject { which: "previous" }));
    }

    #[test]
    fn test_update_with_malformed_current() {
        let current = json!({ "metadata": { "labels": 42 } });
        let previous = enrolled("shop", "prod");
        let err = OperationRecord::from_payloads(
            OperationKind::Update,
            "shop",
            Some(&current),
            Some(&previous),
            &LabelKeys::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Decode { which: "current", .. }));
    }

    #[test]
    fn test_delete_uses_previous_only() {
        let previous = enrolled("shop", "prod");
        let record = OperationRecord::from_payloads(
            OperationKind::Delete,
            "",
            Some(&serde_json::Value::Null),
            Some(&previous),
            &LabelKeys::default(),
        )
        .unwrap();

        assert_eq!(record.resource_name, "shop");
        assert!(!record.current.enrolled);
        assert_eq!(record.previous.target(), Some("prod"));
    }

    #[test]
    fn test_delete_rejects_malformed_current() {
        let previous = enrolled("shop", "prod");
        let current = json!({ "metadata": { "labels": 42 } });
        let result = OperationRecord::from_payloads(
            OperationKind::Delete,
            "shop",
            Some(&current),
            Some(&previous),
            &LabelKeys::default(),
        );
        assert!(matches!(result, Err(CoreError::Decode { which: "current", .. })));
    }

    #[test]
    fn test_delete_with_current_object_is_not_enrolled() {
        let record = OperationRecord::from_payloads(
            OperationKind::Delete,
            "shop",
            Some(&enrolled("shop", "staging")),
            Some(&enrolled("shop", "prod")),
            &LabelKeys::default(),
        )
        .unwrap();

        assert!(!record.current.enrolled);
        assert_eq!(record.previous.target(), Some("prod"));
    }

    #[test]
    fn test_create_requires_current() {
        let err = OperationRecord::from_payloads(
            OperationKind::Create,
            "shop",
            Some(&serde_json::Value::Null),
            None,
            &LabelKeys::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::MissingObject { which: "current" }));
    }

    #[test]
    fn test_name_falls_back_to_request() {
        let current = json!({ "apiVersion": "v1", "kind": "Namespace", "metadata": {} });
        let record = OperationRecord::from_payloads(
            OperationKind::Create,
            "from-request",
            Some(&current),
            None,
            &LabelKeys::default(),
        )
        .unwrap();
        assert_eq!(record.resource_name, "from-request");
    }

    #[test]
    fn test_unrecognized_kind_decodes_nothing() {
        let garbage = json!(17);
        let record = OperationRecord::from_payloads(
            OperationKind::Other("CONNECT".to_string()),
            "shop",
            Some(&garbage),
            Some(&garbage),
            &LabelKeys::default(),
        )
        .unwrap();
        assert_eq!(record.resource_name, "shop");
        assert!(!record.current.enrolled && !record.previous.enrolled);
    }
}
