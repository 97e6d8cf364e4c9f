//! Enrollment labels
//!
//! A namespace opts into backup management with two labels: a target label
//! naming the backup target and a runtime label that must carry the sentinel
//! value. Nothing else on the object influences enrollment.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default label naming the backup target
pub const TARGET_LABEL: &str = "namespace.oam.dev/target";
/// Default label marking the namespace runtime
pub const RUNTIME_LABEL: &str = "usage.oam.dev/runtime";
/// Runtime label value that enrolls a namespace
pub const RUNTIME_SENTINEL: &str = "target";

/// Label keys consulted when evaluating enrollment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelKeys {
    /// Key whose value names the backup target
    #[serde(default = "default_target")]
    pub target: String,

    /// Key whose value must equal `sentinel`
    #[serde(default = "default_runtime")]
    pub runtime: String,

    /// Required runtime value, compared exactly
    #[serde(default = "default_sentinel")]
    pub sentinel: String,
}

fn default_target() -> String {
    TARGET_LABEL.to_string()
}

fn default_runtime() -> String {
    RUNTIME_LABEL.to_string()
}

fn default_sentinel() -> String {
    RUNTIME_SENTINEL.to_string()
}

impl Default for LabelKeys {
    fn default() -> Self {
        Self {
            target: default_target(),
            runtime: default_runtime(),
            sentinel: default_sentinel(),
        }
    }
}

/// Enrollment state derived from a label set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelView {
    pub enrolled: bool,
    /// Only meaningful when `enrolled`
    pub target_name: String,
}

impl LabelView {
    /// View for an absent object
    pub fn not_enrolled() -> Self {
        Self::default()
    }

    /// Evaluate enrollment for a label set
    ///
    /// The target value must be non-empty and the runtime value must match
    /// the sentinel byte for byte. Missing keys simply yield a view that is
    /// not enrolled.
    pub fn evaluate(labels: &BTreeMap<String, String>, keys: &LabelKeys) -> Self {
        let target = labels.get(&keys.target).map(String::as_str).unwrap_or("");
        let runtime = labels.get(&keys.runtime).map(String::as_str);

        if !target.is_empty() && runtime == Some(keys.sentinel.as_str()) {
            Self {
                enrolled: true,
                target_name: target.to_string(),
            }
        } else {
            Self::not_enrolled()
        }
    }

    /// Target name if enrolled
    pub fn target(&self) -> Option<&str> {
        self.enrolled.then_some(self.target_name.as_str())
    }
}
