//! Project scope supplied by the caller.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Engagement scope for one generation run.
///
/// `template_slide_selections` lets a caller pin a block key to a specific
/// template slide; the router treats the pin as the primary candidate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    /// Industry under study (e.g. "energy services")
    #[serde(default)]
    pub industry: String,

    /// Project type label
    #[serde(default)]
    pub project_type: String,

    /// Client display name
    #[serde(default)]
    pub client_name: String,

    /// Project display name
    #[serde(default)]
    pub project_name: String,

    /// Optional per-key template slide overrides
    #[serde(default)]
    pub template_slide_selections: BTreeMap<String, u32>,

    /// Optional strict-mode override; `None` defers to the environment
    #[serde(default)]
    pub template_strict_mode: Option<bool>,
}

impl Scope {
    /// The override pinned for a block key, if any
    pub fn slide_override(&self, key: &str) -> Option<u32> {
        self.template_slide_selections.get(key).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_deserializes_camel_case() {
        let json = r#"{
            "industry": "energy services",
            "projectType": "market selection",
            "clientName": "Acme KK",
            "projectName": "Phase 1",
            "templateSlideSelections": {"goNoGo": 24}
        }"#;

        let scope: Scope = serde_json::from_str(json).unwrap();
        assert_eq!(scope.client_name, "Acme KK");
        assert_eq!(scope.slide_override("goNoGo"), Some(24));
        assert_eq!(scope.slide_override("tpes"), None);
        assert!(scope.template_strict_mode.is_none());
    }

    #[test]
    fn test_scope_defaults() {
        let scope: Scope = serde_json::from_str("{}").unwrap();
        assert!(scope.industry.is_empty());
        assert!(scope.template_slide_selections.is_empty());
    }
}
