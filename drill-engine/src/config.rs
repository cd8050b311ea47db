//! FILENAME: drill-engine/src/config.rs
//! Drill configuration.
//!
//! The labels the view layer uses for synthetic cells. They are passed in
//! explicitly so two views with different conventions never share state.

use serde::{Deserialize, Serialize};

use condition_list::DataValue;

use crate::definition::GroupingField;
use crate::error::DrillError;

fn default_others_label() -> String {
    "Others".to_string()
}

fn default_collapsed_placeholder() -> String {
    "\u{2026}".to_string()
}

/// Labels of synthetic cells produced by the view layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrillConfig {
    /// Label of the bucket that aggregates every value cut by a top-N limit.
    #[serde(default = "default_others_label")]
    pub others_label: String,

    /// Value shown in a child-level cell whose parent is still collapsed.
    #[serde(default = "default_collapsed_placeholder")]
    pub collapsed_placeholder: String,
}

impl Default for DrillConfig {
    fn default() -> Self {
        DrillConfig {
            others_label: default_others_label(),
            collapsed_placeholder: default_collapsed_placeholder(),
        }
    }
}

impl DrillConfig {
    pub fn from_json_str(json: &str) -> Result<Self, DrillError> {
        Ok(serde_json::from_str(json)?)
    }

    /// True when `value` is the Others bucket of a top-N field.
    pub fn is_others(&self, field: &GroupingField, value: &DataValue) -> bool {
        field.top_n_others && value.as_text() == Some(self.others_label.as_str())
    }

    pub fn is_collapsed_placeholder(&self, value: &DataValue) -> bool {
        value.as_text() == Some(self.collapsed_placeholder.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = DrillConfig::from_json_str(r#"{"others_label":"Rest"}"#).unwrap();
        assert_eq!(config.others_label, "Rest");
        assert_eq!(config.collapsed_placeholder, "\u{2026}");
        assert!(DrillConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_others_requires_top_n_flag() {
        let config = DrillConfig::default();
        let plain = GroupingField::new("State");
        let top_n = GroupingField::new("State").with_top_n_others();
        let others = DataValue::text("Others");
        assert!(!config.is_others(&plain, &others));
        assert!(config.is_others(&top_n, &others));
        assert!(!config.is_others(&top_n, &DataValue::text("NJ")));
    }
}
