//! FILENAME: selection-engine/src/config.rs
//! Synthesis configuration.

use serde::{Deserialize, Serialize};

use drill_engine::{DrillConfig, DrillError};

fn default_float_tolerance() -> f64 {
    1e-6
}

fn default_true() -> bool {
    true
}

fn default_min_in_values() -> usize {
    2
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Others / placeholder labels, shared with the drill tracker.
    #[serde(default)]
    pub drill: DrillConfig,

    /// Half-width of the BETWEEN written for a fractional chart value.
    #[serde(default = "default_float_tolerance")]
    pub float_tolerance: f64,

    /// Fold OR runs into ONE-OF after physical-range synthesis.
    #[serde(default = "default_true")]
    pub compact_or_to_in: bool,

    /// Shortest OR run worth folding.
    #[serde(default = "default_min_in_values")]
    pub min_in_values: usize,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        SynthesisConfig {
            drill: DrillConfig::default(),
            float_tolerance: default_float_tolerance(),
            compact_or_to_in: true,
            min_in_values: default_min_in_values(),
        }
    }
}

impl SynthesisConfig {
    pub fn from_json_str(json: &str) -> Result<Self, DrillError> {
        Ok(serde_json::from_str(json)?)
    }
}
