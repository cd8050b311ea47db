//! FILENAME: drill-engine/src/state.rs
//! Persisted expand state.
//!
//! The only tracker state that survives a session. Paths are stored as the
//! exact strings the tracker compares, so a path written is read back
//! byte-identical.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::error::DrillError;
use crate::{log_debug, log_warn};

pub const EXPANDED_STATE_VERSION: u32 = 1;

fn default_version() -> u32 {
    EXPANDED_STATE_VERSION
}

/// Field name -> expanded drill paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpandedState {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub fields: BTreeMap<String, BTreeSet<String>>,
}

impl ExpandedState {
    pub fn new() -> Self {
        ExpandedState {
            version: EXPANDED_STATE_VERSION,
            fields: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, field: impl Into<String>, path: impl Into<String>) {
        self.fields.entry(field.into()).or_default().insert(path.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.values().all(|paths| paths.is_empty())
    }

    pub fn path_count(&self) -> usize {
        self.fields.values().map(|paths| paths.len()).sum()
    }

    pub fn to_json(&self) -> Result<String, DrillError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, DrillError> {
        let state: ExpandedState = serde_json::from_str(json)?;
        state.check_version()
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), DrillError> {
        serde_json::to_writer_pretty(writer, self)?;
        log_debug!("STATE", "wrote {} expanded paths", self.path_count());
        Ok(())
    }

    pub fn read_from<R: Read>(reader: R) -> Result<Self, DrillError> {
        let state: ExpandedState = serde_json::from_reader(reader)?;
        let state = state.check_version()?;
        log_debug!("STATE", "read {} expanded paths", state.path_count());
        Ok(state)
    }

    fn check_version(self) -> Result<Self, DrillError> {
        if self.version != EXPANDED_STATE_VERSION {
            log_warn!("STATE", "unsupported expand state version {}", self.version);
            return Err(DrillError::UnsupportedVersion(self.version));
        }
        Ok(self)
    }
}
