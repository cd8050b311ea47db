//! FILENAME: drill-engine/src/lib.rs
//! Drill-down state tracking for crosstab and chart views.
//!
//! This crate remembers which hierarchy branches a user has expanded and
//! keeps that memory consistent while the set of grouping fields changes
//! underneath it. It depends on `condition-list` only for shared value and
//! date-level types.
//!
//! Layers:
//! - `definition`: Grouping fields, named groups and cube hierarchies (what is bound)
//! - `grid`: The grid accessor contract and an in-memory grid (what is displayed)
//! - `path`: Canonical drill path identities
//! - `tracker`: The hierarchy drill tracker (HOW expansion state evolves)
//! - `state`: Persisted expand state

pub mod logging;
pub mod config;
pub mod error;
pub mod definition;
pub mod grid;
pub mod path;
pub mod state;
pub mod tracker;

#[doc(hidden)]
pub use log as __log;

pub use config::DrillConfig;
pub use error::DrillError;
pub use definition::*;
pub use grid::{
    drill_path_at, header_axis, CellDataPath, CellKind, GridAccessor, ViewCell, ViewGrid,
};
pub use path::DrillPath;
pub use state::{ExpandedState, EXPANDED_STATE_VERSION};
pub use tracker::{DrillOp, HierarchyDrillTracker};
