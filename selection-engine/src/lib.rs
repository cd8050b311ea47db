//! FILENAME: selection-engine/src/lib.rs
//! Selection to condition-list synthesis.
//!
//! Turns whatever the user selected (a calc-grid cell, a crosstab cell, a
//! set of chart points) into a condition list that re-selects the same
//! underlying rows.
//!
//! Layers:
//! - `binding`: What a layout cell shows (column, named group, top-N, range, formula)
//! - `layout`: The nested calc-grid layout tree
//! - `calc_grid`: Calc-grid accessor and instance lookup
//! - `others`: The top-N Others bucket
//! - `synthesizer`: Calc-grid and crosstab synthesis
//! - `chart`: Chart selection strategies

pub mod config;
pub mod error;
pub mod binding;
pub mod layout;
pub mod calc_grid;
pub mod others;
pub mod synthesizer;
pub mod chart;

pub use config::SynthesisConfig;
pub use error::SynthesisError;
pub use binding::{CellBinding, RangeColumn};
pub use layout::LayoutTree;
pub use calc_grid::{CalcGrid, CalcGridAccessor};
pub use others::others_condition;
pub use synthesizer::{ColumnCatalog, ConditionSynthesizer, Position, SourceKind};
pub use chart::{FieldRank, FieldValue, RangeKind, SelectionPoint};
