//! FILENAME: condition-list/src/lib.rs
//! Condition list data model shared by the drill tracker and the selection
//! synthesizer.
//!
//! A condition list is a flat sequence of leaf predicates separated by
//! AND/OR junctions, each tagged with a nesting level. It encodes a boolean
//! expression tree without pointers so it can be stored, compared and shipped
//! to a query executor as plain data.
//!
//! Layers:
//! - `value`: Observed values and date grouping levels
//! - `condition`: Leaf items, junctions and the flat list
//! - `tree`: Pointer-based tree form and level flattening
//! - `transform`: Merge, negation, field removal and OR -> IN compaction
//! - `eval`: In-memory evaluation against a row of values

pub mod value;
pub mod condition;
pub mod tree;
pub mod transform;
pub mod eval;

pub use value::{format_date_level_name, DataValue, DateGroupLevel};
pub use condition::{
    ConditionEntry, ConditionField, ConditionItem, ConditionList, Junction,
    JunctionOperator, Operation,
};
pub use tree::ConditionNode;
pub use eval::RowValues;
