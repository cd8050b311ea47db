//! FILENAME: drill-engine/src/definition.rs
//! Grouping definitions - what is bound to the rows, columns and axes.
//!
//! These structures are designed to be:
//! - Serializable (they arrive from the binding layer as JSON)
//! - Rebuilt wholesale on every binding change
//! - Immutable snapshots of the current binding

use serde::{Deserialize, Serialize};

use condition_list::{
    format_date_level_name, ConditionField, ConditionItem, ConditionList, DataValue, DateGroupLevel,
};

// ============================================================================
// AXIS
// ============================================================================

/// Which header band a grouping field is displayed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    Row,
    Column,
}

// ============================================================================
// NAMED GROUPS
// ============================================================================

/// A user-defined group of raw values shown under one label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedGroup {
    /// Display label of the group (e.g. "East Coast").
    pub name: String,

    /// Condition selecting the raw rows that belong to the group.
    pub condition: ConditionList,
}

impl NamedGroup {
    pub fn new(name: impl Into<String>, condition: ConditionList) -> Self {
        NamedGroup {
            name: name.into(),
            condition,
        }
    }

    /// Builds a group from an explicit member list.
    pub fn from_members(name: impl Into<String>, field: ConditionField, members: Vec<DataValue>) -> Self {
        NamedGroup {
            name: name.into(),
            condition: ConditionList::single(ConditionItem::one_of(field, members)),
        }
    }
}

fn default_leftover_label() -> String {
    "Other".to_string()
}

/// The named groups defined on one grouping field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedGroupDef {
    pub groups: Vec<NamedGroup>,

    /// Label of the auto-generated group holding every ungrouped value.
    #[serde(default = "default_leftover_label")]
    pub leftover_label: String,
}

impl NamedGroupDef {
    pub fn new(groups: Vec<NamedGroup>) -> Self {
        NamedGroupDef {
            groups,
            leftover_label: default_leftover_label(),
        }
    }

    pub fn group(&self, label: &str) -> Option<&NamedGroup> {
        self.groups.iter().find(|g| g.name == label)
    }

    /// True for any label produced by the grouping, leftover included.
    pub fn is_group_label(&self, label: &str) -> bool {
        label == self.leftover_label || self.group(label).is_some()
    }

    /// The leftover label is only synthetic while no real group uses it.
    pub fn is_leftover(&self, label: &str) -> bool {
        label == self.leftover_label && self.group(label).is_none()
    }
}

// ============================================================================
// MERGED DATE CELLS
// ============================================================================

/// One component of a date-range / date-comparison merged header value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergePart {
    /// Column the temporary grouping field reads.
    pub column: String,

    /// Date level of the temporary grouping field.
    #[serde(default)]
    pub date_level: Option<DateGroupLevel>,

    /// Components flagged here exist only for display and are not filtered on.
    #[serde(default)]
    pub ignore: bool,
}

impl MergePart {
    pub fn new(column: impl Into<String>, date_level: Option<DateGroupLevel>) -> Self {
        MergePart {
            column: column.into(),
            date_level,
            ignore: false,
        }
    }

    pub fn ignored(mut self) -> Self {
        self.ignore = true;
        self
    }

    pub fn condition_field(&self) -> ConditionField {
        ConditionField {
            column: self.column.clone(),
            date_level: self.date_level,
        }
    }
}

// ============================================================================
// GROUPING FIELD
// ============================================================================

/// A grouping column used as a row, column or axis dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupingField {
    /// Stable name; header cells refer to the field by this name.
    pub name: String,

    /// Source column the field groups.
    pub column: String,

    /// Date grouping level, for date fields.
    #[serde(default)]
    pub date_level: Option<DateGroupLevel>,

    /// Named groups defined on the field.
    #[serde(default)]
    pub named_group: Option<NamedGroupDef>,

    /// Member of an OLAP cube dimension.
    #[serde(default)]
    pub cube_sourced: bool,

    /// Member of a data model hierarchy.
    #[serde(default)]
    pub model_sourced: bool,

    /// Values beyond a top-N limit are bucketed into an Others value.
    #[serde(default)]
    pub top_n_others: bool,

    /// Expression of a derived (calculated) field. Such fields have no
    /// column a filter could be written against.
    #[serde(default)]
    pub formula: Option<String>,

    /// Components of a merged date-range / date-comparison value.
    #[serde(default)]
    pub merge: Vec<MergePart>,
}

impl GroupingField {
    pub fn new(column: impl Into<String>) -> Self {
        let column = column.into();
        GroupingField {
            name: column.clone(),
            column,
            date_level: None,
            named_group: None,
            cube_sourced: false,
            model_sourced: false,
            top_n_others: false,
            formula: None,
            merge: Vec::new(),
        }
    }

    /// A date column grouped to `level`, named like "OrderDate (Year)".
    pub fn date(column: impl Into<String>, level: DateGroupLevel) -> Self {
        let column = column.into();
        let mut field = GroupingField::new(column.clone());
        field.name = format_date_level_name(&column, level);
        field.date_level = Some(level);
        field
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_named_group(mut self, def: NamedGroupDef) -> Self {
        self.named_group = Some(def);
        self
    }

    pub fn with_top_n_others(mut self) -> Self {
        self.top_n_others = true;
        self
    }

    pub fn cube(mut self) -> Self {
        self.cube_sourced = true;
        self
    }

    pub fn model(mut self) -> Self {
        self.model_sourced = true;
        self
    }

    pub fn derived(mut self, formula: impl Into<String>) -> Self {
        self.formula = Some(formula.into());
        self
    }

    pub fn with_merge(mut self, parts: Vec<MergePart>) -> Self {
        self.merge = parts;
        self
    }

    pub fn is_date(&self) -> bool {
        self.date_level.is_some()
    }

    pub fn is_derived(&self) -> bool {
        self.formula.is_some()
    }

    pub fn is_merged(&self) -> bool {
        !self.merge.is_empty()
    }

    /// The field a filter on this grouping is written against.
    pub fn condition_field(&self) -> ConditionField {
        ConditionField {
            column: self.column.clone(),
            date_level: self.date_level,
        }
    }
}

// ============================================================================
// CUBE / MODEL HIERARCHIES
// ============================================================================

/// An ordered drill hierarchy, coarsest level first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hierarchy {
    pub name: String,

    /// Grouping field names from coarse to fine (e.g. Region, Country, City).
    pub levels: Vec<String>,
}

impl Hierarchy {
    pub fn new(name: impl Into<String>, levels: Vec<String>) -> Self {
        Hierarchy {
            name: name.into(),
            levels,
        }
    }

    pub fn position(&self, field: &str) -> Option<usize> {
        self.levels.iter().position(|l| l == field)
    }
}

/// The cube or data model behind the current binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CubeModel {
    /// Identity of the cube/model. A change means every recorded hierarchy is dead.
    pub identity: String,

    #[serde(default)]
    pub hierarchies: Vec<Hierarchy>,
}

impl CubeModel {
    pub fn new(identity: impl Into<String>) -> Self {
        CubeModel {
            identity: identity.into(),
            hierarchies: Vec::new(),
        }
    }

    pub fn with_hierarchy(mut self, hierarchy: Hierarchy) -> Self {
        self.hierarchies.push(hierarchy);
        self
    }

    /// The hierarchy containing `field` and the field's level in it.
    pub fn hierarchy_of(&self, field: &str) -> Option<(&Hierarchy, usize)> {
        self.hierarchies
            .iter()
            .find_map(|h| h.position(field).map(|pos| (h, pos)))
    }
}
