//! FILENAME: selection-engine/src/binding.rs
//! Cell bindings of a calc-grid layout.
//!
//! The set of binding kinds is closed; the ancestor walk matches on it
//! exhaustively.

use serde::{Deserialize, Serialize};

use condition_list::{ConditionField, ConditionItem, ConditionNode, DataValue, DateGroupLevel};
use drill_engine::NamedGroupDef;

/// What a layout cell displays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellBinding {
    /// A catalog column (optionally date-grouped).
    Column { field: ConditionField },

    /// A column grouped into user-defined named groups.
    NamedGroup { field: ConditionField, groups: NamedGroupDef },

    /// A column limited to its top-N values plus an Others bucket.
    TopN { field: ConditionField },

    /// Buckets of `interval` grouping units (days for raw dates, the date
    /// level's unit for grouped dates, plain units for numbers).
    Range { field: ConditionField, interval: u32 },

    /// A derived expression with no column behind it.
    Formula { expression: String },
}

impl CellBinding {
    pub fn column(column: impl Into<String>) -> Self {
        CellBinding::Column {
            field: ConditionField::column(column),
        }
    }

    pub fn grouped(column: impl Into<String>, level: DateGroupLevel) -> Self {
        CellBinding::Column {
            field: ConditionField::grouped(column, level),
        }
    }

    pub fn formula(expression: impl Into<String>) -> Self {
        CellBinding::Formula {
            expression: expression.into(),
        }
    }

    /// The field a filter is written against, if any.
    pub fn field(&self) -> Option<&ConditionField> {
        match self {
            CellBinding::Column { field }
            | CellBinding::NamedGroup { field, .. }
            | CellBinding::TopN { field }
            | CellBinding::Range { field, .. } => Some(field),
            CellBinding::Formula { .. } => None,
        }
    }
}

/// Synthetic range column handed to the query layer for range bindings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RangeColumn {
    pub name: String,
    pub source: ConditionField,
    pub interval: u32,
}

impl RangeColumn {
    pub fn new(source: ConditionField, interval: u32) -> Self {
        RangeColumn {
            name: format!("{} [{}]", source.display_name(), interval),
            source,
            interval,
        }
    }
}

/// EQUAL on a value, NULL on an empty one.
pub(crate) fn value_condition(field: &ConditionField, value: &DataValue) -> ConditionNode {
    ConditionNode::Leaf(ConditionItem::equal(field.clone(), value.clone()))
}

/// Substitutes a named-group label: the group's own condition, or for the
/// leftover bucket every group negated plus NOT-NULL. Labels that are not
/// group labels read as raw values.
pub(crate) fn named_group_condition(
    field: &ConditionField,
    groups: &NamedGroupDef,
    value: &DataValue,
) -> Option<ConditionNode> {
    let label = match value.as_text() {
        Some(label) => label,
        None => return Some(value_condition(field, value)),
    };
    if let Some(group) = groups.group(label) {
        return group.condition.to_node();
    }
    if groups.is_leftover(label) {
        let mut parts: Vec<ConditionNode> = groups
            .groups
            .iter()
            .filter_map(|g| g.condition.to_node())
            .map(ConditionNode::negate)
            .collect();
        parts.push(ConditionNode::Leaf(ConditionItem::not_null(field.clone())));
        return ConditionNode::all(parts);
    }
    Some(value_condition(field, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use drill_engine::NamedGroup;

    fn east_west() -> NamedGroupDef {
        let state = ConditionField::column("State");
        NamedGroupDef::new(vec![
            NamedGroup::from_members("East", state.clone(), vec!["NJ".into(), "NY".into()]),
            NamedGroup::from_members("West", state, vec!["CA".into()]),
        ])
    }

    #[test]
    fn test_null_value_reads_as_is_null() {
        let node = value_condition(&ConditionField::column("State"), &DataValue::Null);
        assert_eq!(node.to_string(), "State IS NULL");
    }

    #[test]
    fn test_named_group_substitution() {
        let state = ConditionField::column("State");
        let groups = east_west();
        let east = named_group_condition(&state, &groups, &"East".into()).unwrap();
        assert_eq!(east.to_string(), "State ONE-OF {NJ,NY}");

        let other = named_group_condition(&state, &groups, &"Other".into()).unwrap();
        assert_eq!(
            other.to_string(),
            "State NOT ONE-OF {NJ,NY} AND State!=CA AND State IS NOT NULL"
        );

        let raw = named_group_condition(&state, &groups, &"TX".into()).unwrap();
        assert_eq!(raw.to_string(), "State=TX");
    }

    #[test]
    fn test_range_column_naming() {
        let column = RangeColumn::new(ConditionField::grouped("OrderDate", DateGroupLevel::Month), 3);
        assert_eq!(column.name, "OrderDate (Month) [3]");
        assert_eq!(CellBinding::formula("1+1").field(), None);
    }
}
