//! FILENAME: condition-list/src/eval.rs
//! In-memory evaluation of condition lists against rows of values.
//!
//! The query executor is external; this evaluator exists so callers can
//! check a synthesized filter against materialized rows (previews, tests).

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use crate::condition::{ConditionItem, ConditionList, Operation};
use crate::tree::ConditionNode;
use crate::value::DataValue;

/// Column lookup for one row.
pub trait RowValues {
    fn value(&self, column: &str) -> Option<&DataValue>;
}

impl<S: BuildHasher> RowValues for HashMap<String, DataValue, S> {
    fn value(&self, column: &str) -> Option<&DataValue> {
        self.get(column)
    }
}

impl RowValues for BTreeMap<String, DataValue> {
    fn value(&self, column: &str) -> Option<&DataValue> {
        self.get(column)
    }
}

fn compare(value: &DataValue, operand: Option<&DataValue>) -> Option<Ordering> {
    operand.and_then(|op| value.compare_same_kind(op))
}

impl ConditionItem {
    /// Tests one row. A missing column reads as null.
    pub fn matches<R: RowValues + ?Sized>(&self, row: &R) -> bool {
        let raw = row.value(&self.field.column).cloned().unwrap_or(DataValue::Null);
        let value = match self.field.date_level {
            Some(level) => raw.group_to(level),
            None => raw,
        };

        if value.is_null() {
            return match self.operation {
                Operation::Null => !self.negated,
                // Null is not a member of any value set.
                Operation::OneOf => self.negated,
                _ => false,
            };
        }

        let hit = match self.operation {
            Operation::Null => false,
            Operation::Equal => self.values.first() == Some(&value),
            Operation::OneOf => self.values.contains(&value),
            Operation::Between => {
                let low = compare(&value, self.values.first());
                let high = compare(&value, self.values.get(1));
                matches!(low, Some(Ordering::Greater | Ordering::Equal))
                    && matches!(high, Some(Ordering::Less | Ordering::Equal))
            }
            Operation::GreaterThanOrEqual => {
                matches!(compare(&value, self.values.first()), Some(Ordering::Greater | Ordering::Equal))
            }
            Operation::LessThanOrEqual => {
                matches!(compare(&value, self.values.first()), Some(Ordering::Less | Ordering::Equal))
            }
        };
        hit != self.negated
    }
}

impl ConditionNode {
    pub fn matches<R: RowValues + ?Sized>(&self, row: &R) -> bool {
        match self {
            ConditionNode::Leaf(item) => item.matches(row),
            ConditionNode::And(children) => children.iter().all(|c| c.matches(row)),
            ConditionNode::Or(children) => children.iter().any(|c| c.matches(row)),
        }
    }
}

impl ConditionList {
    /// Tests one row. The empty list accepts every row; a malformed list
    /// accepts none.
    pub fn matches<R: RowValues + ?Sized>(&self, row: &R) -> bool {
        if self.is_empty() {
            return true;
        }
        match self.to_node() {
            Some(node) => node.matches(row),
            None => false,
        }
    }

    /// Indices of the rows accepted by the list.
    pub fn filter_rows<R: RowValues>(&self, rows: &[R]) -> Vec<usize> {
        let node = self.to_node();
        rows.iter()
            .enumerate()
            .filter(|(_, row)| match &node {
                Some(node) => node.matches(*row),
                None => self.is_empty(),
            })
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::ConditionField;
    use crate::value::DateGroupLevel;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn row(pairs: &[(&str, DataValue)]) -> HashMap<String, DataValue> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_leaf_operations() {
        let r = row(&[("Year", 2023.into()), ("State", "NJ".into())]);
        let year = ConditionField::column("Year");
        assert!(ConditionItem::equal(year.clone(), 2023.into()).matches(&r));
        assert!(!ConditionItem::equal(year.clone(), 2024.into()).matches(&r));
        assert!(ConditionItem::between(year.clone(), 2020.into(), 2023.into()).matches(&r));
        assert!(!ConditionItem::between(year.clone(), 2024.into(), 2030.into()).matches(&r));
        assert!(ConditionItem::greater_or_equal(year.clone(), 2023.into()).matches(&r));
        assert!(!ConditionItem::less_or_equal(year.clone(), 2022.into()).matches(&r));
        assert!(ConditionItem::not_null(year.clone()).matches(&r));
        // Kind mismatch never satisfies a range.
        assert!(!ConditionItem::between(year, "a".into(), "z".into()).matches(&r));
    }

    #[test]
    fn test_null_row_values() {
        let r = row(&[("State", DataValue::Null)]);
        let state = ConditionField::column("State");
        assert!(ConditionItem::is_null(state.clone()).matches(&r));
        assert!(!ConditionItem::not_null(state.clone()).matches(&r));
        assert!(!ConditionItem::equal(state.clone(), "NJ".into()).matches(&r));
        let not_in = ConditionItem::one_of(state.clone(), vec!["NJ".into(), "CA".into()]).negate();
        assert!(not_in.matches(&r));
        // Missing column reads as null.
        assert!(ConditionItem::is_null(ConditionField::column("Other")).matches(&r));
    }

    #[test]
    fn test_date_level_groups_before_comparing() {
        let d = NaiveDate::from_ymd_opt(2023, 5, 2).unwrap();
        let r = row(&[("OrderDate", d.into())]);
        let item = ConditionItem::equal(ConditionField::grouped("OrderDate", DateGroupLevel::Quarter), 2.into());
        assert!(item.matches(&r));
    }

    #[test]
    fn test_empty_list_accepts_everything() {
        let rows = vec![row(&[("A", 1.into())]), row(&[])];
        assert_eq!(ConditionList::new().filter_rows(&rows), vec![0, 1]);
        let list = ConditionList::single(ConditionItem::equal(ConditionField::column("A"), 1.into()));
        assert_eq!(list.filter_rows(&rows), vec![0]);
    }

    fn small_value() -> impl Strategy<Value = DataValue> {
        prop_oneof![
            Just(DataValue::Null),
            (0i32..4).prop_map(DataValue::from),
            "[ab]".prop_map(DataValue::from),
        ]
    }

    proptest! {
        #[test]
        fn negation_inverts_every_row(
            a in small_value(), b in small_value(),
            ra in small_value(), rb in small_value(),
        ) {
            let node = ConditionNode::Or(vec![
                ConditionNode::Leaf(ConditionItem::equal(ConditionField::column("A"), a)),
                ConditionNode::And(vec![
                    ConditionNode::Leaf(ConditionItem::equal(ConditionField::column("B"), b)),
                    ConditionNode::Leaf(ConditionItem::not_null(ConditionField::column("A"))),
                ]),
            ]);
            let list = ConditionList::from_node(&node, 0);
            let r = row(&[("A", ra), ("B", rb)]);
            // Equal against null never holds, so negation is exact only
            // when the tested columns are present.
            if !r["A"].is_null() && !r["B"].is_null() {
                prop_assert_eq!(list.negate().matches(&r), !list.matches(&r));
            }
        }
    }
}
