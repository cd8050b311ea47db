//! FILENAME: selection-engine/src/chart.rs
//! Condition synthesis for chart selections.
//!
//! A chart selection is a set of plotted points, each identified by the
//! values of the fields mapped onto the chart. Three strategies turn the set
//! into a filter:
//! - `RangeKind::None`: OR of one AND block per point
//! - `RangeKind::Logical`: per-field min/max (or value set), ANDed across fields
//! - `RangeKind::Physical`: shared-prefix nesting, then OR -> ONE-OF compaction

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use condition_list::{ConditionItem, ConditionList, ConditionNode, DataValue};
use drill_engine::{log_debug, GroupingField};

use crate::synthesizer::ConditionSynthesizer;

// ============================================================================
// SELECTION MODEL
// ============================================================================

/// Observed value of one field at a point. Binned axes report a range.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldValue {
    Single(DataValue),
    Range(DataValue, DataValue),
}

/// One selected chart point: field name -> observed value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionPoint {
    pub values: BTreeMap<String, FieldValue>,
}

impl SelectionPoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<DataValue>) -> Self {
        self.values.insert(field.into(), FieldValue::Single(value.into()));
        self
    }

    pub fn with_range(
        mut self,
        field: impl Into<String>,
        low: impl Into<DataValue>,
        high: impl Into<DataValue>,
    ) -> Self {
        self.values
            .insert(field.into(), FieldValue::Range(low.into(), high.into()));
        self
    }
}

/// The selection's declared range kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RangeKind {
    None,
    Logical,
    Physical,
}

/// Orders chart fields: axis fields by bound axis position (outermost
/// first), then aesthetic fields (color, size, ...). Fields outside the
/// ranking are not mappable and never filtered on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldRank {
    pub axis_fields: Vec<GroupingField>,
    pub aesthetic_fields: Vec<GroupingField>,
}

impl FieldRank {
    pub fn new(axis_fields: Vec<GroupingField>, aesthetic_fields: Vec<GroupingField>) -> Self {
        FieldRank {
            axis_fields,
            aesthetic_fields,
        }
    }

    fn ranked(&self) -> impl Iterator<Item = &GroupingField> {
        self.axis_fields.iter().chain(self.aesthetic_fields.iter())
    }

    pub fn rank(&self, name: &str) -> Option<usize> {
        self.ranked().position(|f| f.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&GroupingField> {
        self.ranked().find(|f| f.name == name)
    }

    /// Ranked fields first in rank order, unranked ones after by name.
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        match (self.rank(a), self.rank(b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.cmp(b),
        }
    }

    /// The mappable values of a point in rank order.
    fn ranked_values<'a>(&'a self, point: &'a SelectionPoint) -> Vec<(&'a GroupingField, &'a FieldValue)> {
        for name in point.values.keys() {
            if self.rank(name).is_none() {
                log_debug!("SELECT", "chart field {} is not mapped, skipped", name);
            }
        }
        self.ranked()
            .filter_map(|field| point.values.get(&field.name).map(|value| (field, value)))
            .collect()
    }
}

// ============================================================================
// SYNTHESIS
// ============================================================================

impl ConditionSynthesizer {
    /// Filter matching the selected chart points.
    pub fn from_chart_selection(
        &self,
        points: &[SelectionPoint],
        kind: RangeKind,
        rank: &FieldRank,
    ) -> ConditionList {
        let node = match kind {
            RangeKind::None => self.point_blocks(points, rank),
            RangeKind::Logical => self.logical_range(points, rank),
            RangeKind::Physical => self.physical_range(points, rank),
        };
        let list = ConditionList::from_optional_node(node.as_ref(), 0);
        if kind == RangeKind::Physical && self.config().compact_or_to_in {
            list.compact_or_to_in(self.config().min_in_values)
        } else {
            list
        }
    }

    fn leaf(&self, field: &GroupingField, value: &FieldValue) -> ConditionNode {
        let target = field.condition_field();
        let item = match value {
            FieldValue::Single(v) if v.is_null() => ConditionItem::is_null(target),
            FieldValue::Single(v) if v.is_fractional() => {
                let tol = self.config().float_tolerance;
                let n = v.as_f64().unwrap_or_default();
                ConditionItem::between(target, (n - tol).into(), (n + tol).into())
            }
            FieldValue::Single(v) => ConditionItem::equal(target, v.clone()),
            FieldValue::Range(low, high) if low.is_null() && high.is_null() => ConditionItem::is_null(target),
            FieldValue::Range(low, high) => ConditionItem::between(target, low.clone(), high.clone()),
        };
        ConditionNode::Leaf(item)
    }

    fn point_blocks(&self, points: &[SelectionPoint], rank: &FieldRank) -> Option<ConditionNode> {
        let blocks: Vec<ConditionNode> = points
            .iter()
            .filter_map(|point| {
                let leaves = rank
                    .ranked_values(point)
                    .into_iter()
                    .map(|(field, value)| self.leaf(field, value))
                    .collect();
                ConditionNode::all(leaves)
            })
            .collect();
        ConditionNode::any(blocks)
    }

    fn logical_range(&self, points: &[SelectionPoint], rank: &FieldRank) -> Option<ConditionNode> {
        let mut per_field: Vec<ConditionNode> = Vec::new();
        for field in rank.ranked() {
            let mut agg = FieldAggregate::default();
            for point in points {
                match point.values.get(&field.name) {
                    Some(FieldValue::Single(v)) => agg.add(v),
                    Some(FieldValue::Range(low, high)) => {
                        agg.add(low);
                        agg.add(high);
                    }
                    None => {}
                }
            }
            per_field.extend(agg.into_node(field));
        }
        ConditionNode::all(per_field)
    }

    fn physical_range(&self, points: &[SelectionPoint], rank: &FieldRank) -> Option<ConditionNode> {
        let mut roots: Vec<PrefixNode> = Vec::new();
        for point in points {
            let values = rank.ranked_values(point);
            PrefixNode::insert(&mut roots, &values);
        }
        ConditionNode::any(roots.iter().map(|n| n.to_condition(self)).collect())
    }
}

// ============================================================================
// LOGICAL RANGE
// ============================================================================

#[derive(Debug, Default)]
struct FieldAggregate {
    min: Option<DataValue>,
    max: Option<DataValue>,
    saw_true: bool,
    saw_false: bool,
    texts: Vec<DataValue>,
    null_seen: bool,
}

impl FieldAggregate {
    fn add(&mut self, value: &DataValue) {
        match value {
            DataValue::Null => self.null_seen = true,
            DataValue::Boolean(true) => self.saw_true = true,
            DataValue::Boolean(false) => self.saw_false = true,
            DataValue::Text(_) => {
                if !self.texts.contains(value) {
                    self.texts.push(value.clone());
                }
            }
            DataValue::Number(_) | DataValue::Date(_) => {
                if self.min.as_ref().map_or(true, |m| value < m) {
                    self.min = Some(value.clone());
                }
                if self.max.as_ref().map_or(true, |m| value > m) {
                    self.max = Some(value.clone());
                }
            }
        }
    }

    fn into_node(self, field: &GroupingField) -> Option<ConditionNode> {
        let target = field.condition_field();
        let mut alternatives: Vec<ConditionNode> = Vec::new();

        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min == max {
                alternatives.push(ConditionNode::Leaf(ConditionItem::equal(target.clone(), min)));
            } else {
                alternatives.push(ConditionNode::And(vec![
                    ConditionNode::Leaf(ConditionItem::greater_or_equal(target.clone(), min)),
                    ConditionNode::Leaf(ConditionItem::less_or_equal(target.clone(), max)),
                ]));
            }
        }
        if self.saw_true {
            alternatives.push(ConditionNode::Leaf(ConditionItem::equal(target.clone(), true.into())));
        }
        if self.saw_false {
            alternatives.push(ConditionNode::Leaf(ConditionItem::equal(target.clone(), false.into())));
        }
        if !self.texts.is_empty() {
            alternatives.push(ConditionNode::Leaf(ConditionItem::one_of(target.clone(), self.texts)));
        }
        if self.null_seen {
            alternatives.push(ConditionNode::Leaf(ConditionItem::is_null(target)));
        }
        ConditionNode::any(alternatives)
    }
}

// ============================================================================
// PHYSICAL RANGE
// ============================================================================

/// One field value shared by a run of points. Points are grouped under
/// their first-seen prefix, so only the fields after the shared prefix are
/// repeated per point.
struct PrefixNode<'a> {
    field: &'a GroupingField,
    value: &'a FieldValue,
    /// A point ends here, so the node matches on its own.
    terminal: bool,
    children: Vec<PrefixNode<'a>>,
}

impl<'a> PrefixNode<'a> {
    fn insert(nodes: &mut Vec<PrefixNode<'a>>, values: &[(&'a GroupingField, &'a FieldValue)]) {
        let Some((&(field, value), rest)) = values.split_first() else {
            return;
        };
        let index = match nodes
            .iter()
            .position(|n| n.field.name == field.name && n.value == value)
        {
            Some(index) => index,
            None => {
                nodes.push(PrefixNode {
                    field,
                    value,
                    terminal: false,
                    children: Vec::new(),
                });
                nodes.len() - 1
            }
        };
        if rest.is_empty() {
            nodes[index].terminal = true;
        } else {
            PrefixNode::insert(&mut nodes[index].children, rest);
        }
    }

    fn to_condition(&self, synth: &ConditionSynthesizer) -> ConditionNode {
        let own = synth.leaf(self.field, self.value);
        if self.terminal {
            return own;
        }
        let below = ConditionNode::any(self.children.iter().map(|c| c.to_condition(synth)).collect());
        match below {
            Some(below) => ConditionNode::all(vec![own.clone(), below]).unwrap_or(own),
            None => own,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SynthesisConfig;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn state_year() -> FieldRank {
        FieldRank::new(vec![GroupingField::new("State"), GroupingField::new("Year")], Vec::new())
    }

    fn point(state: &str, year: i32) -> SelectionPoint {
        SelectionPoint::new().with("State", state).with("Year", year)
    }

    fn row(pairs: &[(&str, DataValue)]) -> HashMap<String, DataValue> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn uncompacted() -> ConditionSynthesizer {
        ConditionSynthesizer::new(SynthesisConfig {
            compact_or_to_in: false,
            ..SynthesisConfig::default()
        })
    }

    #[test]
    fn test_physical_range_nests_shared_prefixes() {
        let points = vec![point("NJ", 2023), point("NJ", 2024), point("CA", 2023)];
        let list = uncompacted().from_chart_selection(&points, RangeKind::Physical, &state_year());
        assert_eq!(
            list.to_string(),
            "State=NJ AND (Year=2023 OR Year=2024) OR State=CA AND Year=2023"
        );

        let compacted = ConditionSynthesizer::default().from_chart_selection(&points, RangeKind::Physical, &state_year());
        assert_eq!(
            compacted.to_string(),
            "State=NJ AND Year ONE-OF {2023,2024} OR State=CA AND Year=2023"
        );
    }

    #[test]
    fn test_physical_range_orders_fields_by_rank() {
        // Year is the outer axis here, so points group by year.
        let rank = FieldRank::new(vec![GroupingField::new("Year")], vec![GroupingField::new("State")]);
        let points = vec![point("NJ", 2023), point("CA", 2023)];
        let list = ConditionSynthesizer::default().from_chart_selection(&points, RangeKind::Physical, &rank);
        assert_eq!(list.to_string(), "Year=2023 AND State ONE-OF {NJ,CA}");
        assert_eq!(rank.compare("Year", "State"), Ordering::Less);
        assert_eq!(rank.compare("Other", "State"), Ordering::Greater);
    }

    #[test]
    fn test_none_strategy_ors_point_blocks() {
        let points = vec![point("NJ", 2023), point("CA", 2024)];
        let list = ConditionSynthesizer::default().from_chart_selection(&points, RangeKind::None, &state_year());
        assert_eq!(list.to_string(), "State=NJ AND Year=2023 OR State=CA AND Year=2024");
    }

    #[test]
    fn test_fractional_values_get_a_tolerance() {
        let rank = FieldRank::new(vec![GroupingField::new("Price")], Vec::new());
        let points = vec![SelectionPoint::new().with("Price", 9.99).with("Unmapped", 1)];
        let list = ConditionSynthesizer::default().from_chart_selection(&points, RangeKind::None, &rank);
        assert_eq!(list.item_count(), 1);
        assert!(list.matches(&row(&[("Price", 9.99.into())])));
        assert!(list.matches(&row(&[("Price", (9.99 + 1e-9).into())])));
        assert!(!list.matches(&row(&[("Price", 9.98.into())])));
    }

    #[test]
    fn test_logical_range_aggregates_per_field() {
        let rank = FieldRank::new(
            vec![GroupingField::new("Year")],
            vec![GroupingField::new("Flag"), GroupingField::new("State")],
        );
        let points = vec![
            SelectionPoint::new().with("Year", 2021).with("Flag", true).with("State", "NJ"),
            SelectionPoint::new().with("Year", 2023).with("Flag", false).with("State", "NJ"),
            SelectionPoint::new().with("Year", DataValue::Null).with("Flag", true).with("State", "CA"),
        ];
        let list = ConditionSynthesizer::default().from_chart_selection(&points, RangeKind::Logical, &rank);
        assert_eq!(
            list.to_string(),
            "(Year>=2021 AND Year<=2023 OR Year IS NULL) AND (Flag=true OR Flag=false) AND State ONE-OF {NJ,CA}"
        );

        let single = vec![SelectionPoint::new().with("Year", 2022)];
        let list = ConditionSynthesizer::default().from_chart_selection(&single, RangeKind::Logical, &rank);
        assert_eq!(list.to_string(), "Year=2022");
    }

    #[test]
    fn test_binned_ranges_and_empty_selection() {
        let rank = FieldRank::new(vec![GroupingField::new("Age")], Vec::new());
        let points = vec![SelectionPoint::new().with_range("Age", 20, 29)];
        let list = ConditionSynthesizer::default().from_chart_selection(&points, RangeKind::None, &rank);
        assert_eq!(list.to_string(), "Age BETWEEN 20 AND 29");
        assert!(ConditionSynthesizer::default()
            .from_chart_selection(&[], RangeKind::Physical, &rank)
            .is_empty());
    }

    fn points_strategy() -> impl Strategy<Value = Vec<(usize, i32)>> {
        prop::collection::vec((0usize..3, 2021i32..2025), 1..12)
    }

    proptest! {
        #[test]
        fn compaction_preserves_matched_rows(raw in points_strategy()) {
            let states = ["NJ", "CA", "NY"];
            let points: Vec<SelectionPoint> = raw.iter().map(|(s, y)| point(states[*s], *y)).collect();
            let rank = state_year();

            let compacted = ConditionSynthesizer::default().from_chart_selection(&points, RangeKind::Physical, &rank);
            let nested = uncompacted().from_chart_selection(&points, RangeKind::Physical, &rank);
            let flat = ConditionSynthesizer::default().from_chart_selection(&points, RangeKind::None, &rank);

            for state in states.iter().chain(["TX"].iter()) {
                for year in 2020..2026 {
                    let r = row(&[("State", (*state).into()), ("Year", year.into())]);
                    let expected = flat.matches(&r);
                    prop_assert_eq!(compacted.matches(&r), expected);
                    prop_assert_eq!(nested.matches(&r), expected);
                }
            }
        }
    }
}
