//! FILENAME: condition-list/src/tree.rs
//! Tree form of a condition list.
//!
//! Synthesis code builds `ConditionNode` trees (it is easier to nest groups
//! with pointers) and flattens them with `ConditionList::from_node`. The flat
//! list is what leaves this crate.

use std::fmt;

use crate::condition::{
    ConditionEntry, ConditionItem, ConditionList, Junction, JunctionOperator,
};

/// A boolean expression over condition items.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionNode {
    Leaf(ConditionItem),
    And(Vec<ConditionNode>),
    Or(Vec<ConditionNode>),
}

impl ConditionNode {
    /// Conjunction of `children`, or None when there is nothing to test.
    /// Nested conjunctions are flattened and a single child is returned as is.
    pub fn all(children: Vec<ConditionNode>) -> Option<ConditionNode> {
        Self::combine(Junction::And, children)
    }

    /// Disjunction of `children`, or None when there is nothing to test.
    pub fn any(children: Vec<ConditionNode>) -> Option<ConditionNode> {
        Self::combine(Junction::Or, children)
    }

    fn combine(junction: Junction, children: Vec<ConditionNode>) -> Option<ConditionNode> {
        let mut flat = Vec::with_capacity(children.len());
        for child in children {
            match (junction, child) {
                (Junction::And, ConditionNode::And(inner)) => flat.extend(inner),
                (Junction::Or, ConditionNode::Or(inner)) => flat.extend(inner),
                (_, other) => flat.push(other),
            }
        }
        match flat.len() {
            0 => None,
            1 => flat.pop(),
            _ => Some(match junction {
                Junction::And => ConditionNode::And(flat),
                Junction::Or => ConditionNode::Or(flat),
            }),
        }
    }

    /// Applies De Morgan's laws down to the leaves.
    pub fn negate(self) -> ConditionNode {
        match self {
            ConditionNode::Leaf(item) => ConditionNode::Leaf(item.negate()),
            ConditionNode::And(children) => {
                ConditionNode::Or(children.into_iter().map(ConditionNode::negate).collect())
            }
            ConditionNode::Or(children) => {
                ConditionNode::And(children.into_iter().map(ConditionNode::negate).collect())
            }
        }
    }

    /// Leaves in left-to-right order.
    pub fn leaves(&self) -> Vec<&ConditionItem> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a ConditionItem>) {
        match self {
            ConditionNode::Leaf(item) => out.push(item),
            ConditionNode::And(children) | ConditionNode::Or(children) => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
        }
    }

    /// Writes the node as flat entries starting at `level`.
    ///
    /// An OR group nested in an AND group is pushed one level deeper. An AND
    /// group nested in an OR group stays on the same level because AND binds
    /// tighter than OR within a level.
    fn flatten(&self, level: u32, out: &mut Vec<ConditionEntry>) {
        match self {
            ConditionNode::Leaf(item) => {
                out.push(ConditionEntry::Item(item.clone().with_level(level)));
            }
            ConditionNode::And(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        out.push(ConditionEntry::Junction(JunctionOperator::new(Junction::And, level)));
                    }
                    let child_level = match child {
                        ConditionNode::Or(_) => level + 1,
                        _ => level,
                    };
                    child.flatten(child_level, out);
                }
            }
            ConditionNode::Or(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        out.push(ConditionEntry::Junction(JunctionOperator::new(Junction::Or, level)));
                    }
                    child.flatten(level, out);
                }
            }
        }
    }

    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>, parent: Option<Junction>) -> fmt::Result {
        match self {
            ConditionNode::Leaf(item) => write!(f, "{}", item),
            ConditionNode::And(children) => Self::fmt_group(f, children, Junction::And, false),
            ConditionNode::Or(children) => {
                let wrap = parent == Some(Junction::And);
                Self::fmt_group(f, children, Junction::Or, wrap)
            }
        }
    }

    fn fmt_group(
        f: &mut fmt::Formatter<'_>,
        children: &[ConditionNode],
        junction: Junction,
        wrap: bool,
    ) -> fmt::Result {
        if wrap {
            f.write_str("(")?;
        }
        for (i, child) in children.iter().enumerate() {
            if i > 0 {
                write!(f, " {} ", junction)?;
            }
            child.fmt_nested(f, Some(junction))?;
        }
        if wrap {
            f.write_str(")")?;
        }
        Ok(())
    }
}

impl fmt::Display for ConditionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_nested(f, None)
    }
}

impl From<ConditionItem> for ConditionNode {
    fn from(item: ConditionItem) -> Self {
        ConditionNode::Leaf(item)
    }
}

// ============================================================================
// LIST <-> TREE
// ============================================================================

impl ConditionList {
    /// Flattens a tree into a list whose outermost junctions sit at `base_level`.
    pub fn from_node(node: &ConditionNode, base_level: u32) -> ConditionList {
        let mut entries = Vec::new();
        node.flatten(base_level, &mut entries);
        ConditionList::from_entries(entries)
    }

    /// Flattens an optional tree; None yields the empty list.
    pub fn from_optional_node(node: Option<&ConditionNode>, base_level: u32) -> ConditionList {
        match node {
            Some(node) => ConditionList::from_node(node, base_level),
            None => ConditionList::new(),
        }
    }

    /// Recovers the expression tree. Returns None for empty or malformed lists.
    pub fn to_node(&self) -> Option<ConditionNode> {
        if self.is_empty() || !self.is_valid() {
            return None;
        }
        Some(parse_range(self.entries()))
    }
}

/// Parses a well-formed slice (item (junction item)*).
fn parse_range(entries: &[ConditionEntry]) -> ConditionNode {
    if entries.len() == 1 {
        if let ConditionEntry::Item(item) = &entries[0] {
            // Levels only matter in the flat form.
            return ConditionNode::Leaf(item.clone().with_level(0));
        }
    }

    let min_level = entries
        .iter()
        .filter_map(|e| match e {
            ConditionEntry::Junction(j) => Some(j.level),
            ConditionEntry::Item(_) => None,
        })
        .min()
        .unwrap_or(0);

    // Split at the loosest junctions.
    let mut segments: Vec<&[ConditionEntry]> = Vec::new();
    let mut operators: Vec<Junction> = Vec::new();
    let mut start = 0;
    for (i, entry) in entries.iter().enumerate() {
        if let ConditionEntry::Junction(j) = entry {
            if j.level == min_level {
                segments.push(&entries[start..i]);
                operators.push(j.junction);
                start = i + 1;
            }
        }
    }
    segments.push(&entries[start..]);

    // AND before OR.
    let mut or_terms: Vec<ConditionNode> = Vec::new();
    let mut and_terms: Vec<ConditionNode> = vec![parse_range(segments[0])];
    for (junction, segment) in operators.iter().zip(segments.iter().skip(1)) {
        let node = parse_range(segment);
        match junction {
            Junction::And => and_terms.push(node),
            Junction::Or => {
                let group = std::mem::take(&mut and_terms);
                or_terms.extend(ConditionNode::all(group));
                and_terms.push(node);
            }
        }
    }
    or_terms.extend(ConditionNode::all(and_terms));

    match ConditionNode::any(or_terms) {
        Some(node) => node,
        None => ConditionNode::And(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::ConditionField;

    fn eq(column: &str, value: &str) -> ConditionNode {
        ConditionNode::Leaf(ConditionItem::equal(ConditionField::column(column), value.into()))
    }

    fn levels(list: &ConditionList) -> Vec<u32> {
        list.entries()
            .iter()
            .map(|e| match e {
                ConditionEntry::Item(i) => i.level,
                ConditionEntry::Junction(j) => j.level,
            })
            .collect()
    }

    #[test]
    fn test_all_and_any_normalize() {
        assert_eq!(ConditionNode::all(Vec::new()), None);
        assert_eq!(ConditionNode::all(vec![eq("A", "1")]), Some(eq("A", "1")));

        let nested = ConditionNode::all(vec![
            eq("A", "1"),
            ConditionNode::And(vec![eq("B", "2"), eq("C", "3")]),
        ]);
        match nested {
            Some(ConditionNode::And(children)) => assert_eq!(children.len(), 3),
            other => panic!("expected flat AND, got {:?}", other),
        }
    }

    #[test]
    fn test_flatten_pushes_or_under_and() {
        let node = ConditionNode::Or(vec![
            ConditionNode::And(vec![
                eq("State", "NJ"),
                ConditionNode::Or(vec![eq("Year", "2023"), eq("Year", "2024")]),
            ]),
            ConditionNode::And(vec![eq("State", "CA"), eq("Year", "2023")]),
        ]);
        let list = ConditionList::from_node(&node, 0);
        assert_eq!(levels(&list), vec![0, 0, 1, 1, 1, 0, 0, 0, 0]);
        assert_eq!(list.to_node(), Some(node.clone()));
        assert_eq!(
            list.to_string(),
            "State=NJ AND (Year=2023 OR Year=2024) OR State=CA AND Year=2023"
        );
    }

    #[test]
    fn test_base_level_offsets_everything() {
        let node = ConditionNode::And(vec![
            eq("A", "1"),
            ConditionNode::Or(vec![eq("B", "1"), eq("B", "2")]),
        ]);
        let list = ConditionList::from_node(&node, 2);
        assert_eq!(levels(&list), vec![2, 2, 3, 3, 3]);
        assert_eq!(list.to_node(), Some(node));
    }

    #[test]
    fn test_parse_uses_and_precedence_within_a_level() {
        // A OR B AND C, all at level 0, reads as A OR (B AND C).
        let mut list = ConditionList::single(ConditionItem::equal(ConditionField::column("A"), "1".into()));
        list.append(
            JunctionOperator::new(Junction::Or, 0),
            ConditionItem::equal(ConditionField::column("B"), "1".into()),
        );
        list.append(
            JunctionOperator::new(Junction::And, 0),
            ConditionItem::equal(ConditionField::column("C"), "1".into()),
        );
        let expected = ConditionNode::Or(vec![
            eq("A", "1"),
            ConditionNode::And(vec![eq("B", "1"), eq("C", "1")]),
        ]);
        assert_eq!(list.to_node(), Some(expected));
    }

    #[test]
    fn test_negate_applies_de_morgan() {
        let node = ConditionNode::And(vec![eq("A", "1"), eq("B", "2")]).negate();
        match node {
            ConditionNode::Or(children) => {
                assert!(children.iter().all(|c| matches!(c, ConditionNode::Leaf(i) if i.negated)));
            }
            other => panic!("expected OR, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_and_invalid_lists_have_no_tree() {
        assert_eq!(ConditionList::new().to_node(), None);
        let invalid = ConditionList::from_entries(vec![ConditionEntry::Junction(
            JunctionOperator::new(Junction::And, 0),
        )]);
        assert_eq!(invalid.to_node(), None);
        assert_eq!(invalid.to_string(), "<invalid condition list>");
    }
}
