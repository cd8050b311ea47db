//! FILENAME: condition-list/src/transform.rs
//! Condition list transformations.
//!
//! Every function here returns a new list. Inputs are never edited in place,
//! so a list handed to a caller stays exactly as it was built.

use rustc_hash::FxHashSet;

use crate::condition::{ConditionField, ConditionItem, ConditionList, Operation};
use crate::tree::ConditionNode;
use crate::value::DataValue;

impl ConditionList {
    /// ANDs non-empty lists together with outermost junctions at `level`.
    pub fn and_all(lists: &[ConditionList], level: u32) -> ConditionList {
        let nodes: Vec<ConditionNode> = lists.iter().filter_map(|l| l.to_node()).collect();
        ConditionList::from_optional_node(ConditionNode::all(nodes).as_ref(), level)
    }

    /// ORs non-empty lists together with outermost junctions at `level`.
    pub fn or_all(lists: &[ConditionList], level: u32) -> ConditionList {
        let nodes: Vec<ConditionNode> = lists.iter().filter_map(|l| l.to_node()).collect();
        ConditionList::from_optional_node(ConditionNode::any(nodes).as_ref(), level)
    }

    /// Logical negation. The empty list stays empty.
    pub fn negate(&self) -> ConditionList {
        let level = self.base_level();
        match self.to_node() {
            Some(node) => ConditionList::from_node(&node.negate(), level),
            None => ConditionList::new(),
        }
    }

    /// Drops every predicate on `column`, pruning groups left empty.
    pub fn without_field(&self, column: &str) -> ConditionList {
        let level = self.base_level();
        let pruned = self.to_node().and_then(|node| prune_column(node, column));
        ConditionList::from_optional_node(pruned.as_ref(), level)
    }

    /// Folds runs of adjacent OR'd siblings on one field into a single ONE-OF.
    ///
    /// A run is only folded when every member is a plain EQUAL or ONE-OF
    /// predicate and the run has at least `min_run` members; a run containing a
    /// BETWEEN, NULL, range or negated predicate is left untouched. The matched
    /// row set never changes.
    pub fn compact_or_to_in(&self, min_run: usize) -> ConditionList {
        let level = self.base_level();
        match self.to_node() {
            Some(node) => ConditionList::from_node(&node.compact_or_to_in(min_run.max(2)), level),
            None => self.clone(),
        }
    }

    /// Lowest level used by the list (the level of its outermost junctions).
    pub fn base_level(&self) -> u32 {
        self.entries()
            .iter()
            .map(|e| match e {
                crate::condition::ConditionEntry::Item(i) => i.level,
                crate::condition::ConditionEntry::Junction(j) => j.level,
            })
            .min()
            .unwrap_or(0)
    }
}

fn prune_column(node: ConditionNode, column: &str) -> Option<ConditionNode> {
    match node {
        ConditionNode::Leaf(item) => {
            if item.field.column == column {
                None
            } else {
                Some(ConditionNode::Leaf(item))
            }
        }
        ConditionNode::And(children) => ConditionNode::all(
            children.into_iter().filter_map(|c| prune_column(c, column)).collect(),
        ),
        ConditionNode::Or(children) => {
            let count = children.len();
            let kept: Vec<ConditionNode> =
                children.into_iter().filter_map(|c| prune_column(c, column)).collect();
            // Removing a disjunct widens the match to everything.
            if kept.len() < count {
                None
            } else {
                ConditionNode::any(kept)
            }
        }
    }
}

impl ConditionNode {
    /// Tree form of `ConditionList::compact_or_to_in`.
    pub fn compact_or_to_in(self, min_run: usize) -> ConditionNode {
        match self {
            ConditionNode::Leaf(item) => ConditionNode::Leaf(item),
            ConditionNode::And(children) => ConditionNode::And(
                children.into_iter().map(|c| c.compact_or_to_in(min_run)).collect(),
            ),
            ConditionNode::Or(children) => {
                let children: Vec<ConditionNode> =
                    children.into_iter().map(|c| c.compact_or_to_in(min_run)).collect();
                let folded = fold_or_runs(children, min_run);
                match ConditionNode::any(folded) {
                    Some(node) => node,
                    None => ConditionNode::Or(Vec::new()),
                }
            }
        }
    }
}

fn leaf_field(node: &ConditionNode) -> Option<&ConditionField> {
    match node {
        ConditionNode::Leaf(item) => Some(&item.field),
        _ => None,
    }
}

fn fold_or_runs(children: Vec<ConditionNode>, min_run: usize) -> Vec<ConditionNode> {
    let mut out: Vec<ConditionNode> = Vec::with_capacity(children.len());
    let mut run: Vec<ConditionNode> = Vec::new();

    for child in children {
        let same_field = match (run.first().and_then(leaf_field), leaf_field(&child)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        };
        if !same_field {
            flush_run(&mut run, &mut out, min_run);
        }
        if leaf_field(&child).is_some() {
            run.push(child);
        } else {
            out.push(child);
        }
    }
    flush_run(&mut run, &mut out, min_run);
    out
}

fn flush_run(run: &mut Vec<ConditionNode>, out: &mut Vec<ConditionNode>, min_run: usize) {
    let foldable = run.len() >= min_run
        && run.iter().all(|n| matches!(n, ConditionNode::Leaf(item) if item.is_in_compatible()));
    if !foldable {
        out.append(run);
        return;
    }

    let mut field: Option<ConditionField> = None;
    let mut seen: FxHashSet<DataValue> = FxHashSet::default();
    let mut values: Vec<DataValue> = Vec::new();
    for node in run.drain(..) {
        if let ConditionNode::Leaf(item) = node {
            debug_assert!(matches!(item.operation, Operation::Equal | Operation::OneOf));
            for value in item.values {
                if seen.insert(value.clone()) {
                    values.push(value);
                }
            }
            field.get_or_insert(item.field);
        }
    }
    if let Some(field) = field {
        out.push(ConditionNode::Leaf(ConditionItem::one_of(field, values)));
    }
}
