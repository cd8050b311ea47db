//! FILENAME: selection-engine/src/layout.rs
//! Layout tree of a nested calc grid.
//!
//! Built once per layout version. Every named layout cell has a binding and
//! up to two parents: the enclosing row group and the enclosing column group.

use rustc_hash::{FxHashMap, FxHashSet};

use drill_engine::Axis;

use crate::binding::CellBinding;

#[derive(Debug, Clone)]
struct LayoutNode {
    binding: CellBinding,
    row_parent: Option<String>,
    col_parent: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LayoutTree {
    nodes: FxHashMap<String, LayoutNode>,
}

impl LayoutTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or rebinds) a layout cell.
    pub fn add_cell(&mut self, name: impl Into<String>, binding: CellBinding) -> &mut Self {
        let name = name.into();
        match self.nodes.get_mut(&name) {
            Some(node) => node.binding = binding,
            None => {
                self.nodes.insert(
                    name,
                    LayoutNode {
                        binding,
                        row_parent: None,
                        col_parent: None,
                    },
                );
            }
        }
        self
    }

    pub fn set_row_parent(&mut self, child: &str, parent: impl Into<String>) -> &mut Self {
        if let Some(node) = self.nodes.get_mut(child) {
            node.row_parent = Some(parent.into());
        }
        self
    }

    pub fn set_col_parent(&mut self, child: &str, parent: impl Into<String>) -> &mut Self {
        if let Some(node) = self.nodes.get_mut(child) {
            node.col_parent = Some(parent.into());
        }
        self
    }

    pub fn binding(&self, name: &str) -> Option<&CellBinding> {
        self.nodes.get(name).map(|n| &n.binding)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Immediate parents: row parent first.
    pub fn parents(&self, name: &str) -> Vec<(Axis, &str)> {
        let Some(node) = self.nodes.get(name) else {
            return Vec::new();
        };
        let mut out = Vec::with_capacity(2);
        if let Some(parent) = &node.row_parent {
            out.push((Axis::Row, parent.as_str()));
        }
        if let Some(parent) = &node.col_parent {
            out.push((Axis::Column, parent.as_str()));
        }
        out
    }

    /// Every ancestor, nearest first. Each name appears once even when the
    /// layout reaches it along several routes.
    pub fn ancestors(&self, name: &str) -> Vec<(Axis, String)> {
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        seen.insert(name);
        let mut out: Vec<(Axis, String)> = Vec::new();
        let mut frontier: Vec<&str> = vec![name];
        while !frontier.is_empty() {
            let mut next = Vec::new();
            for current in frontier {
                for (axis, parent) in self.parents(current) {
                    if seen.insert(parent) {
                        out.push((axis, parent.to_string()));
                        next.push(parent);
                    }
                }
            }
            frontier = next;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ancestors_cover_both_axes() {
        let mut tree = LayoutTree::new();
        tree.add_cell("Region", CellBinding::column("Region"))
            .add_cell("State", CellBinding::column("State"))
            .add_cell("Year", CellBinding::column("Year"))
            .add_cell("Sales", CellBinding::formula("Sum(Sales)"));
        tree.set_row_parent("State", "Region")
            .set_row_parent("Sales", "State")
            .set_col_parent("Sales", "Year");

        let names: Vec<String> = tree.ancestors("Sales").into_iter().map(|(_, n)| n).collect();
        assert_eq!(names, vec!["State", "Year", "Region"]);
        assert_eq!(tree.parents("Sales")[1], (Axis::Column, "Year"));
    }

    #[test]
    fn test_cycles_terminate() {
        let mut tree = LayoutTree::new();
        tree.add_cell("A", CellBinding::column("A"))
            .add_cell("B", CellBinding::column("B"));
        tree.set_row_parent("A", "B").set_row_parent("B", "A");
        assert_eq!(tree.ancestors("A"), vec![(Axis::Row, "B".to_string())]);
    }
}
