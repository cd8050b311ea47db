//! FILENAME: drill-engine/src/tracker.rs
//! Hierarchy drill tracker.
//!
//! Remembers which header values the user has expanded, per grouping field,
//! and keeps that memory consistent while fields are added, removed or
//! reordered. `update_hierarchy` must run after every binding change and
//! before any other call.
//!
//! One tracker per view. All calls for a view are sequential; the only
//! interior mutability is the lazily rebuilt header index.

use std::cell::RefCell;
use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use condition_list::format_date_level_name;

use crate::config::DrillConfig;
use crate::definition::{Axis, CubeModel, GroupingField};
use crate::grid::{drill_path_at, GridAccessor};
use crate::path::DrillPath;
use crate::state::ExpandedState;
use crate::{log_debug, log_enter, log_exit};

// ============================================================================
// DRILL OPERATION
// ============================================================================

/// The drill operator shown next to a header value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DrillOp {
    None,
    Expand,
    Collapse,
}

impl DrillOp {
    pub fn as_str(self) -> &'static str {
        match self {
            DrillOp::None => "",
            DrillOp::Expand => "+",
            DrillOp::Collapse => "-",
        }
    }
}

impl fmt::Display for DrillOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// INTERNAL BOOKKEEPING
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum HierarchyKey {
    /// Date levels of one column.
    Date(String),
    /// A cube/model hierarchy by name.
    Cube(String),
}

/// Where a bound field sits in its drill hierarchy.
#[derive(Debug, Clone)]
struct Placement {
    key: HierarchyKey,
    rank: usize,
    /// Name of the next finer level, bound or not.
    next: Option<String>,
}

fn placement(field: &GroupingField, cube: Option<&CubeModel>) -> Option<Placement> {
    if field.is_derived() {
        return None;
    }
    if let Some(level) = field.date_level {
        let rank = level.drill_rank()?;
        return Some(Placement {
            key: HierarchyKey::Date(field.column.clone()),
            rank,
            next: level
                .next_level()
                .map(|next| format_date_level_name(&field.column, next)),
        });
    }
    if field.cube_sourced || field.model_sourced {
        let (hierarchy, rank) = cube?.hierarchy_of(&field.name)?;
        return Some(Placement {
            key: HierarchyKey::Cube(hierarchy.name.clone()),
            rank,
            next: hierarchy.levels.get(rank + 1).cloned(),
        });
    }
    None
}

/// The context a field's drill paths were recorded in. A path is only
/// meaningful while this context is unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FieldChain {
    axis: Axis,
    /// Fields before this one on the same axis (the path prefix).
    prefix: Vec<String>,
    /// Ancestors via the parent map, nearest first.
    ancestors: Vec<String>,
}

/// Field -> header band position, for one grid instance.
#[derive(Debug, Default)]
struct HeaderIndex {
    identity: Option<u64>,
    positions: FxHashMap<String, (Axis, usize)>,
}

impl HeaderIndex {
    fn rebuild<G: GridAccessor + ?Sized>(&mut self, grid: &G) {
        self.positions.clear();
        for col in 0..grid.header_col_count() {
            for row in grid.header_row_count()..grid.row_count() {
                let path = grid.data_path(row, col);
                if let (Some(field), Some(Axis::Row)) = (path.header_field(), path.axis) {
                    self.positions.entry(field.to_string()).or_insert((Axis::Row, col));
                    break;
                }
            }
        }
        for row in 0..grid.header_row_count() {
            for col in grid.header_col_count()..grid.col_count() {
                let path = grid.data_path(row, col);
                if let (Some(field), Some(Axis::Column)) = (path.header_field(), path.axis) {
                    self.positions.entry(field.to_string()).or_insert((Axis::Column, row));
                    break;
                }
            }
        }
        self.identity = Some(grid.identity());
    }
}

// ============================================================================
// TRACKER
// ============================================================================

pub struct HierarchyDrillTracker {
    config: DrillConfig,

    /// Bound fields by name.
    fields: FxHashMap<String, GroupingField>,
    row_fields: Vec<String>,
    col_fields: Vec<String>,

    /// Field -> nearest coarser bound field of the same hierarchy.
    parent_map: FxHashMap<String, String>,
    /// Field -> next finer level (bound if possible). Survives rebuilds
    /// until the cube/model identity changes.
    child_map: FxHashMap<String, String>,
    chains: FxHashMap<String, FieldChain>,
    drill_ops: FxHashMap<String, DrillOp>,

    expanded: FxHashMap<String, FxHashSet<DrillPath>>,

    cube_identity: Option<String>,
    header_index: RefCell<HeaderIndex>,
}

impl HierarchyDrillTracker {
    pub fn new(config: DrillConfig) -> Self {
        HierarchyDrillTracker {
            config,
            fields: FxHashMap::default(),
            row_fields: Vec::new(),
            col_fields: Vec::new(),
            parent_map: FxHashMap::default(),
            child_map: FxHashMap::default(),
            chains: FxHashMap::default(),
            drill_ops: FxHashMap::default(),
            expanded: FxHashMap::default(),
            cube_identity: None,
            header_index: RefCell::new(HeaderIndex::default()),
        }
    }

    pub fn with_default_config() -> Self {
        Self::new(DrillConfig::default())
    }

    pub fn config(&self) -> &DrillConfig {
        &self.config
    }

    // ------------------------------------------------------------------------
    // Binding changes
    // ------------------------------------------------------------------------

    /// Rebuilds the parent/child maps for a new binding and prunes every
    /// expanded path whose context changed.
    pub fn update_hierarchy(
        &mut self,
        row_fields: &[GroupingField],
        col_fields: &[GroupingField],
        cube: Option<&CubeModel>,
    ) {
        log_enter!("DRILL", "update_hierarchy", "rows={} cols={}", row_fields.len(), col_fields.len());

        let identity = cube.map(|c| c.identity.clone());
        if identity != self.cube_identity {
            // Expansion recorded against a dead hierarchy is meaningless.
            self.child_map.clear();
            let dead: Vec<String> = self
                .expanded
                .keys()
                .filter(|name| {
                    self.fields
                        .get(*name)
                        .map_or(false, |f| f.cube_sourced || f.model_sourced)
                })
                .cloned()
                .collect();
            for name in dead {
                log_debug!("DRILL", "cube changed, dropping expansion of {}", name);
                self.expanded.remove(&name);
            }
            self.cube_identity = identity;
        }

        let old_children = bound_children(&self.parent_map);

        self.fields.clear();
        self.parent_map.clear();
        self.drill_ops.clear();
        self.row_fields = row_fields.iter().map(|f| f.name.clone()).collect();
        self.col_fields = col_fields.iter().map(|f| f.name.clone()).collect();

        for (axis, list) in [(Axis::Row, row_fields), (Axis::Column, col_fields)] {
            self.link_axis(axis, list, cube);
        }

        let new_children = bound_children(&self.parent_map);
        let new_chains = self.compute_chains();

        let mut dropped: FxHashSet<String> = FxHashSet::default();
        for name in self.expanded.keys() {
            match new_chains.get(name) {
                None => {
                    dropped.insert(name.clone());
                }
                Some(chain) => {
                    if self.chains.get(name).map_or(false, |old| old != chain) {
                        dropped.insert(name.clone());
                    }
                }
            }
        }
        for (parent, old_child) in &old_children {
            // A child that merely became unbound leaves the parent valid.
            if let Some(new_child) = new_children.get(parent) {
                if new_child != old_child {
                    dropped.insert(parent.clone());
                }
            }
        }
        loop {
            let more: Vec<String> = self
                .expanded
                .keys()
                .filter(|name| !dropped.contains(*name))
                .filter(|name| {
                    new_chains
                        .get(*name)
                        .map_or(false, |c| c.ancestors.iter().any(|a| dropped.contains(a)))
                })
                .cloned()
                .collect();
            if more.is_empty() {
                break;
            }
            dropped.extend(more);
        }

        for name in &dropped {
            if let Some(paths) = self.expanded.remove(name) {
                log_debug!("DRILL", "pruned {} stale expanded paths of {}", paths.len(), name);
            }
        }

        self.chains = new_chains;
        *self.header_index.borrow_mut() = HeaderIndex::default();

        log_exit!("DRILL", "update_hierarchy", "parents={} expanded_fields={}", self.parent_map.len(), self.expanded.len());
    }

    fn link_axis(&mut self, axis: Axis, list: &[GroupingField], cube: Option<&CubeModel>) {
        let placements: Vec<Option<Placement>> = list.iter().map(|f| placement(f, cube)).collect();

        for (i, field) in list.iter().enumerate() {
            self.fields.insert(field.name.clone(), field.clone());

            let Some(p) = &placements[i] else {
                self.drill_ops.insert(field.name.clone(), DrillOp::None);
                continue;
            };

            let mut parent: Option<(usize, &str)> = None;
            let mut child: Option<(usize, &str)> = None;
            for (j, other) in list.iter().enumerate() {
                if j == i {
                    continue;
                }
                let Some(q) = &placements[j] else { continue };
                if q.key != p.key {
                    continue;
                }
                if q.rank < p.rank && parent.map_or(true, |(r, _)| q.rank > r) {
                    parent = Some((q.rank, other.name.as_str()));
                }
                if q.rank > p.rank && child.map_or(true, |(r, _)| q.rank < r) {
                    child = Some((q.rank, other.name.as_str()));
                }
            }

            if let Some((_, parent)) = parent {
                self.parent_map.insert(field.name.clone(), parent.to_string());
            }
            let op = match (child, &p.next) {
                (Some((_, child)), _) => {
                    self.child_map.insert(field.name.clone(), child.to_string());
                    DrillOp::Collapse
                }
                (None, Some(next)) => {
                    self.child_map.insert(field.name.clone(), next.clone());
                    DrillOp::Expand
                }
                (None, None) => DrillOp::None,
            };
            log_debug!("DRILL", "{} ({:?}) op={:?} parent={:?}", field.name, axis, op, self.parent_map.get(&field.name));
            self.drill_ops.insert(field.name.clone(), op);
        }
    }

    fn compute_chains(&self) -> FxHashMap<String, FieldChain> {
        let mut chains = FxHashMap::default();
        for (axis, list) in [(Axis::Row, &self.row_fields), (Axis::Column, &self.col_fields)] {
            for (i, name) in list.iter().enumerate() {
                chains.insert(
                    name.clone(),
                    FieldChain {
                        axis,
                        prefix: list[..i].to_vec(),
                        ancestors: self.ancestors_of(name),
                    },
                );
            }
        }
        chains
    }

    /// Ancestors via the parent map, nearest first.
    pub fn ancestors_of(&self, field: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut current = field;
        while let Some(parent) = self.parent_map.get(current) {
            if parent == field || out.contains(parent) {
                break;
            }
            out.push(parent.clone());
            current = parent.as_str();
        }
        out
    }

    /// Every field reachable from `field` through the child map.
    fn descendants_of(&self, field: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut current = field;
        while let Some(child) = self.child_map.get(current) {
            if child == field || out.contains(child) {
                break;
            }
            out.push(child.clone());
            current = child.as_str();
        }
        out
    }

    // ------------------------------------------------------------------------
    // Expand / collapse
    // ------------------------------------------------------------------------

    /// Expands or collapses the header value at (row, col).
    ///
    /// On expand, returns false when the field has no parent (a hierarchy
    /// root). On collapse, every descendant path under the collapsed one is
    /// removed as well, and the return value tells whether the field still
    /// has expanded values.
    pub fn set_expanded<G: GridAccessor + ?Sized>(
        &mut self,
        table: &G,
        row: usize,
        col: usize,
        expand: bool,
    ) -> bool {
        let data_path = table.data_path(row, col);
        let (Some(field), Some(axis)) = (data_path.header_field(), data_path.axis) else {
            return false;
        };
        let field = field.to_string();
        let Some(path) = drill_path_at(table, row, col) else {
            return false;
        };

        if expand {
            log_debug!("DRILL", "expand {} {}", field, path);
            return self.expand_path(&field, path);
        }

        log_debug!("DRILL", "collapse {} {}", field, path);
        self.remove_path(&field, &path);
        self.collapse_adjacent(table, row, col, axis, &path);
        self.remove_descendant_paths(&field, &path);
        self.has_expanded(&field)
    }

    /// Path-level expand. Returns false when the field has no parent.
    pub fn expand_path(&mut self, field: &str, path: DrillPath) -> bool {
        self.expanded.entry(field.to_string()).or_default().insert(path);
        self.parent_map.contains_key(field)
    }

    /// Path-level collapse; descendant paths of every finer level go too.
    pub fn collapse_path(&mut self, field: &str, path: &DrillPath) {
        self.remove_path(field, path);
        self.remove_descendant_paths(field, path);
    }

    /// Drops every expanded value of `field` and of its finer levels.
    pub fn collapse_field(&mut self, field: &str) {
        self.expanded.remove(field);
        for name in self.descendants_of(field) {
            self.expanded.remove(&name);
        }
    }

    pub fn clear_expanded(&mut self) {
        self.expanded.clear();
    }

    fn remove_path(&mut self, field: &str, path: &DrillPath) {
        if let Some(paths) = self.expanded.get_mut(field) {
            paths.remove(path);
            if paths.is_empty() {
                self.expanded.remove(field);
            }
        }
    }

    fn remove_descendant_paths(&mut self, field: &str, path: &DrillPath) {
        for name in self.descendants_of(field) {
            if let Some(paths) = self.expanded.get_mut(&name) {
                paths.retain(|p| !p.is_descendant_of(path));
                if paths.is_empty() {
                    self.expanded.remove(&name);
                }
            }
        }
    }

    /// A merged crosstab can repeat one path over several rows (columns).
    /// Walks them in both directions and drops the expanded paths of every
    /// deeper header along the way.
    fn collapse_adjacent<G: GridAccessor + ?Sized>(
        &mut self,
        table: &G,
        row: usize,
        col: usize,
        axis: Axis,
        path: &DrillPath,
    ) {
        let same = |r: usize, c: usize| drill_path_at(table, r, c).as_ref() == Some(path);

        let mut lines: Vec<usize> = Vec::new();
        match axis {
            Axis::Row => {
                let first = table.header_row_count();
                let mut r = row;
                while r > first && same(r - 1, col) {
                    r -= 1;
                }
                while r < table.row_count() && same(r, col) {
                    lines.push(r);
                    r += 1;
                }
            }
            Axis::Column => {
                let first = table.header_col_count();
                let mut c = col;
                while c > first && same(row, c - 1) {
                    c -= 1;
                }
                while c < table.col_count() && same(row, c) {
                    lines.push(c);
                    c += 1;
                }
            }
        }

        for line in lines {
            let deeper: Vec<(usize, usize)> = match axis {
                Axis::Row => (col + 1..table.header_col_count()).map(|c| (line, c)).collect(),
                Axis::Column => (row + 1..table.header_row_count()).map(|r| (r, line)).collect(),
            };
            for (r, c) in deeper {
                let data_path = table.data_path(r, c);
                let Some(field) = data_path.header_field() else { continue };
                if let Some(p) = drill_path_at(table, r, c) {
                    self.remove_path(field, &p);
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// The drill operator for the cell at (row, col).
    pub fn get_drill_op<G: GridAccessor + ?Sized>(&self, table: &G, row: usize, col: usize) -> DrillOp {
        let data_path = table.data_path(row, col);
        let Some(name) = data_path.header_field() else {
            return DrillOp::None;
        };
        let Some(field) = self.fields.get(name) else {
            return DrillOp::None;
        };
        let static_op = self.drill_op_for(name);
        if static_op == DrillOp::None {
            return DrillOp::None;
        }

        let value = table.value(row, col);
        if self.config.is_others(field, &value) {
            return DrillOp::None;
        }
        if self.config.is_collapsed_placeholder(&value) && !self.is_parents_expanded(table, row, col) {
            return DrillOp::None;
        }

        match self.expanded.get(name) {
            Some(paths) if !paths.is_empty() => match drill_path_at(table, row, col) {
                Some(path) if paths.contains(&path) => DrillOp::Collapse,
                _ => DrillOp::Expand,
            },
            _ => static_op,
        }
    }

    /// True when every partially expanded ancestor of the cell's field has
    /// the cell's ancestor value expanded. Non-header cells are trivially
    /// satisfied.
    ///
    /// Date ancestors are skipped only on metadata grids
    /// (`GridAccessor::is_metadata`), whose time context differs from the
    /// live one. On a live grid a date ancestor is compared like any other.
    pub fn is_parents_expanded<G: GridAccessor + ?Sized>(&self, table: &G, row: usize, col: usize) -> bool {
        let data_path = table.data_path(row, col);
        let (Some(field), Some(axis)) = (data_path.header_field(), data_path.axis) else {
            return true;
        };

        for ancestor in self.ancestors_of(field) {
            let Some(paths) = self.expanded.get(&ancestor).filter(|p| !p.is_empty()) else {
                continue;
            };
            let is_date = self.fields.get(&ancestor).map_or(false, |f| f.is_date());
            if is_date && table.is_metadata() {
                continue;
            }
            let Some((band_axis, band)) = self.header_position(table, &ancestor) else {
                return false;
            };
            if band_axis != axis {
                return false;
            }
            let (r, c) = match axis {
                Axis::Row => (row, band),
                Axis::Column => (band, col),
            };
            match drill_path_at(table, r, c) {
                Some(path) if paths.contains(&path) => {}
                _ => return false,
            }
        }
        true
    }

    /// Header band of `field` in `table`. The index is rebuilt lazily when a
    /// different grid instance is seen.
    fn header_position<G: GridAccessor + ?Sized>(&self, table: &G, field: &str) -> Option<(Axis, usize)> {
        let mut index = self.header_index.borrow_mut();
        if index.identity != Some(table.identity()) {
            index.rebuild(table);
        }
        index.positions.get(field).copied()
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn field(&self, name: &str) -> Option<&GroupingField> {
        self.fields.get(name)
    }

    pub fn row_fields(&self) -> &[String] {
        &self.row_fields
    }

    pub fn col_fields(&self) -> &[String] {
        &self.col_fields
    }

    pub fn parent_of(&self, field: &str) -> Option<&str> {
        self.parent_map.get(field).map(String::as_str)
    }

    pub fn child_of(&self, field: &str) -> Option<&str> {
        self.child_map.get(field).map(String::as_str)
    }

    pub fn drill_op_for(&self, field: &str) -> DrillOp {
        self.drill_ops.get(field).copied().unwrap_or(DrillOp::None)
    }

    pub fn has_expanded(&self, field: &str) -> bool {
        self.expanded.get(field).map_or(false, |p| !p.is_empty())
    }

    pub fn is_expanded(&self, field: &str, path: &DrillPath) -> bool {
        self.expanded.get(field).map_or(false, |p| p.contains(path))
    }

    /// Expanded paths of `field`, sorted.
    pub fn expanded_paths(&self, field: &str) -> Vec<&DrillPath> {
        let mut paths: Vec<&DrillPath> = self
            .expanded
            .get(field)
            .map(|p| p.iter().collect())
            .unwrap_or_default();
        paths.sort();
        paths
    }

    // ------------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------------

    pub fn export_state(&self) -> ExpandedState {
        let mut state = ExpandedState::new();
        for (field, paths) in &self.expanded {
            for path in paths {
                state.insert(field.clone(), path.as_str());
            }
        }
        state
    }

    /// Replaces the expansion state. Entries of fields that are not bound
    /// right now are kept until the next `update_hierarchy` validates them.
    pub fn import_state(&mut self, state: &ExpandedState) {
        self.expanded.clear();
        for (field, paths) in &state.fields {
            for path in paths {
                self.expanded
                    .entry(field.clone())
                    .or_default()
                    .insert(DrillPath::from_raw(path.clone()));
            }
        }
        log_debug!("STATE", "imported {} expanded paths", state.path_count());
    }
}

impl Default for HierarchyDrillTracker {
    fn default() -> Self {
        Self::with_default_config()
    }
}

/// Parent -> bound child, inverted from a parent map.
fn bound_children(parent_map: &FxHashMap<String, String>) -> FxHashMap<String, String> {
    parent_map
        .iter()
        .map(|(child, parent)| (parent.clone(), child.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::Hierarchy;
    use crate::grid::ViewGrid;
    use condition_list::{DataValue, DateGroupLevel};
    use proptest::prelude::*;

    fn year() -> GroupingField {
        GroupingField::date("OrderDate", DateGroupLevel::Year)
    }

    fn quarter() -> GroupingField {
        GroupingField::date("OrderDate", DateGroupLevel::Quarter)
    }

    fn month() -> GroupingField {
        GroupingField::date("OrderDate", DateGroupLevel::Month)
    }

    fn p(values: &[DataValue]) -> DrillPath {
        DrillPath::from_values(values.iter())
    }

    const YEAR: &str = "OrderDate (Year)";
    const QUARTER: &str = "OrderDate (Quarter)";
    const MONTH: &str = "OrderDate (Month)";

    /// Year / Quarter rows, one body column.
    fn year_quarter_grid(identity: u64) -> ViewGrid {
        ViewGrid::crosstab(
            identity,
            &[YEAR, QUARTER],
            &[],
            &[
                vec![2023.into(), 1.into()],
                vec![2023.into(), 2.into()],
                vec![2024.into(), "\u{2026}".into()],
            ],
            &[],
        )
    }

    #[test]
    fn test_parent_map_skips_unbound_levels() {
        let mut tracker = HierarchyDrillTracker::default();
        tracker.update_hierarchy(&[year(), month()], &[], None);
        assert_eq!(tracker.parent_of(MONTH), Some(YEAR));
        assert_eq!(tracker.child_of(YEAR), Some(MONTH));
        assert_eq!(tracker.drill_op_for(YEAR), DrillOp::Collapse);
        assert_eq!(tracker.drill_op_for(MONTH), DrillOp::Expand);
        // The unbound next level is still known.
        assert_eq!(tracker.child_of(MONTH), Some("OrderDate (Week)"));
        assert_eq!(tracker.parent_of(YEAR), None);
    }

    #[test]
    fn test_non_hierarchy_fields_have_no_op() {
        let mut tracker = HierarchyDrillTracker::default();
        let region = GroupingField::new("Region");
        let weekday = GroupingField::date("OrderDate", DateGroupLevel::DayOfWeek);
        let profit = GroupingField::date("OrderDate", DateGroupLevel::Year).with_name("Calc").derived("[Sales]-[Cost]");
        tracker.update_hierarchy(&[region, weekday, profit], &[], None);
        assert_eq!(tracker.drill_op_for("Region"), DrillOp::None);
        assert_eq!(tracker.drill_op_for("OrderDate (DayOfWeek)"), DrillOp::None);
        assert_eq!(tracker.drill_op_for("Calc"), DrillOp::None);
    }

    #[test]
    fn test_removed_field_loses_its_expansion() {
        let mut tracker = HierarchyDrillTracker::default();
        tracker.update_hierarchy(&[year()], &[], None);
        assert!(!tracker.expand_path(YEAR, p(&[2023.into()])));
        assert!(tracker.has_expanded(YEAR));

        tracker.update_hierarchy(&[GroupingField::new("Region")], &[], None);
        assert!(tracker.expanded_paths(YEAR).is_empty());
    }

    #[test]
    fn test_changed_prefix_prunes_entries() {
        let mut tracker = HierarchyDrillTracker::default();
        tracker.update_hierarchy(&[year(), quarter()], &[], None);
        tracker.expand_path(YEAR, p(&[2023.into()]));
        tracker.expand_path(QUARTER, p(&[2023.into(), 1.into()]));

        // Same binding again keeps everything.
        tracker.update_hierarchy(&[year(), quarter()], &[], None);
        assert!(tracker.has_expanded(YEAR));
        assert!(tracker.has_expanded(QUARTER));

        // A new outer field changes every path prefix.
        tracker.update_hierarchy(&[GroupingField::new("Region"), year(), quarter()], &[], None);
        assert!(!tracker.has_expanded(YEAR));
        assert!(!tracker.has_expanded(QUARTER));
    }

    #[test]
    fn test_changed_child_prunes_parent() {
        let mut tracker = HierarchyDrillTracker::default();
        tracker.update_hierarchy(&[year(), quarter()], &[], None);
        tracker.expand_path(YEAR, p(&[2023.into()]));

        // Child becoming unbound keeps the parent.
        tracker.update_hierarchy(&[year()], &[], None);
        assert!(tracker.has_expanded(YEAR));

        tracker.update_hierarchy(&[year(), quarter()], &[], None);
        assert!(tracker.has_expanded(YEAR));

        // Child replaced by a different level drops the parent.
        tracker.update_hierarchy(&[year(), month()], &[], None);
        assert!(!tracker.has_expanded(YEAR));
    }

    #[test]
    fn test_cube_identity_change_resets_children() {
        let cube = CubeModel::new("sales-v1").with_hierarchy(Hierarchy::new(
            "Geography",
            vec!["Region".into(), "Country".into(), "City".into()],
        ));
        let region = GroupingField::new("Region").cube();
        let mut tracker = HierarchyDrillTracker::default();
        tracker.update_hierarchy(&[region.clone()], &[], Some(&cube));
        assert_eq!(tracker.child_of("Region"), Some("Country"));
        assert_eq!(tracker.drill_op_for("Region"), DrillOp::Expand);
        tracker.expand_path("Region", p(&["EMEA".into()]));

        tracker.update_hierarchy(&[region.clone()], &[], Some(&cube));
        assert!(tracker.has_expanded("Region"));

        let other = CubeModel::new("sales-v2");
        tracker.update_hierarchy(&[region], &[], Some(&other));
        assert!(!tracker.has_expanded("Region"));
        assert_eq!(tracker.child_of("Region"), None);
        assert_eq!(tracker.drill_op_for("Region"), DrillOp::None);
    }

    #[test]
    fn test_drill_ops_follow_partial_expansion() {
        let grid = year_quarter_grid(1);
        let mut tracker = HierarchyDrillTracker::default();
        tracker.update_hierarchy(&[year(), quarter()], &[], None);

        assert_eq!(tracker.get_drill_op(&grid, 0, 0), DrillOp::Collapse);
        assert_eq!(tracker.get_drill_op(&grid, 0, 1), DrillOp::Expand);
        assert_eq!(tracker.get_drill_op(&grid, 0, 2), DrillOp::None);

        assert!(tracker.set_expanded(&grid, 1, 1, true));
        assert_eq!(tracker.get_drill_op(&grid, 1, 1), DrillOp::Collapse);
        assert_eq!(tracker.get_drill_op(&grid, 0, 1), DrillOp::Expand);
        // Idempotent.
        assert_eq!(tracker.get_drill_op(&grid, 1, 1).as_str(), "-");
        assert_eq!(tracker.get_drill_op(&grid, 1, 1).as_str(), "-");
    }

    #[test]
    fn test_others_bucket_never_drills() {
        let grid = ViewGrid::crosstab(
            1,
            &[YEAR],
            &[],
            &[vec![2023.into()], vec!["Others".into()]],
            &[],
        );
        let mut tracker = HierarchyDrillTracker::default();
        tracker.update_hierarchy(&[year().with_top_n_others()], &[], None);
        assert_eq!(tracker.get_drill_op(&grid, 0, 0), DrillOp::Expand);
        assert_eq!(tracker.get_drill_op(&grid, 1, 0), DrillOp::None);
    }

    #[test]
    fn test_placeholder_under_collapsed_parent() {
        let grid = year_quarter_grid(1);
        let mut tracker = HierarchyDrillTracker::default();
        tracker.update_hierarchy(&[year(), quarter()], &[], None);

        // No partial expansion yet: nothing to check.
        assert!(tracker.is_parents_expanded(&grid, 2, 1));

        tracker.set_expanded(&grid, 0, 0, true);
        assert!(tracker.is_parents_expanded(&grid, 0, 1));
        assert!(!tracker.is_parents_expanded(&grid, 2, 1));
        assert_eq!(tracker.get_drill_op(&grid, 2, 1), DrillOp::None);
        assert!(tracker.is_parents_expanded(&grid, 0, 2));

        // Date ancestors cannot be compared on a metadata grid.
        let meta = year_quarter_grid(2).with_metadata(true);
        assert!(tracker.is_parents_expanded(&meta, 2, 1));
    }

    #[test]
    fn test_collapse_cascades_to_descendants() {
        let grid = ViewGrid::crosstab(
            7,
            &[YEAR, QUARTER, MONTH],
            &[],
            &[
                vec![2023.into(), 1.into(), 1.into()],
                vec![2023.into(), 1.into(), 2.into()],
                vec![2023.into(), 2.into(), 4.into()],
                vec![2024.into(), 1.into(), 1.into()],
            ],
            &[],
        );
        let mut tracker = HierarchyDrillTracker::default();
        tracker.update_hierarchy(&[year(), quarter(), month()], &[], None);
        tracker.set_expanded(&grid, 0, 0, true);
        tracker.set_expanded(&grid, 3, 0, true);
        tracker.set_expanded(&grid, 0, 1, true);
        tracker.set_expanded(&grid, 3, 1, true);
        tracker.set_expanded(&grid, 1, 2, true);
        // Recorded without a visible cell; reached through the child map.
        tracker.expand_path(MONTH, p(&[2023.into(), 4.into(), 12.into()]));

        // Collapsing 2023 from its second row still finds the whole span.
        assert!(tracker.set_expanded(&grid, 2, 0, false));
        assert_eq!(tracker.expanded_paths(YEAR), vec![&p(&[2024.into()])]);
        assert_eq!(tracker.expanded_paths(QUARTER), vec![&p(&[2024.into(), 1.into()])]);
        assert!(tracker.expanded_paths(MONTH).is_empty());
    }

    #[test]
    fn test_collapse_field_and_path() {
        let mut tracker = HierarchyDrillTracker::default();
        tracker.update_hierarchy(&[year(), quarter(), month()], &[], None);
        tracker.expand_path(YEAR, p(&[2023.into()]));
        tracker.expand_path(QUARTER, p(&[2023.into(), 1.into()]));
        tracker.expand_path(QUARTER, p(&[2024.into(), 1.into()]));

        tracker.collapse_path(YEAR, &p(&[2023.into()]));
        assert!(!tracker.has_expanded(YEAR));
        assert_eq!(tracker.expanded_paths(QUARTER).len(), 1);

        tracker.collapse_field(YEAR);
        assert!(!tracker.has_expanded(QUARTER));
    }

    #[test]
    fn test_state_export_import() {
        let mut tracker = HierarchyDrillTracker::default();
        tracker.update_hierarchy(&[year(), quarter()], &[], None);
        tracker.expand_path(YEAR, p(&[DataValue::Null]));
        tracker.expand_path(QUARTER, p(&[2023.into(), 2.into()]));
        let state = tracker.export_state();
        assert_eq!(state.path_count(), 2);

        let mut restored = HierarchyDrillTracker::default();
        restored.import_state(&state);
        restored.update_hierarchy(&[year(), quarter()], &[], None);
        assert!(restored.is_expanded(YEAR, &p(&[DataValue::Null])));
        assert_eq!(restored.export_state(), state);
    }

    #[test]
    fn test_header_index_follows_grid_identity() {
        let mut tracker = HierarchyDrillTracker::default();
        tracker.update_hierarchy(&[year(), quarter()], &[], None);
        tracker.expand_path(YEAR, p(&[2023.into()]));

        let first = year_quarter_grid(1);
        assert!(tracker.is_parents_expanded(&first, 0, 1));

        // Same fields swapped to the column axis under a new identity.
        let second = ViewGrid::crosstab(
            2,
            &[],
            &[YEAR, QUARTER],
            &[vec![]],
            &[vec![2023.into(), 1.into()], vec![2024.into(), 1.into()]],
        );
        assert!(!tracker.is_parents_expanded(&second, 1, 1));
    }

    fn field_pool() -> Vec<GroupingField> {
        vec![GroupingField::new("Region"), year(), quarter(), month()]
    }

    proptest! {
        #[test]
        fn surviving_entries_keep_their_chain(
            layouts in prop::collection::vec(
                prop::sample::subsequence(vec![0usize, 1, 2, 3], 0..=4),
                1..6,
            )
        ) {
            let pool = field_pool();
            let mut tracker = HierarchyDrillTracker::default();
            let mut recorded: FxHashMap<String, FieldChain> = FxHashMap::default();

            for layout in layouts {
                let rows: Vec<GroupingField> = layout.iter().map(|i| pool[*i].clone()).collect();
                tracker.update_hierarchy(&rows, &[], None);

                recorded.retain(|name, _| tracker.has_expanded(name));
                for (name, chain) in &recorded {
                    prop_assert_eq!(tracker.chains.get(name), Some(chain));
                }

                for field in &rows {
                    if !tracker.has_expanded(&field.name) {
                        let depth = tracker.chains[&field.name].prefix.len() + 1;
                        let values: Vec<DataValue> = (0..depth as i32).map(DataValue::from).collect();
                        tracker.expand_path(&field.name, p(&values));
                        recorded.insert(field.name.clone(), tracker.chains[&field.name].clone());
                    }
                }
            }
        }
    }
}
