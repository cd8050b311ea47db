//! FILENAME: selection-engine/src/synthesizer.rs
//! Condition synthesis for table selections.
//!
//! Two entry points share one set of per-value rules:
//! - `from_calc_grid`: walks the layout tree from a clicked calc-grid cell
//! - `from_crosstab`: reads the header cells that identify a crosstab cell
//!
//! The chart entry point lives in `chart.rs`.

use rustc_hash::{FxHashMap, FxHashSet};

use condition_list::{ConditionField, ConditionItem, ConditionList, ConditionNode, DataValue};
use drill_engine::{
    drill_path_at, header_axis, log_debug, Axis, GridAccessor, GroupingField, HierarchyDrillTracker,
};

use crate::binding::{named_group_condition, value_condition, CellBinding, RangeColumn};
use crate::calc_grid::CalcGridAccessor;
use crate::config::SynthesisConfig;
use crate::error::SynthesisError;
use crate::layout::LayoutTree;
use crate::others::others_condition;

pub type Position = (usize, usize);

// ============================================================================
// CATALOG / SOURCE
// ============================================================================

/// Columns a calc-grid binding may filter on.
#[derive(Debug, Clone, Default)]
pub struct ColumnCatalog {
    /// None accepts every column.
    columns: Option<FxHashSet<String>>,
}

impl ColumnCatalog {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ColumnCatalog {
            columns: Some(columns.into_iter().map(Into::into).collect()),
        }
    }

    pub fn unrestricted() -> Self {
        ColumnCatalog { columns: None }
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.as_ref().map_or(true, |c| c.contains(column))
    }
}

/// Where the crosstab's fields come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceKind {
    #[default]
    Table,
    Cube,
    Model,
}

impl SourceKind {
    /// Cube and model levels are filtered by their level name.
    fn target_field(self, field: &GroupingField) -> ConditionField {
        match self {
            SourceKind::Cube | SourceKind::Model if field.cube_sourced || field.model_sourced => {
                ConditionField::column(field.name.clone())
            }
            _ => field.condition_field(),
        }
    }
}

// ============================================================================
// SYNTHESIZER
// ============================================================================

pub struct ConditionSynthesizer {
    config: SynthesisConfig,
    range_columns: Vec<RangeColumn>,
    range_index: FxHashMap<(ConditionField, u32), usize>,
}

impl ConditionSynthesizer {
    pub fn new(config: SynthesisConfig) -> Self {
        ConditionSynthesizer {
            config,
            range_columns: Vec::new(),
            range_index: FxHashMap::default(),
        }
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    /// Synthetic range columns created so far, in creation order.
    pub fn range_columns(&self) -> &[RangeColumn] {
        &self.range_columns
    }

    fn range_column(&mut self, source: &ConditionField, interval: u32) -> &RangeColumn {
        let key = (source.clone(), interval);
        let index = match self.range_index.get(&key) {
            Some(index) => *index,
            None => {
                let column = RangeColumn::new(source.clone(), interval);
                log_debug!("SELECT", "created range column {}", column.name);
                self.range_columns.push(column);
                let index = self.range_columns.len() - 1;
                self.range_index.insert(key, index);
                index
            }
        };
        &self.range_columns[index]
    }

    // ------------------------------------------------------------------------
    // Calc grid
    // ------------------------------------------------------------------------

    /// Filter for the calc-grid cell at (row, col): one condition per bound
    /// ancestor, ANDed at level 0.
    ///
    /// The clicked cell's own formula binding (an aggregate) is skipped; a
    /// formula binding anywhere above it makes the filter impossible.
    pub fn from_calc_grid<G: CalcGridAccessor + ?Sized>(
        &mut self,
        row: usize,
        col: usize,
        layout: &LayoutTree,
        grid: &G,
        catalog: &ColumnCatalog,
    ) -> Result<ConditionList, SynthesisError> {
        let name = grid
            .cell_name(row, col)
            .ok_or(SynthesisError::UnknownCell { row, col })?
            .to_string();

        let mut processed: FxHashSet<Position> = FxHashSet::default();
        let mut parts: Vec<ConditionNode> = Vec::new();
        self.walk_calc(grid, layout, catalog, (row, col), &name, true, &mut processed, &mut parts)?;
        Ok(ConditionList::from_optional_node(ConditionNode::all(parts).as_ref(), 0))
    }

    #[allow(clippy::too_many_arguments)]
    fn walk_calc<G: CalcGridAccessor + ?Sized>(
        &mut self,
        grid: &G,
        layout: &LayoutTree,
        catalog: &ColumnCatalog,
        pos: Position,
        name: &str,
        clicked: bool,
        processed: &mut FxHashSet<Position>,
        parts: &mut Vec<ConditionNode>,
    ) -> Result<(), SynthesisError> {
        if !processed.insert(pos) {
            return Ok(());
        }

        match layout.binding(name) {
            None => log_debug!("SELECT", "{} is not in the layout, skipped", name),
            Some(CellBinding::Formula { .. }) if clicked => {}
            Some(CellBinding::Formula { expression }) => {
                log_debug!("SELECT", "ancestor {} is derived ({}), cannot synthesize", name, expression);
                return Err(SynthesisError::DerivedFormula {
                    binding: name.to_string(),
                });
            }
            Some(binding) => match binding.field() {
                Some(field) if !catalog.contains(&field.column) => {
                    log_debug!("SELECT", "{} is not in the column catalog, skipped", field.column);
                }
                _ => {
                    if let Some(node) = self.calc_condition(grid, layout, pos, name, binding) {
                        parts.push(node);
                    }
                }
            },
        }

        for (axis, parent) in layout.parents(name) {
            match grid.locate(pos.0, pos.1, parent, axis) {
                Some(at) => self.walk_calc(grid, layout, catalog, at, parent, false, processed, parts)?,
                None => log_debug!("SELECT", "no instance of {} encloses {:?}", parent, pos),
            }
        }
        Ok(())
    }

    fn calc_condition<G: CalcGridAccessor + ?Sized>(
        &mut self,
        grid: &G,
        layout: &LayoutTree,
        pos: Position,
        name: &str,
        binding: &CellBinding,
    ) -> Option<ConditionNode> {
        let value = grid.value(pos.0, pos.1);
        match binding {
            CellBinding::Column { field } => Some(value_condition(field, &value)),
            CellBinding::NamedGroup { field, groups } => named_group_condition(field, groups, &value),
            CellBinding::TopN { field } => {
                if value.as_text() == Some(self.config.drill.others_label.as_str()) {
                    let siblings = calc_siblings(grid, layout, pos, name);
                    Some(others_condition(field, siblings, &self.config.drill, None))
                } else {
                    Some(value_condition(field, &value))
                }
            }
            CellBinding::Range { field, interval } => {
                if value.is_null() || *interval <= 1 {
                    return Some(value_condition(field, &value));
                }
                self.range_column(field, *interval);
                let item = match value.offset(f64::from(*interval - 1)) {
                    Some(high) => ConditionItem::between(field.clone(), value, high),
                    None => ConditionItem::equal(field.clone(), value),
                };
                Some(ConditionNode::Leaf(item))
            }
            CellBinding::Formula { .. } => None,
        }
    }

    // ------------------------------------------------------------------------
    // Crosstab
    // ------------------------------------------------------------------------

    /// The header cells that identify (row, col): the innermost row header
    /// and the innermost column header of a body cell, or the cell itself
    /// when it is a header.
    pub fn header_cells_for<G: GridAccessor + ?Sized>(&self, grid: &G, row: usize, col: usize) -> Vec<Position> {
        if header_axis(grid, row, col).is_some() {
            return vec![(row, col)];
        }
        let mut out = Vec::with_capacity(2);
        if let Some(c) = (0..grid.header_col_count())
            .rev()
            .find(|&c| header_axis(grid, row, c) == Some(Axis::Row))
        {
            out.push((row, c));
        }
        if let Some(r) = (0..grid.header_row_count())
            .rev()
            .find(|&r| header_axis(grid, r, col) == Some(Axis::Column))
        {
            out.push((r, col));
        }
        out
    }

    /// Filter for the selected header cells: every header on the path of
    /// each selected cell contributes, ANDed at `level`.
    pub fn from_crosstab<G: GridAccessor + ?Sized>(
        &self,
        headers: &[Position],
        grid: &G,
        tracker: &HierarchyDrillTracker,
        source: SourceKind,
        level: u32,
    ) -> Result<ConditionList, SynthesisError> {
        let mut processed: FxHashSet<Position> = FxHashSet::default();
        let mut parts: Vec<ConditionNode> = Vec::new();

        for &(row, col) in headers {
            let Some(axis) = header_axis(grid, row, col) else {
                log_debug!("SELECT", "({}, {}) is not a header cell, skipped", row, col);
                continue;
            };
            let path: Vec<Position> = match axis {
                Axis::Row => (0..=col)
                    .filter(|&c| header_axis(grid, row, c) == Some(Axis::Row))
                    .map(|c| (row, c))
                    .collect(),
                Axis::Column => (0..=row)
                    .filter(|&r| header_axis(grid, r, col) == Some(Axis::Column))
                    .map(|r| (r, col))
                    .collect(),
            };

            for pos in path {
                if !processed.insert(pos) {
                    continue;
                }
                if let Some(node) = self.header_condition(grid, tracker, source, pos, axis)? {
                    parts.push(node);
                }
            }
        }

        Ok(ConditionList::from_optional_node(ConditionNode::all(parts).as_ref(), level))
    }

    fn header_condition<G: GridAccessor + ?Sized>(
        &self,
        grid: &G,
        tracker: &HierarchyDrillTracker,
        source: SourceKind,
        (row, col): Position,
        axis: Axis,
    ) -> Result<Option<ConditionNode>, SynthesisError> {
        let data_path = grid.data_path(row, col);
        let Some(name) = data_path.header_field() else {
            return Ok(None);
        };
        let Some(field) = tracker.field(name) else {
            log_debug!("SELECT", "{} is no longer bound, skipped", name);
            return Ok(None);
        };

        let value = grid.value(row, col);
        let drill = &self.config.drill;
        if drill.is_collapsed_placeholder(&value) && !tracker.is_parents_expanded(grid, row, col) {
            return Ok(None);
        }
        if field.is_derived() {
            log_debug!("SELECT", "{} is derived, cannot synthesize", name);
            return Err(SynthesisError::DerivedFormula {
                binding: name.to_string(),
            });
        }

        if field.is_merged() {
            let components = grid.components(row, col);
            let nodes: Vec<ConditionNode> = field
                .merge
                .iter()
                .zip(components.iter())
                .filter(|(part, _)| !part.ignore)
                .map(|(part, value)| value_condition(&part.condition_field(), value))
                .collect();
            return Ok(ConditionNode::all(nodes));
        }

        let target = source.target_field(field);
        if drill.is_others(field, &value) {
            let siblings = header_siblings(grid, row, col, axis);
            return Ok(Some(others_condition(&target, siblings, drill, field.named_group.as_ref())));
        }
        if let Some(groups) = &field.named_group {
            return Ok(named_group_condition(&target, groups, &value));
        }
        Ok(Some(value_condition(&target, &value)))
    }
}

impl Default for ConditionSynthesizer {
    fn default() -> Self {
        Self::new(SynthesisConfig::default())
    }
}

// ============================================================================
// SIBLING SCANS
// ============================================================================

/// Values of the ancestors enclosing `pos`, nearest first.
fn calc_context<G: CalcGridAccessor + ?Sized>(
    grid: &G,
    layout: &LayoutTree,
    pos: Position,
    name: &str,
    processed: &mut FxHashSet<Position>,
    out: &mut Vec<DataValue>,
) {
    for (axis, parent) in layout.parents(name) {
        if let Some(at) = grid.locate(pos.0, pos.1, parent, axis) {
            if processed.insert(at) {
                out.push(grid.value(at.0, at.1));
                calc_context(grid, layout, at, parent, processed, out);
            }
        }
    }
}

fn context_of<G: CalcGridAccessor + ?Sized>(
    grid: &G,
    layout: &LayoutTree,
    pos: Position,
    name: &str,
) -> Vec<DataValue> {
    let mut processed = FxHashSet::default();
    processed.insert(pos);
    let mut out = Vec::new();
    calc_context(grid, layout, pos, name, &mut processed, &mut out);
    out
}

/// Values of every other instance of `name` under the same ancestor values.
fn calc_siblings<G: CalcGridAccessor + ?Sized>(
    grid: &G,
    layout: &LayoutTree,
    pos: Position,
    name: &str,
) -> Vec<DataValue> {
    let target = context_of(grid, layout, pos, name);
    let mut out = Vec::new();
    for r in 0..grid.row_count() {
        for c in 0..grid.col_count() {
            if (r, c) == pos || grid.cell_name(r, c) != Some(name) {
                continue;
            }
            if context_of(grid, layout, (r, c), name) == target {
                out.push(grid.value(r, c));
            }
        }
    }
    out
}

/// Values of the headers in the same band under the same parent path.
fn header_siblings<G: GridAccessor + ?Sized>(grid: &G, row: usize, col: usize, axis: Axis) -> Vec<DataValue> {
    let parent = drill_path_at(grid, row, col).and_then(|p| p.parent());
    let same_parent = |r: usize, c: usize| {
        header_axis(grid, r, c) == Some(axis) && drill_path_at(grid, r, c).and_then(|p| p.parent()) == parent
    };
    match axis {
        Axis::Row => (grid.header_row_count()..grid.row_count())
            .filter(|&r| r != row && same_parent(r, col))
            .map(|r| grid.value(r, col))
            .collect(),
        Axis::Column => (grid.header_col_count()..grid.col_count())
            .filter(|&c| c != col && same_parent(row, c))
            .map(|c| grid.value(row, c))
            .collect(),
    }
}
