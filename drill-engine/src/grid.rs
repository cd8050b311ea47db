//! FILENAME: drill-engine/src/grid.rs
//! Grid accessor contract.
//!
//! The query-result layer owns the displayed grid. This module only defines
//! how the drill tracker and the synthesizer read it, plus `ViewGrid`, a
//! plain in-memory grid for callers that already hold materialized cells.
//!
//! Layout of a crosstab grid:
//! - rows `0..header_row_count` hold column-axis headers
//! - columns `0..header_col_count` hold row-axis headers
//! - the top-left block is the corner; everything else is body

use serde::{Deserialize, Serialize};

use condition_list::DataValue;

use crate::definition::Axis;
use crate::path::DrillPath;

// ============================================================================
// CELL DESCRIPTORS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellKind {
    Header,
    GroupHeader,
    Detail,
    Summary,
    GrandTotal,
    Corner,
}

impl CellKind {
    pub fn is_header(self) -> bool {
        matches!(self, CellKind::Header | CellKind::GroupHeader)
    }
}

/// Describes what a cell displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellDataPath {
    pub kind: CellKind,

    /// Header band the cell belongs to (headers only).
    #[serde(default)]
    pub axis: Option<Axis>,

    /// Grouping field the cell shows a value of (headers only).
    #[serde(default)]
    pub field: Option<String>,
}

impl CellDataPath {
    pub fn header(axis: Axis, field: impl Into<String>) -> Self {
        CellDataPath {
            kind: CellKind::Header,
            axis: Some(axis),
            field: Some(field.into()),
        }
    }

    pub fn of_kind(kind: CellKind) -> Self {
        CellDataPath {
            kind,
            axis: None,
            field: None,
        }
    }

    pub fn detail() -> Self {
        Self::of_kind(CellKind::Detail)
    }

    pub fn corner() -> Self {
        Self::of_kind(CellKind::Corner)
    }

    /// The field of a header cell.
    pub fn header_field(&self) -> Option<&str> {
        if self.kind.is_header() {
            self.field.as_deref()
        } else {
            None
        }
    }
}

// ============================================================================
// ACCESSOR
// ============================================================================

/// Read access to a displayed grid.
///
/// Row/column indices are the caller's responsibility; implementations may
/// return Null and a corner descriptor for positions outside the grid.
pub trait GridAccessor {
    /// Identity of the grid instance. A new identity invalidates any cache
    /// built from a previous grid.
    fn identity(&self) -> u64;

    fn row_count(&self) -> usize;
    fn col_count(&self) -> usize;
    fn header_row_count(&self) -> usize;
    fn header_col_count(&self) -> usize;

    fn value(&self, row: usize, col: usize) -> DataValue;
    fn data_path(&self, row: usize, col: usize) -> CellDataPath;

    /// Per-component values of a merged date-range / date-comparison cell.
    fn components(&self, row: usize, col: usize) -> Vec<DataValue> {
        vec![self.value(row, col)]
    }

    /// True for metadata / preview grids, whose date values reflect a
    /// different current-time context than the live grid.
    fn is_metadata(&self) -> bool {
        false
    }
}

/// The header band a cell belongs to, if it is a header.
pub fn header_axis<G: GridAccessor + ?Sized>(grid: &G, row: usize, col: usize) -> Option<Axis> {
    let path = grid.data_path(row, col);
    if path.kind.is_header() {
        path.axis
    } else {
        None
    }
}

/// Drill path of a header cell: the values of every header on the same axis
/// from the outermost band down to the cell itself.
pub fn drill_path_at<G: GridAccessor + ?Sized>(grid: &G, row: usize, col: usize) -> Option<DrillPath> {
    let axis = header_axis(grid, row, col)?;
    let mut values: Vec<DataValue> = Vec::new();
    match axis {
        Axis::Row => {
            for c in 0..=col {
                if header_axis(grid, row, c) == Some(Axis::Row) {
                    values.push(grid.value(row, c));
                }
            }
        }
        Axis::Column => {
            for r in 0..=row {
                if header_axis(grid, r, col) == Some(Axis::Column) {
                    values.push(grid.value(r, col));
                }
            }
        }
    }
    Some(DrillPath::from_values(values.iter()))
}

// ============================================================================
// IN-MEMORY GRID
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ViewCell {
    pub value: DataValue,
    pub path: CellDataPath,
    /// Merged-cell components; empty for ordinary cells.
    pub components: Vec<DataValue>,
}

impl ViewCell {
    pub fn new(value: DataValue, path: CellDataPath) -> Self {
        ViewCell {
            value,
            path,
            components: Vec::new(),
        }
    }
}

/// Row-major in-memory grid.
#[derive(Debug, Clone)]
pub struct ViewGrid {
    identity: u64,
    rows: usize,
    cols: usize,
    header_rows: usize,
    header_cols: usize,
    cells: Vec<ViewCell>,
    metadata: bool,
}

impl ViewGrid {
    /// An empty grid of corner cells.
    pub fn new(identity: u64, rows: usize, cols: usize, header_rows: usize, header_cols: usize) -> Self {
        let blank = ViewCell::new(DataValue::Null, CellDataPath::corner());
        ViewGrid {
            identity,
            rows,
            cols,
            header_rows,
            header_cols,
            cells: vec![blank; rows * cols],
            metadata: false,
        }
    }

    /// Builds a crosstab: one header band per row/column field, one row per
    /// row key and one body column per column key (at least one).
    ///
    /// Each key lists the header values from the outermost field inwards.
    /// Values are repeated on every row/column they span.
    pub fn crosstab(
        identity: u64,
        row_fields: &[&str],
        col_fields: &[&str],
        row_keys: &[Vec<DataValue>],
        col_keys: &[Vec<DataValue>],
    ) -> Self {
        let header_rows = col_fields.len();
        let header_cols = row_fields.len();
        let body_cols = col_keys.len().max(1);
        let mut grid = ViewGrid::new(
            identity,
            header_rows + row_keys.len(),
            header_cols + body_cols,
            header_rows,
            header_cols,
        );

        for (i, key) in row_keys.iter().enumerate() {
            for (j, field) in row_fields.iter().enumerate() {
                let value = key.get(j).cloned().unwrap_or(DataValue::Null);
                grid.set_cell(header_rows + i, j, ViewCell::new(value, CellDataPath::header(Axis::Row, *field)));
            }
            for k in 0..body_cols {
                grid.set_cell(header_rows + i, header_cols + k, ViewCell::new(DataValue::Null, CellDataPath::detail()));
            }
        }
        for (k, key) in col_keys.iter().enumerate() {
            for (i, field) in col_fields.iter().enumerate() {
                let value = key.get(i).cloned().unwrap_or(DataValue::Null);
                grid.set_cell(i, header_cols + k, ViewCell::new(value, CellDataPath::header(Axis::Column, *field)));
            }
        }
        grid
    }

    pub fn with_metadata(mut self, metadata: bool) -> Self {
        self.metadata = metadata;
        self
    }

    fn index(&self, row: usize, col: usize) -> Option<usize> {
        if row < self.rows && col < self.cols {
            Some(row * self.cols + col)
        } else {
            None
        }
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&ViewCell> {
        self.index(row, col).map(|i| &self.cells[i])
    }

    pub fn set_cell(&mut self, row: usize, col: usize, cell: ViewCell) {
        if let Some(i) = self.index(row, col) {
            self.cells[i] = cell;
        }
    }

    pub fn set_value(&mut self, row: usize, col: usize, value: DataValue) {
        if let Some(i) = self.index(row, col) {
            self.cells[i].value = value;
        }
    }

    pub fn set_components(&mut self, row: usize, col: usize, components: Vec<DataValue>) {
        if let Some(i) = self.index(row, col) {
            self.cells[i].components = components;
        }
    }
}

impl GridAccessor for ViewGrid {
    fn identity(&self) -> u64 {
        self.identity
    }

    fn row_count(&self) -> usize {
        self.rows
    }

    fn col_count(&self) -> usize {
        self.cols
    }

    fn header_row_count(&self) -> usize {
        self.header_rows
    }

    fn header_col_count(&self) -> usize {
        self.header_cols
    }

    fn value(&self, row: usize, col: usize) -> DataValue {
        self.cell(row, col).map(|c| c.value.clone()).unwrap_or(DataValue::Null)
    }

    fn data_path(&self, row: usize, col: usize) -> CellDataPath {
        self.cell(row, col)
            .map(|c| c.path.clone())
            .unwrap_or_else(CellDataPath::corner)
    }

    fn components(&self, row: usize, col: usize) -> Vec<DataValue> {
        match self.cell(row, col) {
            Some(cell) if !cell.components.is_empty() => cell.components.clone(),
            Some(cell) => vec![cell.value.clone()],
            None => Vec::new(),
        }
    }

    fn is_metadata(&self) -> bool {
        self.metadata
    }
}
