//! FILENAME: selection-engine/src/calc_grid.rs
//! Calc-grid access.
//!
//! A calc grid is a free-form nested grid: each position shows an instance
//! of a named layout cell. Ancestor instances are found by position.

use condition_list::DataValue;
use drill_engine::{Axis, CellDataPath, GridAccessor};

pub trait CalcGridAccessor: GridAccessor {
    /// Name of the layout cell shown at (row, col).
    fn cell_name(&self, row: usize, col: usize) -> Option<&str>;

    /// Position of the instance of `name` that encloses (row, col) along
    /// `axis`.
    ///
    /// The default picks the nearest preceding instance: for the row axis,
    /// leftwards along the row first, then upwards row by row (merged group
    /// headers only show in the first row of their span).
    fn locate(&self, row: usize, col: usize, name: &str, axis: Axis) -> Option<(usize, usize)> {
        match axis {
            Axis::Row => {
                for r in (0..=row).rev() {
                    let limit = if r == row { col } else { col + 1 };
                    for c in (0..limit.min(self.col_count())).rev() {
                        if self.cell_name(r, c) == Some(name) {
                            return Some((r, c));
                        }
                    }
                }
            }
            Axis::Column => {
                for c in (0..=col).rev() {
                    let limit = if c == col { row } else { row + 1 };
                    for r in (0..limit.min(self.row_count())).rev() {
                        if self.cell_name(r, c) == Some(name) {
                            return Some((r, c));
                        }
                    }
                }
            }
        }
        None
    }
}

/// In-memory calc grid.
#[derive(Debug, Clone)]
pub struct CalcGrid {
    identity: u64,
    rows: usize,
    cols: usize,
    names: Vec<Option<String>>,
    values: Vec<DataValue>,
}

impl CalcGrid {
    pub fn new(identity: u64, rows: usize, cols: usize) -> Self {
        CalcGrid {
            identity,
            rows,
            cols,
            names: vec![None; rows * cols],
            values: vec![DataValue::Null; rows * cols],
        }
    }

    fn index(&self, row: usize, col: usize) -> Option<usize> {
        if row < self.rows && col < self.cols {
            Some(row * self.cols + col)
        } else {
            None
        }
    }

    /// Places an instance of layout cell `name` showing `value`.
    pub fn set(&mut self, row: usize, col: usize, name: impl Into<String>, value: DataValue) -> &mut Self {
        if let Some(i) = self.index(row, col) {
            self.names[i] = Some(name.into());
            self.values[i] = value;
        }
        self
    }
}

impl GridAccessor for CalcGrid {
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
        0
    }

    fn header_col_count(&self) -> usize {
        0
    }

    fn value(&self, row: usize, col: usize) -> DataValue {
        self.index(row, col)
            .map(|i| self.values[i].clone())
            .unwrap_or(DataValue::Null)
    }

    fn data_path(&self, row: usize, col: usize) -> CellDataPath {
        match self.cell_name(row, col) {
            Some(_) => CellDataPath::detail(),
            None => CellDataPath::corner(),
        }
    }
}

impl CalcGridAccessor for CalcGrid {
    fn cell_name(&self, row: usize, col: usize) -> Option<&str> {
        self.index(row, col).and_then(|i| self.names[i].as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_prefers_same_row_then_rows_above() {
        let mut grid = CalcGrid::new(1, 3, 3);
        grid.set(0, 0, "Region", "East".into())
            .set(0, 1, "State", "NJ".into())
            .set(0, 2, "Sales", 10.into())
            .set(1, 1, "State", "NY".into())
            .set(1, 2, "Sales", 20.into());

        assert_eq!(grid.locate(1, 2, "State", Axis::Row), Some((1, 1)));
        // Region is merged over rows 0-1 and only shows in row 0.
        assert_eq!(grid.locate(1, 1, "Region", Axis::Row), Some((0, 0)));
        assert_eq!(grid.locate(1, 2, "Year", Axis::Row), None);
        assert_eq!(grid.cell_name(2, 2), None);
        assert_eq!(grid.value(1, 2), DataValue::from(20));
    }

    #[test]
    fn test_locate_along_columns() {
        let mut grid = CalcGrid::new(1, 2, 3);
        grid.set(0, 1, "Year", 2023.into())
            .set(1, 1, "Sales", 5.into())
            .set(1, 2, "Sales", 6.into());
        assert_eq!(grid.locate(1, 1, "Year", Axis::Column), Some((0, 1)));
        // Year spans columns 1-2 and only shows in column 1.
        assert_eq!(grid.locate(1, 2, "Year", Axis::Column), Some((0, 1)));
    }
}
