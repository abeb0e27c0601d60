//! Ordered sequence of cells

use crate::cell::{Cell, CellValue};
use crate::error::CoreResult;
use std::ops::Index;

/// One result row (or one parameter list)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    cells: Vec<Cell>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cells: Vec::with_capacity(capacity),
        }
    }

    /// Append a cell at the end of the row
    pub fn push(&mut self, cell: impl Into<Cell>) {
        self.cells.push(cell.into());
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, column: usize) -> Option<&Cell> {
        self.cells.get(column)
    }

    /// Downcast column `column`. Returns `None` when the column is out of range.
    pub fn get_as<T: CellValue>(&self, column: usize) -> Option<CoreResult<&T>> {
        self.cells.get(column).map(Cell::cast::<T>)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Cell> {
        self.cells.iter()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn into_cells(self) -> Vec<Cell> {
        self.cells
    }
}

impl Index<usize> for Row {
    type Output = Cell;

    fn index(&self, column: usize) -> &Cell {
        &self.cells[column]
    }
}

impl From<Vec<Cell>> for Row {
    fn from(cells: Vec<Cell>) -> Self {
        Self { cells }
    }
}

impl FromIterator<Cell> for Row {
    fn from_iter<I: IntoIterator<Item = Cell>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Row {
    type Item = Cell;
    type IntoIter = std::vec::IntoIter<Cell>;

    fn into_iter(self) -> Self::IntoIter {
        self.cells.into_iter()
    }
}

impl<'a> IntoIterator for &'a Row {
    type Item = &'a Cell;
    type IntoIter = std::slice::Iter<'a, Cell>;

    fn into_iter(self) -> Self::IntoIter {
        self.cells.iter()
    }
}
