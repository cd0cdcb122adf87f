//! A single sheet: a sparse grid of entered cell values.
//!
//! Storage is a hash map keyed by (row, col); empty cells are simply
//! absent. Computed formula results live in the workbook, not here.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::cell::CellValue;
use crate::cell_id::SheetId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sheet {
    pub id: SheetId,
    pub name: String,
    cells: FxHashMap<(usize, usize), CellValue>,
}

impl Sheet {
    pub fn new(id: SheetId, name: impl Into<String>) -> Self {
        Self { id, name: name.into(), cells: FxHashMap::default() }
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.cells.get(&(row, col))
    }

    /// Store a value. Storing Empty removes the entry to keep the map sparse.
    pub fn set(&mut self, row: usize, col: usize, value: CellValue) {
        if matches!(value, CellValue::Empty) {
            self.cells.remove(&(row, col));
        } else {
            self.cells.insert((row, col), value);
        }
    }

    pub fn clear(&mut self, row: usize, col: usize) -> bool {
        self.cells.remove(&(row, col)).is_some()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &CellValue)> {
        self.cells.iter().map(|(&(row, col), value)| (row, col, value))
    }

    /// Smallest (rows, cols) extent covering every stored cell.
    pub fn used_extent(&self) -> (usize, usize) {
        let mut rows = 0;
        let mut cols = 0;
        for &(row, col) in self.cells.keys() {
            rows = rows.max(row + 1);
            cols = cols.max(col + 1);
        }
        (rows, cols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_storage() {
        let mut sheet = Sheet::new(SheetId(1), "Sheet1");
        sheet.set(100, 50, CellValue::from_input("x"));
        assert_eq!(sheet.cell_count(), 1);
        assert!(sheet.get(100, 50).is_some());
        assert!(sheet.get(0, 0).is_none());
    }

    #[test]
    fn test_set_empty_removes() {
        let mut sheet = Sheet::new(SheetId(1), "Sheet1");
        sheet.set(0, 0, CellValue::from_input("x"));
        sheet.set(0, 0, CellValue::Empty);
        assert_eq!(sheet.cell_count(), 0);
    }

    #[test]
    fn test_used_extent() {
        let mut sheet = Sheet::new(SheetId(1), "Sheet1");
        assert_eq!(sheet.used_extent(), (0, 0));
        sheet.set(4, 2, CellValue::from_input("x"));
        assert_eq!(sheet.used_extent(), (5, 3));
    }
}
