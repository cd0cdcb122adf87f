//! Cell identity for the dependency graph.
//!
//! A `CellId` uniquely identifies a cell by (sheet, row, column), the
//! addressing triple formulas use.

use serde::{Deserialize, Serialize};

/// Stable sheet identifier, never reused after deletion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SheetId(pub u32);

impl SheetId {
    #[inline]
    pub fn raw(&self) -> u32 {
        self.0
    }
}

/// Unique identifier for a cell.
///
/// Used as graph nodes in the dependency graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CellId {
    /// The sheet this cell belongs to
    pub sheet: SheetId,
    /// Row index (0-based)
    pub row: usize,
    /// Column index (0-based)
    pub col: usize,
}

impl CellId {
    #[inline]
    pub fn new(sheet: SheetId, row: usize, col: usize) -> Self {
        Self { sheet, row, col }
    }
}

impl std::fmt::Display for CellId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sheet{}!{}{}", self.sheet.raw(), col_to_letters(self.col), self.row + 1)
    }
}

/// Convert 0-based column index to A1-style letter(s).
pub fn col_to_letters(col: usize) -> String {
    let mut result = String::new();
    let mut n = col;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_col_letters() {
        assert_eq!(col_to_letters(0), "A");
        assert_eq!(col_to_letters(25), "Z");
        assert_eq!(col_to_letters(26), "AA");
        assert_eq!(col_to_letters(27), "AB");
        assert_eq!(col_to_letters(701), "ZZ");
    }

    #[test]
    fn test_display() {
        let id = CellId::new(SheetId(1), 0, 1);
        assert_eq!(id.to_string(), "Sheet1!B1");
    }
}
