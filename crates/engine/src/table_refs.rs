//! Structured table references.
//!
//! Formulas can address table regions by name instead of coordinates:
//!
//! ```text
//! Table1[Amount]              one column's data rows
//! Table1[#Headers]            the header row
//! Table1[#Totals]             the totals row (if the table has one)
//! Table1[#All]                headers + data + totals
//! Table1[[#Totals],[Amount]]  one column within a scope
//! [@Amount]                   this row's cell in a column (origin-relative)
//! [Amount]                    shorthand for the enclosing table's column
//! ```
//!
//! The registry maps table names to sheet regions; `resolve` turns a
//! structured reference plus the formula's origin cell into a concrete
//! rectangular range.

use serde::{Deserialize, Serialize};

use crate::cell_id::{CellId, SheetId};

/// Which rows of the table a reference selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TableScope {
    /// Data rows only (the default).
    #[default]
    Data,
    /// The header row.
    Headers,
    /// The totals row.
    Totals,
    /// Headers + data + totals.
    All,
    /// The single data row containing the formula (`[@Col]`).
    ThisRow,
}

impl TableScope {
    fn from_item(item: &str) -> Option<Self> {
        match item.to_ascii_uppercase().as_str() {
            "#DATA" => Some(Self::Data),
            "#HEADERS" => Some(Self::Headers),
            "#TOTALS" => Some(Self::Totals),
            "#ALL" => Some(Self::All),
            "#THIS ROW" => Some(Self::ThisRow),
            _ => None,
        }
    }
}

/// A parsed structured reference, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredRef {
    /// None = the table enclosing the formula's origin cell.
    pub table: Option<String>,
    /// None = all columns in scope.
    pub column: Option<String>,
    pub scope: TableScope,
}

/// A concrete rectangular range a structured reference resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub sheet: SheetId,
    pub start_row: usize,
    pub start_col: usize,
    pub end_row: usize,
    pub end_col: usize,
}

impl CellRange {
    pub fn cells(&self) -> impl Iterator<Item = CellId> + '_ {
        let sheet = self.sheet;
        (self.start_row..=self.end_row).flat_map(move |row| {
            (self.start_col..=self.end_col).map(move |col| CellId::new(sheet, row, col))
        })
    }
}

/// Parse the bracket body of a structured reference.
///
/// `table` is the identifier before the opening bracket (absent for
/// `[@Col]`-style references). `body` is the text between the outer
/// brackets, with nested item brackets intact, e.g. `[#Totals],[Amount]`.
pub fn parse_body(table: Option<String>, body: &str) -> Result<StructuredRef, String> {
    let body = body.trim();

    // `@Col` / `@` this-row shorthand
    if let Some(rest) = body.strip_prefix('@') {
        let column = if rest.is_empty() { None } else { Some(rest.trim().to_string()) };
        return Ok(StructuredRef { table, column, scope: TableScope::ThisRow });
    }

    // Multi-item form: `[#Totals],[Amount]`
    if body.starts_with('[') {
        let mut scope = TableScope::Data;
        let mut column = None;
        for item in split_items(body)? {
            if let Some(s) = TableScope::from_item(&item) {
                scope = s;
            } else {
                if column.is_some() {
                    return Err(format!("structured reference has multiple columns: {body}"));
                }
                column = Some(item);
            }
        }
        return Ok(StructuredRef { table, column, scope });
    }

    // Single bare item: a special item or a column name
    if let Some(scope) = TableScope::from_item(body) {
        return Ok(StructuredRef { table, column: None, scope });
    }
    if body.is_empty() {
        return Err("empty structured reference".to_string());
    }
    Ok(StructuredRef { table, column: Some(body.to_string()), scope: TableScope::Data })
}

/// Split `[a],[b],...` into the bracketed item texts.
fn split_items(body: &str) -> Result<Vec<String>, String> {
    let mut items = Vec::new();
    let mut chars = body.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            '[' => {
                chars.next();
                let mut item = String::new();
                loop {
                    match chars.next() {
                        Some(']') => break,
                        Some(ch) => item.push(ch),
                        None => return Err(format!("unterminated item in: {body}")),
                    }
                }
                items.push(item.trim().to_string());
            }
            ',' | ' ' => {
                chars.next();
            }
            other => return Err(format!("unexpected '{other}' in structured reference: {body}")),
        }
    }

    Ok(items)
}

/// One registered table region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDef {
    pub name: String,
    pub sheet: SheetId,
    /// Row of the header row.
    pub header_row: usize,
    /// First column of the table.
    pub start_col: usize,
    /// Column names, left to right. Width = columns.len().
    pub columns: Vec<String>,
    /// Number of data rows below the header.
    pub data_rows: usize,
    /// Whether a totals row follows the data rows.
    pub has_totals: bool,
}

impl TableDef {
    fn first_data_row(&self) -> usize {
        self.header_row + 1
    }

    fn last_data_row(&self) -> usize {
        // A table always has at least one (possibly blank) data row
        self.header_row + self.data_rows.max(1)
    }

    fn totals_row(&self) -> Option<usize> {
        self.has_totals.then(|| self.last_data_row() + 1)
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .map(|i| self.start_col + i)
    }

    fn last_col(&self) -> usize {
        self.start_col + self.columns.len().saturating_sub(1)
    }

    /// Does this table's full extent contain the given cell?
    fn contains(&self, cell: CellId) -> bool {
        let last_row = self.totals_row().unwrap_or_else(|| self.last_data_row());
        cell.sheet == self.sheet
            && cell.row >= self.header_row
            && cell.row <= last_row
            && cell.col >= self.start_col
            && cell.col <= self.last_col()
    }
}

/// All tables known to a workbook.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableRegistry {
    tables: Vec<TableDef>,
}

impl TableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table. Replaces any table with the same name.
    pub fn register(&mut self, table: TableDef) {
        self.tables.retain(|t| !t.name.eq_ignore_ascii_case(&table.name));
        self.tables.push(table);
    }

    pub fn get(&self, name: &str) -> Option<&TableDef> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &TableDef> {
        self.tables.iter()
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.tables.len();
        self.tables.retain(|t| !t.name.eq_ignore_ascii_case(name));
        self.tables.len() != before
    }

    /// The table whose extent contains the cell, for unnamed references.
    pub fn table_at(&self, cell: CellId) -> Option<&TableDef> {
        self.tables.iter().find(|t| t.contains(cell))
    }

    /// Resolve a structured reference from the perspective of `origin`
    /// (the cell the formula lives in).
    pub fn resolve(&self, sref: &StructuredRef, origin: CellId) -> Result<CellRange, String> {
        let table = match &sref.table {
            Some(name) => self
                .get(name)
                .ok_or_else(|| format!("#REF! unknown table '{name}'"))?,
            None => self
                .table_at(origin)
                .ok_or_else(|| "#REF! formula is not inside a table".to_string())?,
        };

        let (start_col, end_col) = match &sref.column {
            Some(name) => {
                let col = table
                    .column_index(name)
                    .ok_or_else(|| format!("#REF! unknown column '{}' in table '{}'", name, table.name))?;
                (col, col)
            }
            None => (table.start_col, table.last_col()),
        };

        let (start_row, end_row) = match sref.scope {
            TableScope::Data => (table.first_data_row(), table.last_data_row()),
            TableScope::Headers => (table.header_row, table.header_row),
            TableScope::Totals => {
                let row = table
                    .totals_row()
                    .ok_or_else(|| format!("#REF! table '{}' has no totals row", table.name))?;
                (row, row)
            }
            TableScope::All => {
                let last = table.totals_row().unwrap_or_else(|| table.last_data_row());
                (table.header_row, last)
            }
            TableScope::ThisRow => {
                if origin.sheet != table.sheet
                    || origin.row < table.first_data_row()
                    || origin.row > table.last_data_row()
                {
                    return Err("#VALUE! [@] reference outside the table's data rows".to_string());
                }
                (origin.row, origin.row)
            }
        };

        Ok(CellRange { sheet: table.sheet, start_row, start_col, end_row, end_col })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TableRegistry {
        let mut reg = TableRegistry::new();
        reg.register(TableDef {
            name: "Sales".into(),
            sheet: SheetId(1),
            header_row: 0,
            start_col: 0,
            columns: vec!["Region".into(), "Amount".into()],
            data_rows: 3,
            has_totals: true,
        });
        reg
    }

    #[test]
    fn test_parse_column_only() {
        let r = parse_body(Some("Sales".into()), "Amount").unwrap();
        assert_eq!(r.column.as_deref(), Some("Amount"));
        assert_eq!(r.scope, TableScope::Data);
    }

    #[test]
    fn test_parse_this_row() {
        let r = parse_body(None, "@Amount").unwrap();
        assert_eq!(r.scope, TableScope::ThisRow);
        assert_eq!(r.column.as_deref(), Some("Amount"));
        assert!(r.table.is_none());
    }

    #[test]
    fn test_parse_special_item() {
        let r = parse_body(Some("Sales".into()), "#Headers").unwrap();
        assert_eq!(r.scope, TableScope::Headers);
        assert!(r.column.is_none());
    }

    #[test]
    fn test_parse_multi_item() {
        let r = parse_body(Some("Sales".into()), "[#Totals],[Amount]").unwrap();
        assert_eq!(r.scope, TableScope::Totals);
        assert_eq!(r.column.as_deref(), Some("Amount"));
    }

    #[test]
    fn test_parse_rejects_double_column() {
        assert!(parse_body(Some("T".into()), "[A],[B]").is_err());
    }

    #[test]
    fn test_resolve_data_column() {
        let reg = registry();
        let sref = parse_body(Some("Sales".into()), "Amount").unwrap();
        let origin = CellId::new(SheetId(1), 10, 10);
        let range = reg.resolve(&sref, origin).unwrap();
        assert_eq!(
            range,
            CellRange { sheet: SheetId(1), start_row: 1, start_col: 1, end_row: 3, end_col: 1 }
        );
    }

    #[test]
    fn test_resolve_headers_full_width() {
        let reg = registry();
        let sref = parse_body(Some("Sales".into()), "#Headers").unwrap();
        let range = reg.resolve(&sref, CellId::new(SheetId(1), 10, 10)).unwrap();
        assert_eq!(range.start_row, 0);
        assert_eq!(range.end_row, 0);
        assert_eq!(range.start_col, 0);
        assert_eq!(range.end_col, 1);
    }

    #[test]
    fn test_resolve_totals() {
        let reg = registry();
        let sref = parse_body(Some("Sales".into()), "[#Totals],[Amount]").unwrap();
        let range = reg.resolve(&sref, CellId::new(SheetId(1), 10, 10)).unwrap();
        // header 0, data 1..=3, totals 4
        assert_eq!(range.start_row, 4);
        assert_eq!(range.end_row, 4);
        assert_eq!(range.start_col, 1);
    }

    #[test]
    fn test_resolve_this_row_uses_origin() {
        let reg = registry();
        let sref = parse_body(None, "@Amount").unwrap();
        let origin = CellId::new(SheetId(1), 2, 0); // inside the table's data rows
        let range = reg.resolve(&sref, origin).unwrap();
        assert_eq!(
            range,
            CellRange { sheet: SheetId(1), start_row: 2, start_col: 1, end_row: 2, end_col: 1 }
        );
    }

    #[test]
    fn test_resolve_this_row_outside_table_fails() {
        let reg = registry();
        let sref = parse_body(None, "@Amount").unwrap();
        let origin = CellId::new(SheetId(1), 50, 0);
        assert!(reg.resolve(&sref, origin).is_err());
    }

    #[test]
    fn test_resolve_unknown_table_and_column() {
        let reg = registry();
        let sref = parse_body(Some("Nope".into()), "Amount").unwrap();
        assert!(reg.resolve(&sref, CellId::new(SheetId(1), 0, 0)).is_err());

        let sref = parse_body(Some("Sales".into()), "Missing").unwrap();
        assert!(reg.resolve(&sref, CellId::new(SheetId(1), 0, 0)).is_err());
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut reg = registry();
        reg.register(TableDef {
            name: "SALES".into(),
            sheet: SheetId(2),
            header_row: 5,
            start_col: 2,
            columns: vec!["X".into()],
            data_rows: 1,
            has_totals: false,
        });
        assert_eq!(reg.get("sales").unwrap().sheet, SheetId(2));
    }
}
