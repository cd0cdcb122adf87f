//! The workbook ties everything together: sheets, the table registry,
//! the dependency graph, and the computed-value cache.
//!
//! Recalculation is incremental: editing a cell recomputes only the
//! formulas transitively affected, in dependency order. A detected cycle
//! marks its members `#CIRC!` and leaves unrelated cells untouched.

use rustc_hash::FxHashMap;

use crate::cell::CellValue;
use crate::cell_id::{CellId, SheetId};
use crate::dep_graph::DepGraph;
use crate::formula::eval::{eval, CellLookup, EvalContext, Value};
use crate::formula::refs::extract_refs;
use crate::sheet::Sheet;
use crate::table_refs::{TableDef, TableRegistry};

pub struct Workbook {
    sheets: Vec<Sheet>,
    next_sheet_id: u32,
    tables: TableRegistry,
    deps: DepGraph,
    /// Computed results for formula cells only.
    computed: FxHashMap<CellId, Value>,
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

impl Workbook {
    /// A workbook starts with one sheet named "Sheet1".
    pub fn new() -> Self {
        let mut wb = Self {
            sheets: Vec::new(),
            next_sheet_id: 1,
            tables: TableRegistry::new(),
            deps: DepGraph::new(),
            computed: FxHashMap::default(),
        };
        wb.add_sheet("Sheet1");
        wb
    }

    // =========================================================================
    // Sheets
    // =========================================================================

    pub fn add_sheet(&mut self, name: impl Into<String>) -> SheetId {
        let id = SheetId(self.next_sheet_id);
        self.next_sheet_id += 1;
        self.sheets.push(Sheet::new(id, name));
        id
    }

    pub fn sheet(&self, id: SheetId) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.id == id)
    }

    pub fn sheet_mut(&mut self, id: SheetId) -> Option<&mut Sheet> {
        self.sheets.iter_mut().find(|s| s.id == id)
    }

    pub fn sheet_id_by_name(&self, name: &str) -> Option<SheetId> {
        self.sheets
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .map(|s| s.id)
    }

    pub fn sheets(&self) -> impl Iterator<Item = &Sheet> {
        self.sheets.iter()
    }

    /// Remove a sheet. Formulas elsewhere that referenced it recompute
    /// and surface `#REF!`.
    pub fn remove_sheet(&mut self, id: SheetId) -> bool {
        let before = self.sheets.len();
        self.sheets.retain(|s| s.id != id);
        if self.sheets.len() == before {
            return false;
        }
        self.deps.remove_sheet(id);
        self.computed.retain(|cell, _| cell.sheet != id);
        let table_names: Vec<String> = self
            .tables
            .iter()
            .filter(|t| t.sheet == id)
            .map(|t| t.name.clone())
            .collect();
        for name in table_names {
            self.tables.remove(&name);
        }
        self.rebuild_all();
        true
    }

    // =========================================================================
    // Tables
    // =========================================================================

    pub fn tables(&self) -> &TableRegistry {
        &self.tables
    }

    /// Register (or redefine) a table. Structured references may resolve
    /// differently afterwards, so every formula's edges are rebuilt.
    pub fn register_table(&mut self, table: TableDef) {
        self.tables.register(table);
        self.rebuild_all();
    }

    pub fn remove_table(&mut self, name: &str) -> bool {
        let removed = self.tables.remove(name);
        if removed {
            self.rebuild_all();
        }
        removed
    }

    // =========================================================================
    // Cell edits
    // =========================================================================

    /// Set a cell from user input and recompute everything it affects.
    pub fn set_input(&mut self, cell: CellId, input: &str) -> Result<(), String> {
        if self.sheet(cell.sheet).is_none() {
            return Err(format!("no sheet with id {}", cell.sheet.raw()));
        }

        let value = CellValue::from_input(input);
        self.update_edges(cell, &value);
        if !value.is_formula() {
            self.computed.remove(&cell);
        }
        if let Some(sheet) = self.sheet_mut(cell.sheet) {
            sheet.set(cell.row, cell.col, value);
        }
        self.recompute_affected(cell);
        Ok(())
    }

    /// Clear a cell and recompute its dependents.
    pub fn clear_cell(&mut self, cell: CellId) {
        self.deps.clear_cell(cell);
        self.computed.remove(&cell);
        if let Some(sheet) = self.sheet_mut(cell.sheet) {
            sheet.clear(cell.row, cell.col);
        }
        self.recompute_affected(cell);
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// The computed value of a cell (literal, formula result, or Empty).
    pub fn value(&self, cell: CellId) -> Value {
        WorkbookView { wb: self }.value(cell)
    }

    /// The text shown in the grid for a cell.
    pub fn display(&self, cell: CellId) -> String {
        self.value(cell).to_text()
    }

    /// The text shown when editing a cell: formula source for formulas,
    /// literal content otherwise.
    pub fn input_text(&self, cell: CellId) -> String {
        self.sheet(cell.sheet)
            .and_then(|s| s.get(cell.row, cell.col))
            .map(|v| v.raw_display())
            .unwrap_or_default()
    }

    // =========================================================================
    // Recalculation
    // =========================================================================

    fn update_edges(&mut self, cell: CellId, value: &CellValue) {
        match value {
            CellValue::Formula { ast: Some(expr), .. } => {
                let sheets = &self.sheets;
                let lookup = |name: &str| {
                    sheets
                        .iter()
                        .find(|s| s.name.eq_ignore_ascii_case(name))
                        .map(|s| s.id)
                };
                let refs = extract_refs(expr, &self.tables, cell, &lookup);
                self.deps.replace_edges(cell, refs);
            }
            _ => self.deps.clear_cell(cell),
        }
    }

    fn recompute_affected(&mut self, cell: CellId) {
        // A formula whose references all failed to resolve (or that has
        // none, like =1+2) carries no graph edges; evaluate it directly.
        if !self.deps.is_formula_cell(cell) {
            if let Some(value) = self.evaluate_cell(cell) {
                self.computed.insert(cell, value);
            }
        }
        match self.deps.affected_in_order(cell) {
            Ok(order) => {
                log::trace!("recompute {} cells after edit to {}", order.len(), cell);
                self.recompute_cells(&order);
            }
            Err(members) => {
                log::debug!("dependency cycle of {} cells involving {}", members.len(), cell);
                let affected = self.deps.affected_set(cell);
                for &member in &members {
                    self.computed.insert(member, Value::Error("#CIRC!".to_string()));
                }
                // Non-member cells still recompute so errors propagate
                let mut rest: Vec<CellId> =
                    affected.into_iter().filter(|c| !members.contains(c)).collect();
                rest.sort_by(|a, b| {
                    a.sheet
                        .raw()
                        .cmp(&b.sheet.raw())
                        .then(a.row.cmp(&b.row))
                        .then(a.col.cmp(&b.col))
                });
                self.recompute_cells(&rest);
            }
        }
    }

    /// Rebuild every formula's edges and recompute the whole workbook.
    /// Used after table or sheet changes that can shift reference targets.
    fn rebuild_all(&mut self) {
        let formula_cells: Vec<(CellId, CellValue)> = self
            .sheets
            .iter()
            .flat_map(|sheet| {
                let id = sheet.id;
                sheet
                    .iter()
                    .filter(|(_, _, v)| v.is_formula())
                    .map(move |(row, col, v)| (CellId::new(id, row, col), v.clone()))
            })
            .collect();

        for (cell, value) in &formula_cells {
            self.update_edges(*cell, value);
        }

        // Formulas with no graph edges first; nothing in the graph feeds
        // them, but other formulas may read their results.
        let mut graphless: Vec<CellId> = formula_cells
            .iter()
            .map(|(c, _)| *c)
            .filter(|c| !self.deps.is_formula_cell(*c))
            .collect();
        graphless.sort_by(|a, b| {
            a.sheet
                .raw()
                .cmp(&b.sheet.raw())
                .then(a.row.cmp(&b.row))
                .then(a.col.cmp(&b.col))
        });
        self.recompute_cells(&graphless);

        match self.deps.full_order() {
            Ok(order) => self.recompute_cells(&order),
            Err(members) => {
                for &member in &members {
                    self.computed.insert(member, Value::Error("#CIRC!".to_string()));
                }
                let mut rest: Vec<CellId> = formula_cells
                    .iter()
                    .map(|(c, _)| *c)
                    .filter(|c| !members.contains(c))
                    .collect();
                rest.sort_by(|a, b| {
                    a.sheet
                        .raw()
                        .cmp(&b.sheet.raw())
                        .then(a.row.cmp(&b.row))
                        .then(a.col.cmp(&b.col))
                });
                self.recompute_cells(&rest);
            }
        }
    }

    fn recompute_cells(&mut self, cells: &[CellId]) {
        for &cell in cells {
            let result = self.evaluate_cell(cell);
            match result {
                Some(value) => {
                    self.computed.insert(cell, value);
                }
                None => {
                    self.computed.remove(&cell);
                }
            }
        }
    }

    /// Evaluate one formula cell against current computed state.
    /// Returns None for non-formula cells.
    fn evaluate_cell(&self, cell: CellId) -> Option<Value> {
        let stored = self.sheet(cell.sheet)?.get(cell.row, cell.col)?;
        match stored {
            CellValue::Formula { ast: Some(expr), .. } => {
                let view = WorkbookView { wb: self };
                Some(eval(
                    expr,
                    &EvalContext { lookup: &view, tables: &self.tables, origin: cell },
                ))
            }
            CellValue::Formula { ast: None, .. } => {
                Some(Value::Error("#VALUE! Invalid formula".to_string()))
            }
            _ => None,
        }
    }
}

/// Read-only lookup over a workbook for the evaluator.
struct WorkbookView<'a> {
    wb: &'a Workbook,
}

impl CellLookup for WorkbookView<'_> {
    fn value(&self, cell: CellId) -> Value {
        let Some(sheet) = self.wb.sheet(cell.sheet) else {
            return Value::Error("#REF!".to_string());
        };
        match sheet.get(cell.row, cell.col) {
            None | Some(CellValue::Empty) => Value::Empty,
            Some(CellValue::Number(n)) => Value::Number(*n),
            Some(CellValue::Text(s)) => Value::Text(s.clone()),
            Some(CellValue::Formula { .. }) => {
                self.wb.computed.get(&cell).cloned().unwrap_or(Value::Empty)
            }
        }
    }

    fn sheet_by_name(&self, name: &str) -> Option<SheetId> {
        self.wb.sheet_id_by_name(name)
    }
}
